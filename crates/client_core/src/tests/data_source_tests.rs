use super::*;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{FieldValue, SortDirection},
    error::ErrorCode,
    protocol::RangeFilter,
};
use std::{collections::HashMap, sync::Arc};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct ServerState {
    status: StatusCode,
    body: Value,
    seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn handle_procurements(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.seen.lock().await.push(params);
    (state.status, Json(state.body.clone()))
}

async fn spawn_procurement_server(
    status: StatusCode,
    body: Value,
) -> Result<(String, Arc<Mutex<Vec<HashMap<String, String>>>>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = ServerState {
        status,
        body,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/procurements", get(handle_procurements))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), seen))
}

#[tokio::test]
async fn fetch_sends_limit_filters_and_sort_as_query_parameters() {
    let (server_url, seen) = spawn_procurement_server(
        StatusCode::OK,
        json!([
            { "document_id": 11, "authority_name": "VARAM", "price": 1200.5 },
            { "document_id": 10, "authority_name": "IUB", "price": null },
        ]),
    )
    .await
    .expect("spawn server");
    let source = HttpDataSource::new(format!("{server_url}/"));
    assert_eq!(source.base_url(), server_url);

    let filters = FilterSpec {
        price: RangeFilter::from_bounds(Some(10.0), None),
        tender_num: RangeFilter::from_bounds(Some(1), Some(4)),
        authority_name: Some("VARAM".into()),
    };
    let sort = SortMap::by("document_id", SortDirection::Descending);

    let rows = source.fetch(100, &filters, &sort).await.expect("fetch");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("document_id"), Some(&FieldValue::Number(11.0)));
    assert_eq!(rows[1].get("price"), Some(&FieldValue::Null));

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    let params = &seen[0];
    assert_eq!(params.get("limit").map(String::as_str), Some("100"));

    let sent_filters: Value =
        serde_json::from_str(params.get("filters").expect("filters param")).expect("json");
    assert_eq!(
        sent_filters,
        json!({
            "price": { "$gte": 10.0 },
            "tender_num": { "$gte": 1, "$lte": 4 },
            "authority_name": "VARAM",
        })
    );
    let sent_sort: Value =
        serde_json::from_str(params.get("sort").expect("sort param")).expect("json");
    assert_eq!(sent_sort, json!({ "document_id": -1 }));
}

#[tokio::test]
async fn fetch_sends_empty_objects_without_criteria() {
    let (server_url, seen) = spawn_procurement_server(StatusCode::OK, json!([]))
        .await
        .expect("spawn server");
    let source = HttpDataSource::new(server_url);

    let rows = source
        .fetch(100, &FilterSpec::default(), &SortMap::default())
        .await
        .expect("fetch");

    assert!(rows.is_empty());
    let seen = seen.lock().await;
    assert_eq!(seen[0].get("filters").map(String::as_str), Some("{}"));
    assert_eq!(seen[0].get("sort").map(String::as_str), Some("{}"));
}

#[tokio::test]
async fn fetch_surfaces_api_error_body() {
    let (server_url, _seen) = spawn_procurement_server(
        StatusCode::SERVICE_UNAVAILABLE,
        serde_json::to_value(ApiError::new(ErrorCode::Unavailable, "index rebuilding")).unwrap(),
    )
    .await
    .expect("spawn server");
    let source = HttpDataSource::new(server_url);

    let err = source
        .fetch(100, &FilterSpec::default(), &SortMap::default())
        .await
        .expect_err("must fail");

    let text = format!("{err:#}");
    assert!(text.contains("503"), "unexpected error: {text}");
    assert!(text.contains("index rebuilding"), "unexpected error: {text}");
    let api_error = err.downcast_ref::<ApiError>().expect("api error in chain");
    assert_eq!(api_error.code, ErrorCode::Unavailable);
}

#[tokio::test]
async fn fetch_rejects_non_list_payload() {
    let (server_url, _seen) = spawn_procurement_server(StatusCode::OK, json!({ "rows": [] }))
        .await
        .expect("spawn server");
    let source = HttpDataSource::new(server_url);

    let err = source
        .fetch(100, &FilterSpec::default(), &SortMap::default())
        .await
        .expect_err("must fail");

    assert!(
        err.to_string().contains("invalid procurement payload"),
        "unexpected error: {err:#}"
    );
}

#[tokio::test]
async fn fetch_fails_when_server_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let source = HttpDataSource::new(format!("http://{addr}"));

    let err = source
        .fetch(100, &FilterSpec::default(), &SortMap::default())
        .await
        .expect_err("must fail");

    assert!(
        err.to_string().contains("procurement request failed"),
        "unexpected error: {err:#}"
    );
}

#[tokio::test]
async fn fetch_names_the_nested_field_that_was_rejected() {
    let (server_url, _seen) = spawn_procurement_server(
        StatusCode::OK,
        json!([
            { "document_id": 1, "authority_name": "IUB" },
            { "document_id": 2, "winner": { "name": "SIA Būvnieks", "reg_nr": "40003000000" } },
        ]),
    )
    .await
    .expect("spawn server");
    let source = HttpDataSource::new(server_url);

    let err = source
        .fetch(100, &FilterSpec::default(), &SortMap::default())
        .await
        .expect_err("must fail");

    let text = format!("{err:#}");
    assert!(text.contains("row 1"), "unexpected error: {text}");
    assert!(text.contains("\"winner\""), "unexpected error: {text}");
}
