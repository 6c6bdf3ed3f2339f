use super::*;
use crate::domain::{FieldValue, Record, RecordError};
use serde_json::json;

#[test]
fn range_without_bounds_is_dropped() {
    assert_eq!(RangeFilter::<f64>::from_bounds(None, None), None);
}

#[test]
fn range_serializes_only_present_bounds() {
    let range = RangeFilter::from_bounds(Some(10.0), None).expect("range");
    assert_eq!(serde_json::to_value(range).unwrap(), json!({ "$gte": 10.0 }));

    let range = RangeFilter::from_bounds(None, Some(3u32)).expect("range");
    assert_eq!(serde_json::to_value(range).unwrap(), json!({ "$lte": 3 }));
}

#[test]
fn empty_filter_spec_serializes_to_empty_object() {
    let spec = FilterSpec::default();
    assert!(spec.is_empty());
    assert_eq!(serde_json::to_value(&spec).unwrap(), json!({}));
}

#[test]
fn filter_spec_uses_data_source_key_names() {
    let spec = FilterSpec {
        price: RangeFilter::from_bounds(Some(100.0), Some(2500.5)),
        tender_num: RangeFilter::from_bounds(Some(2), None),
        authority_name: Some("Rīgas dome".into()),
    };

    assert_eq!(
        serde_json::to_value(&spec).unwrap(),
        json!({
            "price": { "$gte": 100.0, "$lte": 2500.5 },
            "tender_num": { "$gte": 2 },
            "authority_name": "Rīgas dome",
        })
    );
}

#[test]
fn sort_map_encodes_direction_as_signed_integer() {
    assert_eq!(
        serde_json::to_value(SortMap::by("document_id", SortDirection::Descending)).unwrap(),
        json!({ "document_id": -1 })
    );
    assert_eq!(
        serde_json::to_value(SortMap::by("price", SortDirection::Ascending)).unwrap(),
        json!({ "price": 1 })
    );
    assert_eq!(serde_json::to_value(SortMap::default()).unwrap(), json!({}));
}

#[test]
fn sort_map_rejects_unknown_direction() {
    let err = serde_json::from_value::<SortMap>(json!({ "price": 0 })).expect_err("must fail");
    assert!(err.to_string().contains("1 or -1"), "unexpected error: {err}");
}

#[test]
fn record_accepts_flat_primitive_fields() {
    let record: Record = serde_json::from_value(json!({
        "document_id": 4021,
        "authority_name": "VARAM",
        "price": 1999.99,
        "is_eu_funded": true,
        "winner": null,
    }))
    .expect("record");

    assert_eq!(record.len(), 5);
    assert_eq!(record.get("document_id"), Some(&FieldValue::Number(4021.0)));
    assert_eq!(record.get("authority_name"), Some(&FieldValue::from("VARAM")));
    assert_eq!(record.get("is_eu_funded"), Some(&FieldValue::Bool(true)));
    assert_eq!(record.get("winner"), Some(&FieldValue::Null));
}

#[test]
fn record_rejects_nested_values() {
    let result = serde_json::from_value::<Record>(json!({ "winner": { "name": "SIA" } }));
    assert!(result.is_err());
}

#[test]
fn record_conversion_names_nested_field() {
    let err = Record::try_from(json!({ "document_id": 9, "winner": ["SIA"] })).expect_err("nested");
    assert_eq!(
        err,
        RecordError::NestedField {
            field: "winner".into()
        }
    );
    assert!(err.to_string().contains("\"winner\""));
}

#[test]
fn record_conversion_accepts_flat_rows_and_rejects_non_objects() {
    let record = Record::try_from(json!({ "document_id": 9, "price": null })).expect("record");
    assert_eq!(record.get("document_id"), Some(&FieldValue::Number(9.0)));
    assert_eq!(record.get("price"), Some(&FieldValue::Null));

    assert_eq!(Record::try_from(json!([1, 2])), Err(RecordError::NotAnObject));
}
