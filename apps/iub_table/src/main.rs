use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{FilterField, HttpDataSource, Notifier, QueryStateController};
use shared::domain::Record;
use tracing_subscriber::EnvFilter;

mod config;

/// Lists IUB procurement records matching the given filters.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file; defaults to ./iub_table.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    price_from: Option<f64>,
    #[arg(long)]
    price_to: Option<f64>,
    #[arg(long)]
    tender_count_from: Option<u32>,
    #[arg(long)]
    tender_count_to: Option<u32>,
    #[arg(long)]
    authority_name: Option<String>,
    /// Column to sort by after the initial load; repeat a column to flip its direction.
    #[arg(long = "sort", value_name = "FIELD")]
    sort: Vec<String>,
    /// Print rows as JSON lines.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn filter_updates(&self) -> Vec<FilterField> {
        vec![
            FilterField::PriceFrom(self.price_from),
            FilterField::PriceTo(self.price_to),
            FilterField::TenderCountFrom(self.tender_count_from),
            FilterField::TenderCountTo(self.tender_count_to),
            FilterField::AuthorityName(self.authority_name.clone()),
        ]
    }
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn report_error(&self, message: &str, title: &str) {
        eprintln!("{title}: {message}");
    }
}

fn render_row(record: &Record) -> String {
    record
        .fields()
        .map(|(field, value)| format!("{field}={value}"))
        .collect::<Vec<_>>()
        .join("  ")
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(url) = &args.server_url {
        settings.api_base_url = url.clone();
    }
    if let Some(limit) = args.limit {
        settings.row_limit = limit;
    }
    settings.api_base_url = config::normalize_api_base_url(&settings.api_base_url)?;
    tracing::info!(api = %settings.api_base_url, limit = settings.row_limit, "loaded settings");

    let controller = QueryStateController::new_with_config(
        Arc::new(HttpDataSource::new(settings.api_base_url.clone())),
        Arc::new(ConsoleNotifier),
        settings.controller_config(),
    );

    for update in args.filter_updates() {
        controller.update_filter(update).await;
    }

    if let Some(task) = controller.initialize().await {
        task.await?;
    }
    for field in &args.sort {
        if let Some(task) = controller.set_sorting(field.as_str()).await {
            task.await?;
        }
    }

    let rows = controller.rows().await;
    for record in &rows {
        if args.json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{}", render_row(record));
        }
    }
    tracing::info!(count = rows.len(), "listing complete");

    Ok(())
}
