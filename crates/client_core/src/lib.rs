use std::{panic::AssertUnwindSafe, sync::Arc};

use anyhow::anyhow;
use futures::FutureExt;
use shared::{
    domain::{Record, SortDirection, DOCUMENT_ID_FIELD},
    protocol::{FilterSpec, ProcurementQuery, SortMap},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

mod data_source;
mod filters;
mod notifier;

pub use data_source::{DataSource, HttpDataSource, MissingDataSource};
pub use filters::{FilterCriteria, FilterField};
pub use notifier::{Notifier, TracingNotifier};

pub const DEFAULT_ROW_LIMIT: u32 = 100;
pub const RETRIEVAL_FAILED_MESSAGE: &str = "Cannot retrieve IUB procurement data";
pub const RETRIEVAL_FAILED_TITLE: &str = "IUB procurement data not retrieved";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub limit: u32,
    pub default_sort_field: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ROW_LIMIT,
            default_sort_field: DOCUMENT_ID_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: Option<String>,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: None,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortSpec {
    /// A newly selected field starts descending; reselecting it flips the direction.
    pub fn select(&mut self, field: String) {
        if self.field.as_deref() == Some(field.as_str()) {
            self.direction = self.direction.flipped();
        } else {
            self.direction = SortDirection::Descending;
            self.field = Some(field);
        }
    }

    pub fn to_sort_map(&self) -> SortMap {
        match &self.field {
            Some(field) => SortMap::by(field.clone(), self.direction),
            None => SortMap::default(),
        }
    }
}

/// A fetch that did not complete. Every underlying cause collapses into this.
#[derive(Debug, Error)]
#[error("procurement retrieval failed (limit {}): {cause:#}", .query.limit)]
pub struct RetrievalError {
    pub query: ProcurementQuery,
    cause: anyhow::Error,
}

impl RetrievalError {
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    BusyChanged(bool),
    RowsReplaced { count: usize },
    RetrievalFailed { message: String },
}

#[derive(Default)]
struct QueryState {
    filters: FilterCriteria,
    sort: SortSpec,
    rows: Vec<Record>,
    busy: bool,
    help_visible: bool,
    winner_data: Option<Record>,
}

/// Owns the listing's filter, sort and result state and drives retrievals
/// against a [`DataSource`].
///
/// At most one fetch is outstanding at a time: a retrieval requested while
/// another is in flight is dropped, not queued.
pub struct QueryStateController {
    data_source: Arc<dyn DataSource>,
    notifier: Arc<dyn Notifier>,
    config: ControllerConfig,
    inner: Mutex<QueryState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl QueryStateController {
    pub fn new(data_source: Arc<dyn DataSource>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Self::new_with_config(data_source, notifier, ControllerConfig::default())
    }

    pub fn new_with_config(
        data_source: Arc<dyn DataSource>,
        notifier: Arc<dyn Notifier>,
        config: ControllerConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            data_source,
            notifier,
            config,
            inner: Mutex::new(QueryState::default()),
            events,
        })
    }

    /// Applies the default sort and loads the first page of rows with a
    /// single fetch.
    pub async fn initialize(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        {
            let mut guard = self.inner.lock().await;
            guard.sort.select(self.config.default_sort_field.clone());
        }
        self.retrieve().await
    }

    /// Starts a fetch with the current filters and sort.
    ///
    /// Returns `None` without touching the data source if a fetch is already
    /// in flight. Otherwise returns the handle of the task that applies the
    /// outcome; awaiting it is optional.
    pub async fn retrieve(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let query = {
            let mut guard = self.inner.lock().await;
            if guard.busy {
                debug!("procurement retrieval already in flight; dropping request");
                return None;
            }
            guard.busy = true;
            ProcurementQuery {
                limit: self.config.limit,
                filters: guard.filters.to_filter_spec(),
                sort: guard.sort.to_sort_map(),
            }
        };
        let _ = self.events.send(ControllerEvent::BusyChanged(true));
        debug!(
            limit = query.limit,
            filters = ?query.filters,
            sort = ?query.sort,
            "issuing procurement retrieval"
        );

        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            controller.complete_retrieval(query).await;
        }))
    }

    async fn complete_retrieval(&self, query: ProcurementQuery) {
        let fetch = self
            .data_source
            .fetch(query.limit, &query.filters, &query.sort);
        let outcome = match AssertUnwindSafe(fetch).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow!("procurement data source panicked")),
        };

        match outcome {
            Ok(rows) => {
                let count = rows.len();
                {
                    let mut guard = self.inner.lock().await;
                    guard.rows = rows;
                    guard.busy = false;
                }
                info!(count, "procurement rows replaced");
                let _ = self.events.send(ControllerEvent::RowsReplaced { count });
            }
            Err(cause) => {
                let err = RetrievalError { query, cause };
                self.inner.lock().await.busy = false;
                warn!(error = %err, "procurement retrieval failed");
                self.notifier
                    .report_error(RETRIEVAL_FAILED_MESSAGE, RETRIEVAL_FAILED_TITLE);
                let _ = self.events.send(ControllerEvent::RetrievalFailed {
                    message: err.to_string(),
                });
            }
        }
        let _ = self.events.send(ControllerEvent::BusyChanged(false));
    }

    /// Selects a sort field and refetches.
    ///
    /// The new sort is recorded even when the refetch is dropped because a
    /// retrieval is in flight.
    pub async fn set_sorting(self: &Arc<Self>, field: impl Into<String>) -> Option<JoinHandle<()>> {
        {
            let mut guard = self.inner.lock().await;
            guard.sort.select(field.into());
            debug!(field = ?guard.sort.field, direction = ?guard.sort.direction, "sort changed");
        }
        self.retrieve().await
    }

    /// Changes one filter input. Never triggers a retrieval.
    pub async fn update_filter(&self, field: FilterField) {
        debug!(field = field.name(), "filter changed");
        self.inner.lock().await.filters.apply(field);
    }

    /// Extension point for loading a tender winner's details. Currently does nothing.
    pub fn get_winner_data(&self, _name: &str, _registration_number: &str) {}

    pub async fn winner_data(&self) -> Option<Record> {
        self.inner.lock().await.winner_data.clone()
    }

    pub async fn toggle_help(&self) -> bool {
        let mut guard = self.inner.lock().await;
        guard.help_visible = !guard.help_visible;
        guard.help_visible
    }

    pub async fn help_visible(&self) -> bool {
        self.inner.lock().await.help_visible
    }

    pub async fn rows(&self) -> Vec<Record> {
        self.inner.lock().await.rows.clone()
    }

    pub async fn is_busy(&self) -> bool {
        self.inner.lock().await.busy
    }

    pub async fn sort(&self) -> SortSpec {
        self.inner.lock().await.sort.clone()
    }

    pub async fn filters(&self) -> FilterCriteria {
        self.inner.lock().await.filters.clone()
    }

    pub async fn filter_spec(&self) -> FilterSpec {
        self.inner.lock().await.filters.to_filter_spec()
    }

    pub async fn sort_map(&self) -> SortMap {
        self.inner.lock().await.sort.to_sort_map()
    }

    pub fn limit(&self) -> u32 {
        self.config.limit
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
