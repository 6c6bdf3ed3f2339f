use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::SortDirection;

/// Inclusive bounds for a numeric column, in document-store operator form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter<T> {
    #[serde(rename = "$gte", default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<T>,
    #[serde(rename = "$lte", default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<T>,
}

impl<T> RangeFilter<T> {
    /// Returns `None` unless at least one bound is set.
    pub fn from_bounds(gte: Option<T>, lte: Option<T>) -> Option<Self> {
        if gte.is_none() && lte.is_none() {
            None
        } else {
            Some(Self { gte, lte })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<RangeFilter<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tender_num: Option<RangeFilter<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_name: Option<String>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.tender_num.is_none() && self.authority_name.is_none()
    }
}

/// Sort directive sent with a query: field name to direction, at most one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortMap(BTreeMap<String, SortDirection>);

impl SortMap {
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), direction);
        Self(map)
    }

    pub fn direction_of(&self, field: &str) -> Option<SortDirection> {
        self.0.get(field).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything a data source needs to answer one listing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementQuery {
    pub limit: u32,
    pub filters: FilterSpec,
    pub sort: SortMap,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
