//! Immutable catalog snapshots and the change events published for them.

use std::sync::Arc;

use serde::Serialize;

use crate::{error::SearchFailure, filter::FilterSet, result::{ResultSet, SearchResult}};

/// Everything observable about one catalog at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub query: String,
    pub geometry: String,
    pub loading: bool,
    /// Results may not reflect the current query and filters.
    pub stale: bool,
    pub active: bool,
    pub result_count: u64,
    pub page: u64,
    pub error: Option<SearchFailure>,
    pub filters: FilterSet,
    pub results: ResultSet,
    /// Id of the result shown as detail, mirrored from `results`.
    pub detail_result: Option<String>,
}

impl CatalogSnapshot {
    pub fn detail(&self) -> Option<&SearchResult> {
        self.detail_result.as_deref().and_then(|id| self.results.get(id))
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogField {
    Query,
    Geometry,
    Loading,
    Stale,
    Active,
    ResultCount,
    Page,
    Error,
    Filters,
    Results,
    DetailResult,
}

/// Fields that differ between two snapshots, in declaration order.
pub fn changed_fields(before: &CatalogSnapshot, after: &CatalogSnapshot) -> Vec<CatalogField> {
    let checks = [
        (CatalogField::Query, before.query != after.query),
        (CatalogField::Geometry, before.geometry != after.geometry),
        (CatalogField::Loading, before.loading != after.loading),
        (CatalogField::Stale, before.stale != after.stale),
        (CatalogField::Active, before.active != after.active),
        (CatalogField::ResultCount, before.result_count != after.result_count),
        (CatalogField::Page, before.page != after.page),
        (CatalogField::Error, before.error != after.error),
        (CatalogField::Filters, before.filters != after.filters),
        (CatalogField::Results, before.results != after.results),
        (CatalogField::DetailResult, before.detail_result != after.detail_result),
    ];
    checks.into_iter().filter(|(_, changed)| *changed).map(|(field, _)| field).collect()
}

/// Published after every transition that changed at least one field.
#[derive(Debug, Clone)]
pub struct CatalogEvent {
    pub catalog_id: String,
    pub changed: Vec<CatalogField>,
    pub snapshot: Arc<CatalogSnapshot>,
}

impl CatalogEvent {
    pub fn touches(&self, field: CatalogField) -> bool {
        self.changed.contains(&field)
    }
}
