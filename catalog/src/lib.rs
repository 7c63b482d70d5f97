//! Catalog search and time-series detail fetching for the data catalog.
//!
//! A [`Catalog`] owns the query, filters and paged results for one data source and talks to
//! the search service through a [`CatalogApi`]. Time-series results can fetch per-variable
//! metadata and values with [`Catalog::fetch_detail_series`].

pub mod api;
pub mod catalog;
pub mod config;
pub mod data_definitions;
pub mod dates;
pub mod detail_fetch;
pub mod error;
pub mod events;
pub mod filter;
pub mod handle;
pub mod progress;
pub mod result;
pub mod variable;

#[cfg(test)]
mod test_utils;

pub use api::{CatalogApi, HttpCatalogApi};
pub use catalog::{Catalog, CatalogDefinition, CatalogSet, FilterReaction, SearchHandle, SearchOutcome};
pub use config::{CatalogConfig, ClientConfig};
pub use detail_fetch::{DetailFetchOptions, DetailHandle, DetailOutcome};
pub use error::{ApiError, DetailFailure, SearchFailure, VariableError};
pub use events::{CatalogEvent, CatalogField, CatalogSnapshot};
pub use filter::{Filter, FilterKind, FilterSet};
