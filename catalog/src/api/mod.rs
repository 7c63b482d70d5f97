//! Transport seam between the catalog core and the search, details and values endpoints.
//!
//! Catalogs and the detail-fetch pipeline only talk to [`CatalogApi`], so tests can drive
//! them with an in-memory implementation and [`HttpCatalogApi`] stays a thin adapter.

use std::future::Future;

use common::{
    search_query::SearchRequest,
    search_result::CatalogSearchResponse,
    series::{DetailsParams, DetailsResponse, ValuesParams, ValuesResponse},
};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

mod http_client;
pub use http_client::HttpCatalogApi;

pub trait CatalogApi: Send + Sync + 'static {
    /// Runs a search. Implementations must resolve to [`ApiError::Cancelled`] once `cancel`
    /// fires, instead of delivering a late response.
    fn search(
        &self,
        request: &SearchRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Vec<CatalogSearchResponse>, ApiError>> + Send;

    /// Fetches per-variable series metadata for one site.
    fn details(
        &self,
        params: &DetailsParams,
    ) -> impl Future<Output = Result<DetailsResponse, ApiError>> + Send;

    /// Fetches one variable's values over a date window.
    fn values(
        &self,
        params: &ValuesParams,
    ) -> impl Future<Output = Result<ValuesResponse, ApiError>> + Send;
}
