use reqwest::{Client, Response, Url, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use common::{
    search_query::SearchRequest,
    search_result::CatalogSearchResponse,
    series::{DetailsParams, DetailsResponse, ValuesParams, ValuesResponse},
};

use crate::{api::CatalogApi, config::ClientConfig, error::ApiError};

/// [`CatalogApi`] over HTTP with `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpCatalogApi {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpCatalogApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| ApiError::InvalidUrl(config.base_url.clone()))?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, base_url, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn post_search(&self, url: Url, body: String) -> Result<Vec<CatalogSearchResponse>, ApiError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let url = response.url().path().to_string();
    let response_txt = response.text().await?;
    if status.is_client_error() || status.is_server_error() {
        warn!("{url}: HTTP {status}");
        return Err(ApiError::Status { status: status.as_u16(), body: response_txt });
    }
    debug!("{url}: HTTP {status}, len = {}", response_txt.len());
    Ok(serde_json::from_str(&response_txt)?)
}

impl CatalogApi for HttpCatalogApi {
    async fn search(
        &self,
        request: &SearchRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<CatalogSearchResponse>, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let url = self.endpoint(&self.config.search_path)?;
        let body = serde_json::to_string(request)?;
        debug!(catalog = %request.catalog_id, page = ?request.page, "POST {}", url);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.post_search(url, body) => result,
        }
    }

    async fn details(&self, params: &DetailsParams) -> Result<DetailsResponse, ApiError> {
        let url = self.endpoint(&self.config.details_path)?;
        debug!(site = %params.site_id, "GET {}", url);
        let response = self.client.get(url).query(params).send().await?;
        read_json(response).await
    }

    async fn values(&self, params: &ValuesParams) -> Result<ValuesResponse, ApiError> {
        let url = self.endpoint(&self.config.values_path)?;
        debug!(
            site = %params.site_id,
            variable = %params.variable_id,
            from = %params.from_date,
            to = %params.to_date,
            "GET {}", url
        );
        let response = self.client.get(url).query(params).send().await?;
        read_json(response).await
    }
}
