//! Client and catalog configuration.

use std::time::Duration;

use anyhow::Context;
use common::search_const::PAGE_SIZE;

/// HTTP client configuration for the catalog endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub search_path: String,
    pub details_path: String,
    pub values_path: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            search_path: "/bigcz/search".to_string(),
            details_path: "/bigcz/details".to_string(),
            values_path: "/bigcz/values".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("catalog/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Reads `CATALOG_API_URL` and `CATALOG_CLIENT_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("CATALOG_API_URL") {
            config.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("CATALOG_CLIENT_TIMEOUT_SECS") {
            let secs = timeout
                .parse::<u64>()
                .with_context(|| format!("CATALOG_CLIENT_TIMEOUT_SECS is not a number: {timeout}"))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Per-catalog search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub page_size: u64,
    /// Buffered events per subscriber before slow receivers start lagging.
    pub event_capacity: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            event_capacity: 64,
        }
    }
}

impl CatalogConfig {
    /// Reads `CATALOG_PAGE_SIZE`, falling back to the default page size.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(page_size) = std::env::var("CATALOG_PAGE_SIZE") {
            let page_size = page_size
                .parse::<u64>()
                .with_context(|| format!("CATALOG_PAGE_SIZE is not a number: {page_size}"))?;
            anyhow::ensure!(page_size > 0, "CATALOG_PAGE_SIZE must be positive");
            config.page_size = page_size;
        }
        Ok(config)
    }

    /// `ceil(result_count / page_size)`
    pub fn last_page(&self, result_count: u64) -> u64 {
        result_count.div_ceil(self.page_size.max(1))
    }
}
