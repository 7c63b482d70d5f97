//! Request body sent to the multi-catalog search endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub catalog_id: String,
    pub query: String,
    pub geometry: String,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Comma-joined ids of the active search-option filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}
