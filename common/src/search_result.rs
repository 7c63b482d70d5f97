use serde::{Deserialize, Serialize};

/// One entry of the search endpoint's response; there is one per catalog searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSearchResponse {
    #[serde(rename = "catalogId", alias = "catalog")]
    pub catalog_id: String,
    #[serde(default)]
    pub results: Vec<ResultRecord>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub page: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResultRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// GeoJSON geometry of the hit.
    #[serde(alias = "geom")]
    pub geometry: Option<serde_json::Value>,
    pub links: Vec<Link>,
    pub created_at: String,
    pub updated_at: String,
    /// Only time-series catalogs attach variables to their results.
    pub variables: Option<Vec<VariableRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VariableRecord {
    pub id: String,
    pub name: String,
    pub units: String,
    pub concept_keyword: String,
    pub speciation: String,
    pub sample_medium: String,
    #[serde(rename = "sourceDescriptorId", alias = "wsdl")]
    pub source_descriptor_id: String,
    #[serde(rename = "siteId", alias = "site")]
    pub site_id: String,
    pub begin_date: String,
    pub end_date: String,
}

impl CatalogSearchResponse {
    /// Picks the entry belonging to `catalog_id` out of a multi-catalog response.
    pub fn find<'a>(responses: &'a [CatalogSearchResponse], catalog_id: &str) -> Option<&'a CatalogSearchResponse> {
        responses.iter().find(|entry| entry.catalog_id == catalog_id)
    }
}
