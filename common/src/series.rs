//! Detail metadata and value series exchanged with the time-series endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsParams {
    pub catalog: String,
    pub source_descriptor_id: String,
    pub site_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DetailsResponse {
    /// Keyed by variable id.
    #[serde(default)]
    pub series: BTreeMap<String, SeriesInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub variable: SeriesVariable,
    #[serde(default, rename = "{http://www.cuahsi.org/water_ml/1.1/}variable_time_interval")]
    pub time_interval: Option<TimeInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SeriesVariable {
    pub name: String,
    pub units: Units,
    pub speciation: String,
    pub sample_medium: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Units {
    pub abbreviation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub begin_date_time: String,
    pub end_date_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesParams {
    pub catalog: String,
    #[serde(rename = "sourceDescriptorId")]
    pub source_descriptor_id: String,
    #[serde(rename = "siteId")]
    pub site_id: String,
    #[serde(rename = "variableId")]
    pub variable_id: String,
    /// `MM/DD/YYYY`
    pub from_date: String,
    /// `MM/DD/YYYY`
    pub to_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValuesResponse {
    #[serde(default)]
    pub variable: SeriesVariable,
    #[serde(default)]
    pub values: Vec<ValueRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValueRecord {
    pub source_id: String,
    pub source_code: String,
    pub quality_control_level_code: String,
    pub value: Option<f64>,
    pub datetime: String,
    #[serde(alias = "datetime_utc")]
    pub date_time_utc: String,
    #[serde(alias = "utc_offset")]
    pub time_offset: String,
}

impl DetailsResponse {
    pub fn series_for(&self, variable_id: &str) -> Option<&SeriesInfo> {
        self.series.get(variable_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_const::WATERML_VARIABLE_TIME_INTERVAL;

    #[test]
    fn test_details_response_reads_time_interval() {
        let json = format!(
            r#"{{"series": {{
                "var-1": {{
                    "variable": {{"units": {{"abbreviation": "mg/L"}}, "speciation": "N", "sample_medium": "Surface water"}},
                    "{WATERML_VARIABLE_TIME_INTERVAL}": {{"begin_date_time": "2019-01-01T00:00:00", "end_date_time": "2020-06-01T00:00:00"}}
                }},
                "var-2": {{"variable": {{"units": {{"abbreviation": "cfs"}}}}}}
            }}}}"#
        );
        let response: DetailsResponse = serde_json::from_str(&json).unwrap();
        let first = response.series_for("var-1").unwrap();
        assert_eq!(first.variable.units.abbreviation, "mg/L");
        assert_eq!(first.time_interval.as_ref().unwrap().end_date_time, "2020-06-01T00:00:00");
        assert!(response.series_for("var-2").unwrap().time_interval.is_none());
    }

    #[test]
    fn test_values_params_wire_names() {
        let params = ValuesParams {
            catalog: "cuahsi".to_string(),
            source_descriptor_id: "wsdl".to_string(),
            site_id: "site".to_string(),
            variable_id: "var".to_string(),
            from_date: "05/01/2020".to_string(),
            to_date: "06/01/2020".to_string(),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["variableId"], "var");
        assert_eq!(json["from_date"], "05/01/2020");
    }
}
