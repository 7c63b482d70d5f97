//! Measured quantities attached to a time-series result, and their value series.

use chrono::NaiveDate;
use common::{
    search_const::CUAHSI_CATALOG,
    search_result::VariableRecord,
    series::{SeriesInfo, ValueRecord, ValuesParams, ValuesResponse},
};
use serde::Serialize;
use tracing::debug;

use crate::{
    api::CatalogApi,
    dates::{fetch_window, format_date, parse_timestamp},
    error::VariableError,
};

/// One time-stamped measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    pub source_id: String,
    pub source_code: String,
    pub quality_control_level_code: String,
    pub value: Option<f64>,
    pub datetime: String,
    pub datetime_utc: String,
    pub utc_offset: String,
}

impl From<ValueRecord> for Value {
    fn from(record: ValueRecord) -> Self {
        Self {
            source_id: record.source_id,
            source_code: record.source_code,
            quality_control_level_code: record.quality_control_level_code,
            value: record.value,
            datetime: record.datetime,
            datetime_utc: record.date_time_utc,
            utc_offset: record.time_offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    id: String,
    name: String,
    units: String,
    concept_keyword: String,
    speciation: String,
    sample_medium: String,
    source_descriptor_id: String,
    site_id: String,
    values: Vec<Value>,
    most_recent_value: Option<f64>,
    begin_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    error: Option<VariableError>,
}

impl From<VariableRecord> for Variable {
    fn from(record: VariableRecord) -> Self {
        Self {
            begin_date: parse_timestamp(&record.begin_date),
            end_date: parse_timestamp(&record.end_date),
            id: record.id,
            name: record.name,
            units: record.units,
            concept_keyword: record.concept_keyword,
            speciation: record.speciation,
            sample_medium: record.sample_medium,
            source_descriptor_id: record.source_descriptor_id,
            site_id: record.site_id,
            values: Vec::new(),
            most_recent_value: None,
            error: None,
        }
    }
}

impl Variable {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn concept_keyword(&self) -> &str {
        &self.concept_keyword
    }

    pub fn speciation(&self) -> &str {
        &self.speciation
    }

    pub fn sample_medium(&self) -> &str {
        &self.sample_medium
    }

    pub fn source_descriptor_id(&self) -> &str {
        &self.source_descriptor_id
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn most_recent_value(&self) -> Option<f64> {
        self.most_recent_value
    }

    pub fn begin_date(&self) -> Option<NaiveDate> {
        self.begin_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn error(&self) -> Option<&VariableError> {
        self.error.as_ref()
    }

    /// Copies units, speciation and sample medium from the site's series metadata. A
    /// parseable time interval replaces the known begin and end dates.
    pub fn apply_metadata(&mut self, info: &SeriesInfo) {
        self.units = info.variable.units.abbreviation.clone();
        self.speciation = info.variable.speciation.clone();
        self.sample_medium = info.variable.sample_medium.clone();

        if let Some(interval) = &info.time_interval {
            let begin = parse_timestamp(&interval.begin_date_time);
            let end = parse_timestamp(&interval.end_date_time);
            if let (Some(begin), Some(end)) = (begin, end) {
                self.begin_date = Some(begin);
                self.end_date = Some(end);
            }
        }
    }

    /// The window actually fetched for a requested `[from, to]`; see [`fetch_window`].
    pub fn fetch_window(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<(NaiveDate, NaiveDate), VariableError> {
        match (self.begin_date, self.end_date) {
            (Some(begin), Some(end)) => Ok(fetch_window(begin, end, from, to)),
            _ => Err(VariableError::MissingDateRange),
        }
    }

    pub fn values_params(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<ValuesParams, VariableError> {
        let (from, to) = self.fetch_window(from, to)?;
        Ok(ValuesParams {
            catalog: CUAHSI_CATALOG.to_string(),
            source_descriptor_id: self.source_descriptor_id.clone(),
            site_id: self.site_id.clone(),
            variable_id: self.id.clone(),
            from_date: format_date(from),
            to_date: format_date(to),
        })
    }

    /// Replaces the value series with a fetched one. An empty series keeps the previous
    /// values but clears the most recent value and records `NoValuesReturned`.
    pub fn apply_values(&mut self, response: ValuesResponse) -> Result<(), VariableError> {
        let ValuesResponse { variable, values } = response;
        if !variable.name.is_empty() {
            self.name = variable.name;
        }
        if !variable.sample_medium.is_empty() {
            self.sample_medium = variable.sample_medium;
        }
        if !variable.units.abbreviation.is_empty() {
            self.units = variable.units.abbreviation;
        }

        if values.is_empty() {
            self.most_recent_value = None;
            self.error = Some(VariableError::NoValuesReturned);
            return Err(VariableError::NoValuesReturned);
        }
        self.values = values.into_iter().map(Value::from).collect();
        self.most_recent_value = self.values.last().and_then(|v| v.value);
        self.error = None;
        Ok(())
    }

    pub fn record_failure(&mut self, error: VariableError) {
        self.error = Some(error);
    }

    /// Fetches this variable's values over the window chosen for `[from, to]`.
    ///
    /// Failures are recorded on the variable as well as returned.
    pub async fn search<A: CatalogApi>(
        &mut self,
        api: &A,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<(), VariableError> {
        self.error = None;
        let params = match self.values_params(from, to) {
            Ok(params) => params,
            Err(e) => {
                self.record_failure(e.clone());
                return Err(e);
            }
        };
        match api.values(&params).await {
            Ok(response) => self.apply_values(response),
            Err(e) => {
                debug!(variable = %self.id, error = %e, "value fetch failed");
                let error = VariableError::from_api_error(&e);
                self.record_failure(error.clone());
                Err(error)
            }
        }
    }
}

/// The variables of one result, in server order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct VariableSet {
    variables: Vec<Variable>,
}

impl VariableSet {
    pub fn new(variables: impl IntoIterator<Item = Variable>) -> Self {
        Self { variables: variables.into_iter().collect() }
    }

    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.id == id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Variable> {
        self.variables.iter_mut()
    }

    pub fn first(&self) -> Option<&Variable> {
        self.variables.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
