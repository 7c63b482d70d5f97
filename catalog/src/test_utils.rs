//! Scripted [`CatalogApi`] and record builders for unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use common::{
    search_query::SearchRequest,
    search_result::{CatalogSearchResponse, Link, ResultRecord, VariableRecord},
    series::{
        DetailsParams, DetailsResponse, SeriesInfo, SeriesVariable, TimeInterval, Units,
        ValueRecord, ValuesParams, ValuesResponse,
    },
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{api::CatalogApi, error::ApiError};

pub(crate) enum Reply<T> {
    Ok(T),
    Status(u16),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T, ApiError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Status(status) => Err(ApiError::Status { status, body: String::new() }),
        }
    }
}

enum Scripted<T> {
    Ready(Reply<T>),
    Gated(oneshot::Receiver<Reply<T>>),
}

async fn settle<T>(script: Scripted<T>, cancel: CancellationToken) -> Result<T, ApiError> {
    match script {
        Scripted::Ready(reply) => {
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            reply.into_result()
        }
        Scripted::Gated(rx) => tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            reply = rx => reply.map_err(|_| ApiError::Cancelled).and_then(Reply::into_result),
        },
    }
}

/// Replies are queued per endpoint; values replies are keyed by variable id. Unscripted
/// searches and details fail with 500, unscripted values with 404.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    searches: Mutex<VecDeque<Scripted<Vec<CatalogSearchResponse>>>>,
    details: Mutex<VecDeque<Scripted<DetailsResponse>>>,
    values: Mutex<HashMap<String, Scripted<ValuesResponse>>>,
    search_requests: Mutex<Vec<SearchRequest>>,
    details_requests: Mutex<Vec<DetailsParams>>,
    values_requests: Mutex<Vec<ValuesParams>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply_search(&self, responses: Vec<CatalogSearchResponse>) {
        self.searches.lock().unwrap().push_back(Scripted::Ready(Reply::Ok(responses)));
    }

    pub(crate) fn fail_search(&self, status: u16) {
        self.searches.lock().unwrap().push_back(Scripted::Ready(Reply::Status(status)));
    }

    /// The next search waits until the returned sender fires or the search is cancelled.
    pub(crate) fn gate_search(&self) -> oneshot::Sender<Reply<Vec<CatalogSearchResponse>>> {
        let (tx, rx) = oneshot::channel();
        self.searches.lock().unwrap().push_back(Scripted::Gated(rx));
        tx
    }

    pub(crate) fn reply_details(&self, response: DetailsResponse) {
        self.details.lock().unwrap().push_back(Scripted::Ready(Reply::Ok(response)));
    }

    pub(crate) fn fail_details(&self, status: u16) {
        self.details.lock().unwrap().push_back(Scripted::Ready(Reply::Status(status)));
    }

    pub(crate) fn gate_details(&self) -> oneshot::Sender<Reply<DetailsResponse>> {
        let (tx, rx) = oneshot::channel();
        self.details.lock().unwrap().push_back(Scripted::Gated(rx));
        tx
    }

    pub(crate) fn reply_values(&self, variable_id: &str, response: ValuesResponse) {
        self.values
            .lock()
            .unwrap()
            .insert(variable_id.to_string(), Scripted::Ready(Reply::Ok(response)));
    }

    pub(crate) fn fail_values(&self, variable_id: &str, status: u16) {
        self.values
            .lock()
            .unwrap()
            .insert(variable_id.to_string(), Scripted::Ready(Reply::Status(status)));
    }

    pub(crate) fn gate_values(&self, variable_id: &str) -> oneshot::Sender<Reply<ValuesResponse>> {
        let (tx, rx) = oneshot::channel();
        self.values.lock().unwrap().insert(variable_id.to_string(), Scripted::Gated(rx));
        tx
    }

    pub(crate) fn search_requests(&self) -> Vec<SearchRequest> {
        self.search_requests.lock().unwrap().clone()
    }

    pub(crate) fn details_requests(&self) -> Vec<DetailsParams> {
        self.details_requests.lock().unwrap().clone()
    }

    pub(crate) fn values_requests(&self) -> Vec<ValuesParams> {
        self.values_requests.lock().unwrap().clone()
    }
}

impl CatalogApi for ScriptedApi {
    async fn search(
        &self,
        request: &SearchRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<CatalogSearchResponse>, ApiError> {
        self.search_requests.lock().unwrap().push(request.clone());
        let script = self.searches.lock().unwrap().pop_front();
        settle(script.unwrap_or(Scripted::Ready(Reply::Status(500))), cancel).await
    }

    async fn details(&self, params: &DetailsParams) -> Result<DetailsResponse, ApiError> {
        self.details_requests.lock().unwrap().push(params.clone());
        let script = self.details.lock().unwrap().pop_front();
        settle(script.unwrap_or(Scripted::Ready(Reply::Status(500))), CancellationToken::new()).await
    }

    async fn values(&self, params: &ValuesParams) -> Result<ValuesResponse, ApiError> {
        self.values_requests.lock().unwrap().push(params.clone());
        let script = self.values.lock().unwrap().remove(&params.variable_id);
        settle(script.unwrap_or(Scripted::Ready(Reply::Status(404))), CancellationToken::new()).await
    }
}

pub(crate) fn search_response(
    catalog_id: &str,
    count: u64,
    page: Option<u64>,
    results: Vec<ResultRecord>,
) -> Vec<CatalogSearchResponse> {
    vec![CatalogSearchResponse { catalog_id: catalog_id.to_string(), results, count, page }]
}

pub(crate) fn result_record(id: &str) -> ResultRecord {
    ResultRecord {
        id: id.to_string(),
        title: format!("Result {id}"),
        description: Some(format!("Description of {id}")),
        links: vec![Link { href: format!("http://example.com/{id}"), link_type: "details".to_string() }],
        ..Default::default()
    }
}

pub(crate) fn variable_record(id: &str, begin_date: &str, end_date: &str) -> VariableRecord {
    VariableRecord {
        id: id.to_string(),
        name: format!("Variable {id}"),
        units: "mg/L".to_string(),
        concept_keyword: "Nitrogen".to_string(),
        source_descriptor_id: "http://example.com/cuahsi_1_1.asmx?WSDL".to_string(),
        site_id: "site-1".to_string(),
        begin_date: begin_date.to_string(),
        end_date: end_date.to_string(),
        ..Default::default()
    }
}

/// A time-series result whose variables all cover Jan to Jun 2020.
pub(crate) fn series_record(id: &str, variable_ids: &[&str]) -> ResultRecord {
    let variables = variable_ids
        .iter()
        .map(|v| VariableRecord { site_id: id.to_string(), ..variable_record(v, "2020-01-01", "2020-06-01") })
        .collect();
    ResultRecord { variables: Some(variables), ..result_record(id) }
}

pub(crate) fn details_response(series: &[(&str, Option<(&str, &str)>)]) -> DetailsResponse {
    let series = series
        .iter()
        .map(|(id, interval)| {
            let info = SeriesInfo {
                variable: SeriesVariable {
                    name: format!("Variable {id}"),
                    units: Units { abbreviation: "mg/L".to_string() },
                    speciation: "N".to_string(),
                    sample_medium: "Surface Water".to_string(),
                },
                time_interval: interval.map(|(begin, end)| TimeInterval {
                    begin_date_time: begin.to_string(),
                    end_date_time: end.to_string(),
                }),
            };
            (id.to_string(), info)
        })
        .collect();
    DetailsResponse { series }
}

pub(crate) fn values_response(values: &[f64]) -> ValuesResponse {
    ValuesResponse {
        variable: SeriesVariable {
            name: "Nitrogen".to_string(),
            units: Units { abbreviation: "mg/L".to_string() },
            ..Default::default()
        },
        values: values
            .iter()
            .enumerate()
            .map(|(i, value)| ValueRecord {
                value: Some(*value),
                datetime: format!("2020-05-{:02}T00:00:00", i + 1),
                ..Default::default()
            })
            .collect(),
    }
}
