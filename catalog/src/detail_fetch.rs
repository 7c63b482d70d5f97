//! Fetching a time-series result's per-variable metadata and values.
//!
//! One details request covers the whole site; after it lands, every variable's values are
//! fetched concurrently. A failing variable does not stop the others, and the result's
//! `fetching` flag clears only after all of them settled.

use std::sync::Arc;

use chrono::NaiveDate;
use common::{search_const::CUAHSI_CATALOG, series::DetailsParams};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    api::CatalogApi,
    catalog::Catalog,
    error::{DetailFailure, VariableError},
    handle::TaskHandle,
    progress::{SeriesProgress, SilentReporter},
    variable::Variable,
};

pub type DetailHandle = TaskHandle<DetailOutcome>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Completed,
    Failed(DetailFailure),
    /// The result was replaced by a new search page or a newer fetch before this one settled.
    /// Nothing was written back.
    Superseded,
}

/// The requested value window and where to report per-variable progress.
#[derive(Clone)]
pub struct DetailFetchOptions {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub reporter: Arc<dyn SeriesProgress>,
}

impl Default for DetailFetchOptions {
    fn default() -> Self {
        Self { from_date: None, to_date: None, reporter: Arc::new(SilentReporter) }
    }
}

impl DetailFetchOptions {
    pub fn with_range(mut self, from_date: Option<NaiveDate>, to_date: Option<NaiveDate>) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self
    }

    pub fn with_reporter(mut self, reporter: impl SeriesProgress + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }
}

impl<A: CatalogApi> Catalog<A> {
    /// Starts fetching series for a time-series result.
    ///
    /// Returns `None` if the result is unknown or has no variables. While a fetch for the
    /// result is pending, or after one succeeded, the existing handle is returned instead of
    /// issuing new requests; a result whose last fetch failed is fetched again.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fetch_detail_series(&self, result_id: &str, options: DetailFetchOptions) -> Option<DetailHandle> {
        self.transition(|state| {
            let result = state.data.results.get(result_id)?;
            if let Some(existing) = state.detail_fetches.get(result_id) {
                if !result.error {
                    return Some(existing.clone());
                }
            }
            let first = result.variables.as_ref()?.first()?;
            let params = DetailsParams {
                catalog: CUAHSI_CATALOG.to_string(),
                source_descriptor_id: first.source_descriptor_id().to_string(),
                site_id: result.id().to_string(),
            };
            state.data.results.get_mut(result_id)?.fetching = true;
            state.detail_ids += 1;
            let id = state.detail_ids;
            info!(catalog = %self.id(), result = %result_id, site = %params.site_id, fetch = id, "fetching series details");

            let catalog = self.clone();
            let owned_id = result_id.to_string();
            let task = tokio::spawn(async move { catalog.run_detail_fetch(&owned_id, id, params, options).await });
            let handle = DetailHandle::spawned(id, task, |e| {
                DetailOutcome::Failed(DetailFailure::Metadata { reason: e.to_string() })
            });
            state.detail_fetches.insert(result_id.to_string(), handle.clone());
            Some(handle)
        })
    }

    async fn run_detail_fetch(
        &self,
        result_id: &str,
        fetch_id: u64,
        params: DetailsParams,
        options: DetailFetchOptions,
    ) -> DetailOutcome {
        let details = match self.api().details(&params).await {
            Ok(details) => details,
            Err(e) => {
                warn!(result = %result_id, error = %e, "series metadata fetch failed");
                let owned = self.transition(|state| {
                    if !state.owns_detail_fetch(result_id, fetch_id) {
                        return false;
                    }
                    if let Some(result) = state.data.results.get_mut(result_id) {
                        result.error = true;
                        result.fetching = false;
                    }
                    true
                });
                if !owned {
                    return DetailOutcome::Superseded;
                }
                return DetailOutcome::Failed(DetailFailure::Metadata { reason: e.to_string() });
            }
        };

        let variables: Option<Vec<Variable>> = self.transition(|state| {
            if !state.owns_detail_fetch(result_id, fetch_id) {
                return None;
            }
            let variables = state.data.results.get_mut(result_id).and_then(|r| r.variables.as_mut())?;
            for variable in variables.iter_mut() {
                if let Some(info) = details.series_for(variable.id()) {
                    variable.apply_metadata(info);
                }
            }
            Some(variables.iter().cloned().collect())
        });
        let Some(variables) = variables else {
            debug!(result = %result_id, fetch = fetch_id, "fetch superseded before metadata landed");
            return DetailOutcome::Superseded;
        };
        debug!(result = %result_id, variables = variables.len(), "fetching variable values");

        let options = &options;
        let fetches = variables.into_iter().map(|mut variable| async move {
            let result = variable.search(self.api(), options.from_date, options.to_date).await;

            let stored = self.transition(|state| {
                if !state.owns_detail_fetch(result_id, fetch_id) {
                    return false;
                }
                let slot = state
                    .data
                    .results
                    .get_mut(result_id)
                    .and_then(|r| r.variables.as_mut())
                    .and_then(|variables| variables.get_mut(variable.id()));
                match slot {
                    Some(slot) => {
                        *slot = variable.clone();
                        true
                    }
                    None => false,
                }
            });
            if !stored {
                debug!(result = %result_id, variable = %variable.id(), "result replaced before values arrived");
            }

            match &result {
                Err(error) if error.fails_fetch() => options.reporter.variable_failed(result_id, &variable, error),
                _ => options.reporter.variable_fetched(result_id, &variable),
            }
            result.err().filter(VariableError::fails_fetch).map(|_| variable.id().to_string())
        });
        let failed: Vec<String> = join_all(fetches).await.into_iter().flatten().collect();

        let error = !failed.is_empty();
        let owned = self.transition(|state| {
            if !state.owns_detail_fetch(result_id, fetch_id) {
                return false;
            }
            if let Some(result) = state.data.results.get_mut(result_id) {
                result.error = error;
                result.fetching = false;
            }
            true
        });
        if !owned {
            debug!(result = %result_id, fetch = fetch_id, "fetch superseded before values settled");
            DetailOutcome::Superseded
        } else if error {
            warn!(result = %result_id, failed = ?failed, "some variable fetches failed");
            DetailOutcome::Failed(DetailFailure::Values { failed })
        } else {
            info!(result = %result_id, "series details complete");
            DetailOutcome::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::{
        catalog::CatalogDefinition,
        config::CatalogConfig,
        error::VariableError,
        progress::Callbacks,
        test_utils::{
            Reply, ScriptedApi, details_response, result_record, search_response, series_record,
            values_response,
        },
    };

    async fn searched_catalog(api: &Arc<ScriptedApi>, variable_ids: &[&str]) -> Catalog<ScriptedApi> {
        api.reply_search(search_response(
            "cuahsi",
            2,
            None,
            vec![series_record("site-a", variable_ids), result_record("plain")],
        ));
        let catalog = Catalog::new(
            CatalogDefinition::new("cuahsi", "WDC"),
            Arc::clone(api),
            CatalogConfig::default(),
        );
        catalog.search("nitrogen", "POLYGON").await;
        catalog
    }

    fn variable(catalog: &Catalog<ScriptedApi>, variable_id: &str) -> Variable {
        let snapshot = catalog.snapshot();
        let result = snapshot.results.get("site-a").unwrap();
        result.variables().unwrap().get(variable_id).unwrap().clone()
    }

    #[tokio::test]
    async fn test_fetch_populates_metadata_and_values() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1", "v2"]).await;
        api.reply_details(details_response(&[
            ("v1", Some(("2019-01-01T00:00:00", "2019-03-15T00:00:00"))),
            ("v2", None),
        ]));
        api.reply_values("v1", values_response(&[1.0, 2.0]));
        api.reply_values("v2", values_response(&[5.0]));

        let handle = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        assert!(catalog.snapshot().results.get("site-a").unwrap().is_fetching());
        assert_eq!(handle.await, DetailOutcome::Completed);

        let details = api.details_requests();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].catalog, "cuahsi");
        assert_eq!(details[0].site_id, "site-a");

        let mut values = api.values_requests();
        values.sort_by(|a, b| a.variable_id.cmp(&b.variable_id));
        assert_eq!((values[0].from_date.as_str(), values[0].to_date.as_str()), ("02/15/2019", "03/15/2019"));
        assert_eq!((values[1].from_date.as_str(), values[1].to_date.as_str()), ("05/01/2020", "06/01/2020"));

        let v1 = variable(&catalog, "v1");
        assert_eq!(v1.speciation(), "N");
        assert_eq!(v1.most_recent_value(), Some(2.0));
        let result = catalog.snapshot().results.get("site-a").unwrap().clone();
        assert!(!result.is_fetching());
        assert!(!result.has_error());
    }

    #[tokio::test]
    async fn test_metadata_failure_skips_value_fetches() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1"]).await;
        api.fail_details(500);

        let outcome = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap().await;
        assert!(matches!(outcome, DetailOutcome::Failed(DetailFailure::Metadata { .. })));
        assert!(api.values_requests().is_empty());
        let result = catalog.snapshot().results.get("site-a").unwrap().clone();
        assert!(result.has_error());
        assert!(!result.is_fetching());
    }

    #[tokio::test]
    async fn test_failing_variable_does_not_block_others() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1", "v2", "v3"]).await;
        api.reply_details(details_response(&[]));
        api.reply_values("v1", values_response(&[1.0]));
        api.fail_values("v2", 500);
        let slow = api.gate_values("v3");

        let done = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let reporter = Callbacks {
            on_each_done: {
                let done = Arc::clone(&done);
                move |_: &Variable| {
                    done.fetch_add(1, Ordering::SeqCst);
                }
            },
            on_each_fail: {
                let failed = Arc::clone(&failed);
                move |_: &Variable, _: &VariableError| {
                    failed.fetch_add(1, Ordering::SeqCst);
                }
            },
        };
        let handle = catalog
            .fetch_detail_series("site-a", DetailFetchOptions::default().with_reporter(reporter))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while done.load(Ordering::SeqCst) < 1 || failed.load(Ordering::SeqCst) < 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(catalog.snapshot().results.get("site-a").unwrap().is_fetching());
        assert_eq!(variable(&catalog, "v1").most_recent_value(), Some(1.0));
        assert_eq!(
            variable(&catalog, "v2").error().map(ToString::to_string).as_deref(),
            Some("Error 500 during fetch")
        );

        slow.send(Reply::Ok(values_response(&[3.0, 4.0]))).ok().unwrap();
        let outcome = handle.await;
        assert_eq!(outcome, DetailOutcome::Failed(DetailFailure::Values { failed: vec!["v2".to_string()] }));

        let result = catalog.snapshot().results.get("site-a").unwrap().clone();
        assert!(result.has_error());
        assert!(!result.is_fetching());
        assert_eq!(variable(&catalog, "v3").most_recent_value(), Some(4.0));
        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_series_does_not_fail_the_fetch() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1"]).await;
        api.reply_details(details_response(&[]));
        api.reply_values("v1", values_response(&[]));

        let outcome = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap().await;
        assert_eq!(outcome, DetailOutcome::Completed);
        assert_eq!(variable(&catalog, "v1").error(), Some(&VariableError::NoValuesReturned));
        assert!(!catalog.snapshot().results.get("site-a").unwrap().has_error());
    }

    #[tokio::test]
    async fn test_pending_and_successful_fetches_are_reused() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1"]).await;
        let gate = api.gate_details();
        api.reply_values("v1", values_response(&[1.0]));

        let first = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        let second = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        assert_eq!(first.id(), second.id());

        gate.send(Reply::Ok(details_response(&[]))).ok().unwrap();
        assert_eq!(second.await, DetailOutcome::Completed);

        let third = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        assert_eq!(third.id(), first.id());
        assert_eq!(api.details_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1"]).await;
        api.fail_details(503);

        let first = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        first.clone().await;

        api.reply_details(details_response(&[]));
        api.reply_values("v1", values_response(&[2.0]));
        let retry = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        assert_ne!(retry.id(), first.id());
        assert_eq!(retry.await, DetailOutcome::Completed);
        assert!(!catalog.snapshot().results.get("site-a").unwrap().has_error());
        assert_eq!(api.details_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_for_replaced_page_does_not_write_back() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1"]).await;
        let old_values = api.gate_values("v1");
        api.reply_details(details_response(&[]));
        let old_fetch = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while api.values_requests().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        api.reply_search(search_response("cuahsi", 1, None, vec![series_record("site-a", &["v1"])]));
        catalog.search("nitrogen", "POLYGON").await;
        let new_details = api.gate_details();
        let new_fetch = catalog.fetch_detail_series("site-a", DetailFetchOptions::default()).unwrap();
        assert_ne!(new_fetch.id(), old_fetch.id());
        api.reply_values("v1", values_response(&[1.0]));

        old_values.send(Reply::Ok(values_response(&[9.0]))).ok().unwrap();
        assert_eq!(old_fetch.await, DetailOutcome::Superseded);
        assert!(catalog.snapshot().results.get("site-a").unwrap().is_fetching());
        assert_eq!(variable(&catalog, "v1").most_recent_value(), None);

        new_details.send(Reply::Ok(details_response(&[]))).ok().unwrap();
        assert_eq!(new_fetch.await, DetailOutcome::Completed);
        let result = catalog.snapshot().results.get("site-a").unwrap().clone();
        assert!(!result.is_fetching());
        assert!(!result.has_error());
        assert_eq!(variable(&catalog, "v1").most_recent_value(), Some(1.0));
    }

    #[tokio::test]
    async fn test_results_without_variables_are_not_fetched() {
        let api = Arc::new(ScriptedApi::new());
        let catalog = searched_catalog(&api, &["v1"]).await;

        assert!(catalog.fetch_detail_series("plain", DetailFetchOptions::default()).is_none());
        assert!(catalog.fetch_detail_series("missing", DetailFetchOptions::default()).is_none());
        assert!(api.details_requests().is_empty());
    }
}
