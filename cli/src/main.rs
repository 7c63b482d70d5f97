use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use serde_json::json;
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

use catalog::{
    Catalog, CatalogConfig, CatalogEvent, CatalogSet, ClientConfig, DetailFetchOptions, DetailOutcome,
    HttpCatalogApi, SearchOutcome,
    data_definitions::{DetailController, SearchForm},
    dates::parse_date,
    progress::TracingReporter,
};
use cli::{Command, Config, SearchArgs, apply_filters, catalog_definitions};

type Catalogs = CatalogSet<HttpCatalogApi>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let client_config = ClientConfig::from_env()?.with_base_url(config.api_url.clone());
    let api = Arc::new(HttpCatalogApi::new(client_config).context("Failed to build HTTP client")?);
    let catalog_config = CatalogConfig::from_env()?;
    let catalogs = CatalogSet::new(
        catalog_definitions()
            .into_iter()
            .map(|definition| Catalog::new(definition, Arc::clone(&api), catalog_config.clone())),
    );

    match config.command {
        Command::Catalogs => list_catalogs(&catalogs)?,
        Command::Search { search, page } => {
            let catalog = search_catalog(&catalogs, &config.catalog, &search).await?;
            if page > 1 {
                info!("Fetching page {page} of {}", catalog.last_page());
                check_outcome(catalog.start_search(page).await)?;
            }
            print_results(catalog)?;
        }
        Command::Details { search, result } => {
            let catalog = search_catalog(&catalogs, &config.catalog, &search).await?;
            fetch_details(catalog, &search, &result).await?;
        }
    }

    Ok(())
}

fn list_catalogs(catalogs: &Catalogs) -> anyhow::Result<()> {
    let listing: Vec<_> = catalogs
        .iter()
        .map(|catalog| {
            let snapshot = catalog.snapshot();
            json!({
                "id": snapshot.id,
                "name": snapshot.name,
                "description": snapshot.description,
                "filters": snapshot.filters,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

async fn search_catalog<'a>(
    catalogs: &'a Catalogs,
    catalog_id: &str,
    args: &SearchArgs,
) -> anyhow::Result<&'a Catalog<HttpCatalogApi>> {
    let catalog = catalogs
        .get(catalog_id)
        .with_context(|| format!("Unknown catalog: {catalog_id}"))?;
    tokio::spawn(log_events(catalog.subscribe()));

    let mut form = SearchForm::default();
    form.set_query(&args.query);
    anyhow::ensure!(!form.query().is_empty(), "Search query is empty");

    apply_filters(catalog, args)?;

    info!("Searching {} for {:?}", catalog_id, form.query());
    let handle = catalogs
        .activate(catalog_id, form.query(), &args.geometry)
        .with_context(|| format!("Unknown catalog: {catalog_id}"))?;
    check_outcome(handle.await)?;
    Ok(catalog)
}

fn check_outcome(outcome: SearchOutcome) -> anyhow::Result<()> {
    match outcome {
        SearchOutcome::Completed { page, result_count } => {
            info!("{result_count} result(s), showing page {page}");
            Ok(())
        }
        SearchOutcome::Skipped => Ok(()),
        SearchOutcome::Cancelled => anyhow::bail!("Search was cancelled"),
        SearchOutcome::Failed(failure) => anyhow::bail!("{failure}"),
    }
}

fn print_results(catalog: &Catalog<HttpCatalogApi>) -> anyhow::Result<()> {
    let snapshot = catalog.snapshot();
    let results: Vec<_> = snapshot
        .results
        .iter()
        .map(|result| {
            json!({
                "id": result.id(),
                "title": result.title(),
                "summary": result.summary(),
                "details_url": result.details_url(),
                "variables": result.variables().map(|v| v.len()),
            })
        })
        .collect();
    let output = json!({
        "catalog": snapshot.id,
        "query": snapshot.query,
        "page": snapshot.page,
        "last_page": catalog.last_page(),
        "result_count": snapshot.result_count,
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn fetch_details(
    catalog: &Catalog<HttpCatalogApi>,
    args: &SearchArgs,
    result_id: &str,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        catalog.snapshot().results.get(result_id).is_some(),
        "Result {result_id} is not on the current page"
    );
    let mut controller = DetailController::default();
    controller.set_active_result(catalog.id(), result_id);
    catalog.set_result_active(result_id, true);
    catalog.show_detail(result_id);

    let from_date = args.from_date.as_deref().and_then(parse_date);
    let to_date = args.to_date.as_deref().and_then(parse_date);
    let options = DetailFetchOptions::default()
        .with_range(from_date, to_date)
        .with_reporter(TracingReporter);
    let handle = catalog
        .fetch_detail_series(result_id, options)
        .with_context(|| format!("Result {result_id} has no time series"))?;

    if let DetailOutcome::Failed(failure) = handle.await {
        warn!("Detail fetch incomplete: {failure}");
    }

    let snapshot = catalog.snapshot();
    let detail = snapshot.detail().context("Detail result disappeared")?;
    let output = json!({
        "active": controller.active_result(),
        "result": detail,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn log_events(mut events: Receiver<CatalogEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => debug!(catalog = %event.catalog_id, changed = ?event.changed, "catalog changed"),
            Err(RecvError::Lagged(skipped)) => warn!("Skipped {skipped} catalog event(s)"),
            Err(RecvError::Closed) => break,
        }
    }
}
