//! Command line interface for searching the data catalogs.

use clap::{Parser, Subcommand};

use catalog::{Catalog, CatalogApi, CatalogDefinition, Filter};
use common::search_const::GRIDDED_FILTER_ID;

#[derive(Parser, Debug)]
#[command(name = "catalog-cli", version, about = "Search data catalogs and fetch time series")]
pub struct Config {
    /// Base URL of the catalog service
    #[arg(long, env = "CATALOG_API_URL", default_value = "http://127.0.0.1:8000")]
    pub api_url: String,

    /// Catalog to search
    #[arg(long, short, default_value = "cuahsi")]
    pub catalog: String,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search a catalog and print one page of results
    Search {
        #[command(flatten)]
        search: SearchArgs,

        /// Page to fetch after the first search
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    /// Search, then fetch the time series of one result
    Details {
        #[command(flatten)]
        search: SearchArgs,

        /// Result (site) id to fetch series for
        #[arg(long)]
        result: String,
    },
    /// List the known catalogs and their filters
    Catalogs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search terms
    #[arg(long, short)]
    pub query: String,

    /// Area of interest as WKT or GeoJSON
    #[arg(long, short)]
    pub geometry: String,

    /// Start of the date filter, MM/DD/YYYY
    #[arg(long)]
    pub from_date: Option<String>,

    /// End of the date filter, MM/DD/YYYY
    #[arg(long)]
    pub to_date: Option<String>,

    /// Include gridded services (CUAHSI only)
    #[arg(long)]
    pub gridded: bool,
}

/// The catalogs the search service knows about.
pub fn catalog_definitions() -> Vec<CatalogDefinition> {
    vec![
        CatalogDefinition::new("cinergi", "CINERGI")
            .with_description("Geoscience datasets from the CINERGI catalog")
            .with_filters([Filter::date_range()]),
        CatalogDefinition::new("hydroshare", "HydroShare")
            .with_description("Resources shared on HydroShare")
            .with_filters([Filter::date_range()]),
        CatalogDefinition::new("cuahsi", "WDC")
            .with_description("Time series from the CUAHSI water data center")
            .with_filters([Filter::gridded_services(), Filter::date_range()]),
    ]
}

/// Applies the gridded and date filters from the command line, failing if any filter of
/// the catalog is left invalid.
pub fn apply_filters<A: CatalogApi>(catalog: &Catalog<A>, args: &SearchArgs) -> anyhow::Result<()> {
    if args.gridded {
        catalog.set_filter_active(GRIDDED_FILTER_ID, true);
    }
    if args.from_date.is_some() || args.to_date.is_some() {
        catalog.set_date_range(args.from_date.clone(), args.to_date.clone());
    }
    anyhow::ensure!(
        catalog.snapshot().filters.all_valid(),
        "Invalid date range, expected MM/DD/YYYY with the start before the end"
    );
    Ok(())
}
