//! Constants shared by the catalog core and its callers.

/// Default number of results the search endpoint returns per page.
pub const PAGE_SIZE: u64 = 100;

/// Descriptions longer than this are cut at a word boundary for summaries.
pub const DESCRIPTION_MAX_LENGTH: usize = 100;

/// Appended to a truncated summary.
pub const SUMMARY_ELLIPSIS: &str = "\u{2026}";

/// HTTP status the search endpoint uses when an upstream catalog took too long.
pub const REQUEST_TIMED_OUT_CODE: u16 = 408;

/// Textual date format exchanged with every endpoint (`MM/DD/YYYY`).
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Catalog id of the time-series catalog that serves details and values.
pub const CUAHSI_CATALOG: &str = "cuahsi";

/// Key of the optional time interval inside a detail series entry.
pub const WATERML_VARIABLE_TIME_INTERVAL: &str =
    "{http://www.cuahsi.org/water_ml/1.1/}variable_time_interval";

pub const DATE_FILTER_ID: &str = "date";
pub const GRIDDED_FILTER_ID: &str = "gridded";
