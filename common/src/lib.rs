//! Wire models and constants shared between the catalog core and its callers.

extern crate serde;

pub mod search_query;
pub mod search_result;
pub mod search_const;
pub mod series;
