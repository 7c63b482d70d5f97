//! State holders the UI layer drives the catalogs through.

use serde::Serialize;

/// The query text shared by every catalog search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchForm {
    query: String,
}

impl SearchForm {
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns true if the query changed. Surrounding whitespace is ignored.
    pub fn set_query(&mut self, query: &str) -> bool {
        let query = query.trim();
        if self.query == query {
            return false;
        }
        self.query = query.to_string();
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveResult {
    pub catalog_id: String,
    pub result_id: String,
}

/// Tracks the result highlighted across all catalogs, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailController {
    active_result: Option<ActiveResult>,
}

impl DetailController {
    pub fn active_result(&self) -> Option<&ActiveResult> {
        self.active_result.as_ref()
    }

    pub fn set_active_result(&mut self, catalog_id: &str, result_id: &str) -> bool {
        let next = ActiveResult { catalog_id: catalog_id.to_string(), result_id: result_id.to_string() };
        if self.active_result.as_ref() == Some(&next) {
            return false;
        }
        self.active_result = Some(next);
        true
    }

    pub fn clear(&mut self) -> bool {
        self.active_result.take().is_some()
    }
}
