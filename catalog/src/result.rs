//! Catalog hits and the page of them a catalog holds.

use common::{
    search_const::{DESCRIPTION_MAX_LENGTH, SUMMARY_ELLIPSIS},
    search_result::{CatalogSearchResponse, Link, ResultRecord},
};
use serde::Serialize;

use crate::variable::{Variable, VariableSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Table,
    Chart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    id: String,
    title: String,
    description: String,
    geometry: Option<serde_json::Value>,
    links: Vec<Link>,
    created_at: String,
    updated_at: String,
    pub(crate) active: bool,
    pub(crate) show_detail: bool,
    pub(crate) variables: Option<VariableSet>,
    pub(crate) fetching: bool,
    pub(crate) error: bool,
    pub(crate) display_mode: DisplayMode,
}

impl From<ResultRecord> for SearchResult {
    fn from(record: ResultRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description.unwrap_or_default(),
            geometry: record.geometry,
            links: record.links,
            created_at: record.created_at,
            updated_at: record.updated_at,
            active: false,
            show_detail: false,
            variables: record
                .variables
                .map(|variables| VariableSet::new(variables.into_iter().map(Variable::from))),
            fetching: false,
            error: false,
            display_mode: DisplayMode::default(),
        }
    }
}

impl SearchResult {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn geometry(&self) -> Option<&serde_json::Value> {
        self.geometry.as_ref()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn shows_detail(&self) -> bool {
        self.show_detail
    }

    pub fn variables(&self) -> Option<&VariableSet> {
        self.variables.as_ref()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn summary(&self) -> String {
        summarize(&self.description, DESCRIPTION_MAX_LENGTH)
    }

    /// Href of the result's `details` link.
    pub fn details_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.link_type == "details")
            .map(|link| link.href.as_str())
    }
}

/// Cuts `text` at the last space at or before `max_chars` characters and appends an
/// ellipsis. Text that fits is returned unchanged.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let boundary = if text[cut..].starts_with(' ') {
        cut
    } else {
        text[..cut].rfind(' ').filter(|&i| i > 0).unwrap_or(cut)
    };
    format!("{}{}", text[..boundary].trim_end(), SUMMARY_ELLIPSIS)
}

/// The current page of results of one catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    catalog_id: String,
    results: Vec<SearchResult>,
}

/// Paging numbers reported alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: Option<u64>,
    pub count: u64,
}

impl ResultSet {
    pub fn new(catalog_id: impl Into<String>) -> Self {
        Self { catalog_id: catalog_id.into(), results: Vec::new() }
    }

    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    /// Replaces the page with this catalog's slice of a multi-catalog response.
    /// Returns `None`, leaving the page untouched, when the response has no such slice.
    pub fn replace_from(&mut self, responses: &[CatalogSearchResponse]) -> Option<PageInfo> {
        let entry = CatalogSearchResponse::find(responses, &self.catalog_id)?;
        self.results = entry.results.iter().cloned().map(SearchResult::from).collect();
        Some(PageInfo { page: entry.page, count: entry.count })
    }

    pub fn get(&self, id: &str) -> Option<&SearchResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut SearchResult> {
        self.results.iter_mut().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The result currently shown as detail.
    pub fn detail(&self) -> Option<&SearchResult> {
        self.results.iter().find(|r| r.show_detail)
    }

    /// Shows `id` as the detail, hiding any other. Returns whether anything changed.
    pub fn show_detail(&mut self, id: &str) -> bool {
        if self.get(id).is_none() || self.detail().is_some_and(|r| r.id == id) {
            return false;
        }
        for result in self.results.iter_mut() {
            result.show_detail = result.id == id;
        }
        true
    }

    pub fn close_detail(&mut self) -> bool {
        match self.results.iter_mut().find(|r| r.show_detail) {
            Some(result) => {
                result.show_detail = false;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{result_record, search_response};

    fn result_set(ids: &[&str]) -> ResultSet {
        let mut set = ResultSet::new("hydroshare");
        let records = ids.iter().map(|id| result_record(id)).collect();
        set.replace_from(&search_response("hydroshare", ids.len() as u64, None, records));
        set
    }

    fn words(total_chars: usize) -> String {
        // "abcd " repeated: a space at every index congruent to 4 mod 5
        "abcd ".repeat(total_chars / 5 + 1)[..total_chars].to_string()
    }

    #[test]
    fn test_summary_keeps_short_descriptions() {
        let text = words(80);
        assert_eq!(summarize(&text, 100), text);
        let exact = words(100);
        assert_eq!(summarize(&exact, 100), exact);
    }

    #[test]
    fn test_summary_truncates_at_last_space() {
        let text = words(130);
        let summary = summarize(&text, 100);
        // index 99 is a space, so the cut lands there
        assert_eq!(summary, format!("{}{}", &text[..99], SUMMARY_ELLIPSIS));
        assert!(summary.chars().count() <= 101);
    }

    #[test]
    fn test_summary_without_spaces_cuts_hard() {
        let text = "x".repeat(130);
        assert_eq!(summarize(&text, 100), format!("{}{}", "x".repeat(100), SUMMARY_ELLIPSIS));
    }

    #[test]
    fn test_summary_handles_multibyte_text() {
        let text = "é".repeat(120);
        assert_eq!(summarize(&text, 100).chars().count(), 101);
    }

    #[test]
    fn test_replace_from_selects_own_catalog() {
        let mut set = ResultSet::new("cuahsi");
        let mut responses = search_response("hydroshare", 1, None, vec![result_record("other")]);
        assert_eq!(set.replace_from(&responses), None);

        responses.extend(search_response("cuahsi", 42, Some(2), vec![result_record("a"), result_record("b")]));
        assert_eq!(set.replace_from(&responses), Some(PageInfo { page: Some(2), count: 42 }));
        assert_eq!(set.len(), 2);
        assert!(set.get("other").is_none());
    }

    #[test]
    fn test_details_url() {
        let set = result_set(&["a"]);
        assert_eq!(set.get("a").unwrap().details_url(), Some("http://example.com/a"));
    }

    #[test]
    fn test_show_detail_keeps_at_most_one() {
        let mut set = result_set(&["a", "b", "c"]);
        assert!(set.show_detail("a"));
        assert!(!set.show_detail("a"), "already shown");
        assert!(set.show_detail("c"));
        assert_eq!(set.iter().filter(|r| r.shows_detail()).count(), 1);
        assert_eq!(set.detail().unwrap().id(), "c");

        assert!(!set.show_detail("missing"));
        assert_eq!(set.detail().unwrap().id(), "c");

        assert!(set.close_detail());
        assert!(set.detail().is_none());
        assert!(!set.close_detail());
    }

    #[test]
    fn test_show_detail_sequences_never_exceed_one() {
        let mut set = result_set(&["a", "b", "c"]);
        let steps = ["a", "b", "", "b", "c", "a", "", "", "c"];
        for step in steps {
            if step.is_empty() {
                set.close_detail();
            } else {
                set.show_detail(step);
            }
            assert!(set.iter().filter(|r| r.shows_detail()).count() <= 1);
        }
    }
}
