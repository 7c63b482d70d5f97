//! Search refinements and the ordered set a catalog owns.

use common::search_const::{DATE_FILTER_ID, GRIDDED_FILTER_ID};
use serde::Serialize;

use crate::dates::parse_date;

/// What a filter refines, with the state specific to that refinement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    /// Never contributes to a query.
    Plain,
    /// A toggle sent through the request's `options` list.
    SearchOption { active: bool },
    /// Dates in the `MM/DD/YYYY` exchange format.
    DateRange {
        from_date: Option<String>,
        to_date: Option<String>,
    },
}

impl FilterKind {
    pub fn is_active(&self) -> bool {
        match self {
            FilterKind::Plain => false,
            FilterKind::SearchOption { active } => *active,
            FilterKind::DateRange { from_date, to_date } => from_date.is_some() || to_date.is_some(),
        }
    }

    pub fn is_valid(&self) -> bool {
        let FilterKind::DateRange { from_date, to_date } = self else {
            return true;
        };
        let from = from_date.as_deref().map(parse_date);
        let to = to_date.as_deref().map(parse_date);
        match (from, to) {
            (Some(Some(from)), Some(Some(to))) => from < to,
            (Some(None), _) | (_, Some(None)) => false,
            _ => true,
        }
    }

    fn defaults(&self) -> FilterKind {
        match self {
            FilterKind::Plain => FilterKind::Plain,
            FilterKind::SearchOption { .. } => FilterKind::SearchOption { active: false },
            FilterKind::DateRange { .. } => FilterKind::DateRange { from_date: None, to_date: None },
        }
    }

    /// Form control used to edit the filter.
    pub fn input_type(&self) -> &'static str {
        match self {
            FilterKind::Plain => "",
            FilterKind::SearchOption { .. } => "checkbox",
            FilterKind::DateRange { .. } => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    id: String,
    label: String,
    kind: FilterKind,
    is_valid: bool,
}

impl Filter {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FilterKind) -> Self {
        let mut filter = Self { id: id.into(), label: label.into(), kind, is_valid: true };
        filter.validate();
        filter
    }

    pub fn search_option(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FilterKind::SearchOption { active: false })
    }

    pub fn gridded_services() -> Self {
        Self::search_option(GRIDDED_FILTER_ID, "Gridded Services")
    }

    pub fn date_range() -> Self {
        Self::new(DATE_FILTER_ID, "", FilterKind::DateRange { from_date: None, to_date: None })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn is_active(&self) -> bool {
        self.kind.is_active()
    }

    /// Recomputes and stores the validity flag.
    pub fn validate(&mut self) -> bool {
        self.is_valid = self.kind.is_valid();
        self.is_valid
    }

    /// Restores the kind's defaults. Returns whether anything changed.
    pub fn reset(&mut self) -> bool {
        let before = (self.kind.clone(), self.is_valid);
        self.kind = self.kind.defaults();
        self.validate();
        before != (self.kind.clone(), self.is_valid)
    }

    /// Toggles a search option. Other kinds are left untouched.
    pub fn set_active(&mut self, value: bool) -> bool {
        match &mut self.kind {
            FilterKind::SearchOption { active } if *active != value => {
                *active = value;
                self.validate();
                true
            }
            _ => false,
        }
    }

    /// Sets both ends of a date range; empty strings clear that end.
    pub fn set_dates(&mut self, from: Option<String>, to: Option<String>) -> bool {
        let from = from.filter(|s| !s.trim().is_empty());
        let to = to.filter(|s| !s.trim().is_empty());
        let FilterKind::DateRange { from_date, to_date } = &mut self.kind else {
            return false;
        };
        if *from_date == from && *to_date == to {
            return false;
        }
        *from_date = from;
        *to_date = to;
        self.validate();
        true
    }
}

/// Ordered filters, unique by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut set = Self::default();
        for filter in filters {
            set.insert(filter);
        }
        set
    }

    /// Adds a filter, replacing one with the same id in place.
    pub fn insert(&mut self, filter: Filter) -> bool {
        match self.filters.iter_mut().find(|f| f.id == filter.id) {
            Some(existing) if *existing == filter => false,
            Some(existing) => {
                *existing = filter;
                true
            }
            None => {
                self.filters.push(filter);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn count_active(&self) -> usize {
        self.filters.iter().filter(|f| f.is_active()).count()
    }

    pub fn all_valid(&self) -> bool {
        self.filters.iter().all(|f| f.is_valid)
    }

    /// Revalidates every member, returning whether all of them passed.
    pub fn validate_all(&mut self) -> bool {
        self.filters.iter_mut().fold(true, |valid, f| f.validate() && valid)
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        self.filters
            .iter_mut()
            .find(|f| f.id == id)
            .is_some_and(|f| f.set_active(active))
    }

    /// Updates the first date-range filter in the set.
    pub fn set_dates(&mut self, from: Option<String>, to: Option<String>) -> bool {
        self.filters
            .iter_mut()
            .find(|f| matches!(f.kind, FilterKind::DateRange { .. }))
            .is_some_and(|f| f.set_dates(from, to))
    }

    pub fn reset(&mut self, id: &str) -> bool {
        self.filters.iter_mut().find(|f| f.id == id).is_some_and(|f| f.reset())
    }

    pub fn reset_all(&mut self) -> bool {
        self.filters.iter_mut().fold(false, |changed, f| f.reset() || changed)
    }

    /// `(from_date, to_date)` of the first date-range filter, if the set has one.
    pub fn date_range(&self) -> Option<(Option<&str>, Option<&str>)> {
        self.filters.iter().find_map(|f| match &f.kind {
            FilterKind::DateRange { from_date, to_date } => Some((from_date.as_deref(), to_date.as_deref())),
            _ => None,
        })
    }

    /// Ids of the search options that are switched on, in set order.
    pub fn active_option_ids(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| matches!(f.kind, FilterKind::SearchOption { active: true }))
            .map(|f| f.id.as_str())
            .collect()
    }
}
