//! Parsing and formatting for the fixed `MM/DD/YYYY` exchange format.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime};
use common::search_const::DATE_FORMAT;

/// Strictly parses a date in the exchange format.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses the timestamps servers attach to series (ISO datetimes, RFC 3339, plain ISO
/// dates or the exchange format), keeping only the calendar date.
pub fn parse_timestamp(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_date(text))
}

/// Chooses the window fetched for a variable whose data spans `[begin, end]`.
///
/// A missing or too-early `from` defaults to one month before `end`, never before `begin`.
/// A missing or too-late `to` defaults to `end`. The result always satisfies
/// `begin <= from <= to <= end`.
pub fn fetch_window(
    begin: NaiveDate,
    end: NaiveDate,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (NaiveDate, NaiveDate) {
    let (begin, end) = if begin <= end { (begin, end) } else { (end, begin) };

    let lower = match from {
        Some(from) if from >= begin => from,
        _ => {
            let month_before_end = end.checked_sub_months(Months::new(1)).unwrap_or(begin);
            month_before_end.max(begin)
        }
    };
    let upper = match to {
        Some(to) if to <= end => to.max(begin),
        _ => end,
    };

    (lower.min(upper), upper)
}
