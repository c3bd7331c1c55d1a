//! Date keys.
//!
//! Canonical tables key every record by a zero-padded ISO date (`YYYY-MM-DD`).
//! Query arguments and report output use `MM/DD/YYYY`. The two forms are only
//! ever compared after conversion through this module.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

pub const KEY_FORMAT: &str = "%Y-%m-%d";
pub const EXTERNAL_FORMAT: &str = "%m/%d/%Y";

// Two-digit year forms come before their four-digit twins: `%Y` would happily
// read "24" as the year 24. Anything that still lands before year 100 is
// rejected in `plausible`.
const DATE_FORMATS: &[&str] = &[
    "%m-%d-%y",
    "%y-%m-%d",
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%Y%m%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
    "%A, %B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M %p",
];

/// Parse any of the date spellings seen in health exports.
#[must_use]
pub fn try_normalize(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().filter(plausible))
    {
        return Some(d);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .filter(plausible)
}

fn plausible(date: &NaiveDate) -> bool {
    date.year() >= 100
}

/// Canonicalize a raw date to its ISO key.
///
/// Unparsable input comes back unchanged so one odd row never fails a whole
/// reconciliation pass; callers that care use [`try_normalize`] and count.
#[must_use]
pub fn normalize(raw: &str) -> String {
    match try_normalize(raw) {
        Some(d) => to_key(d),
        None => {
            tracing::debug!(raw, "date did not parse, keeping raw value as key");
            raw.to_string()
        }
    }
}

/// Convert an ISO key back to `MM/DD/YYYY`. Non-ISO keys pass through.
#[must_use]
pub fn denormalize(key: &str) -> String {
    match NaiveDate::parse_from_str(key, KEY_FORMAT) {
        Ok(d) => to_external(d),
        Err(_) => key.to_string(),
    }
}

#[must_use]
pub fn to_key(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

#[must_use]
pub fn to_external(date: NaiveDate) -> String {
    date.format(EXTERNAL_FORMAT).to_string()
}

#[must_use]
pub fn parse_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, KEY_FORMAT).ok()
}

/// Parse a caller-supplied date: `MM/DD/YYYY`, `today` or `yesterday`.
pub fn parse_external(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let s = input.trim();
    match s.to_lowercase().as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - chrono::Duration::days(1)),
        _ => {}
    }

    let well_formed = s.len() == 10
        && s.char_indices().all(|(i, c)| match i {
            2 | 5 => c == '/',
            _ => c.is_ascii_digit(),
        });
    if !well_formed {
        return Err(Error::Validation(format!(
            "Date must be in MM/DD/YYYY format (got '{s}')"
        )));
    }

    NaiveDate::parse_from_str(s, EXTERNAL_FORMAT)
        .map_err(|_| Error::Validation(format!("'{s}' is not a valid calendar date")))
}

/// `YYYY-Www` label for the ISO week containing `date`.
#[must_use]
pub fn iso_week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// `YYYY-MM` label for the month containing `date`.
#[must_use]
pub fn month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}
