//! Issue-date parsing and display.

use crate::error::{IssuanceError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Display format of every date on a certificate.
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";

/// Accepted spreadsheet date layouts with a four-digit year, day-first.
const DAY_FIRST_FORMATS: [&str; 8] = [
    "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d %m %Y", "%d-%b-%Y", "%d %B %Y", "%d %b %Y", "%Y-%m-%d",
];

/// Two-digit year layouts. `25` reads as 2025, `75` as 1975.
const SHORT_YEAR_FORMATS: [&str; 3] = ["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];

/// Timestamp layouts spreadsheet exports use for date cells.
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// chrono's `%Y` also accepts `25`; anything below this came from a short year.
const MIN_FULL_YEAR: i32 = 1000;

/// Parses a spreadsheet `issue_date` cell.
///
/// Blank cells give `Ok(None)`. `field` names the cell in the error.
pub fn parse_day_first(raw: &str, field: &str) -> Result<Option<NaiveDate>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let date = DAY_FIRST_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .filter(|d| d.year() >= MIN_FULL_YEAR)
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
                .filter(|d| d.year() >= MIN_FULL_YEAR)
        });
    match date {
        Some(date) => Ok(Some(date)),
        None => Err(IssuanceError::Parse {
            field: field.to_string(),
            value: value.to_string(),
            expected: "a day-first date such as 01-03-2025",
        }),
    }
}

/// Parses the ISO `YYYY-MM-DD` date of a single-certificate request.
pub fn parse_iso(raw: &str, field: &str) -> Result<Option<NaiveDate>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| IssuanceError::Parse {
            field: field.to_string(),
            value: value.to_string(),
            expected: "YYYY-MM-DD",
        })
}

/// `DD-MM-YYYY`, or an empty string when there is no date.
pub fn display(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}
