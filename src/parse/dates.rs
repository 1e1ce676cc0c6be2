//! ISO date rewriting for terminus output.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

/// Display format used everywhere a date is shown to the user.
pub const DISPLAY_FORMAT: &str = "%m-%d-%Y";

const ISO_FORMAT: &str = "%Y-%m-%d";

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("ISO date pattern compiles"))
}

/// Rewrite every `YYYY-MM-DD` date in `text` as `MM-DD-YYYY`.
///
/// Matches that are not real calendar dates (`2024-02-30`) are left as they
/// are. Everything outside a match is copied through untouched.
pub fn reformat_dates(text: &str) -> String {
    iso_date_pattern()
        .replace_all(text, |caps: &Captures| {
            let original = &caps[0];
            match NaiveDate::parse_from_str(original, ISO_FORMAT) {
                Ok(date) => date.format(DISPLAY_FORMAT).to_string(),
                Err(_) => original.to_string(),
            }
        })
        .into_owned()
}

/// Parse a period cell, trying the display format before ISO.
pub fn parse_period_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell, DISPLAY_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(cell, ISO_FORMAT))
        .ok()
}
