use chrono::{Local, NaiveDate};

/// Ledger entries aggregate by local calendar date, zero-padded.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Formats a calendar date as a `YYYY-MM-DD` day key.
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Today's calendar date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Today's day key in the local timezone.
pub fn today_key() -> String {
    day_key(today())
}
