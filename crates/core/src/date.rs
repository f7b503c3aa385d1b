//! Due-date helpers
//!
//! Dates travel as `DD/MM/YYYY` text. Everything here is infallible from the
//! caller's point of view: bad text yields `false` or `None`.

use chrono::{Local, NaiveDate};
use std::fmt;

/// Text layout accepted by [`parse`]
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Returns true iff `text` is a zero-padded `DD/MM/YYYY` calendar date
pub fn validate(text: &str) -> bool {
    parse(text).is_some()
}

/// Parse `DD/MM/YYYY` into a date
///
/// The layout is strict: exactly ten characters, slashes at positions 2 and
/// 5, digits everywhere else. `1/2/2024` and `01-02-2024` are rejected.
pub fn parse(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    let day: u32 = text[0..2].parse().ok()?;
    let month: u32 = text[3..5].parse().ok()?;
    let year: i32 = text[6..10].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Render a date back into `DD/MM/YYYY`
pub fn format(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Today's date in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Signed number of days from today until `text`, negative when past
pub fn days_until(text: &str) -> Option<i64> {
    days_until_from(text, today())
}

/// Same as [`days_until`] with an explicit reference day
pub fn days_until_from(text: &str, today: NaiveDate) -> Option<i64> {
    let due = parse(text)?;
    Some(due.signed_duration_since(today).num_days())
}

/// Shorten `DD/MM/YYYY` to `DD/MM`; anything else comes back unchanged
pub fn short_date(text: &str) -> String {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() == 3 {
        format!("{}/{}", parts[0], parts[1])
    } else {
        text.to_string()
    }
}

/// Sentinel used when ordering tasks whose due date does not parse
pub(crate) fn far_future() -> NaiveDate {
    NaiveDate::MAX
}

/// How close a due date is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Past due by this many days
    Overdue(u64),
    Today,
    Tomorrow,
    /// Two or three days out
    Imminent(i64),
    /// Four to seven days out
    ThisWeek(i64),
    /// More than a week out
    Later(i64),
}

impl Urgency {
    pub fn from_days(days_remaining: i64) -> Self {
        match days_remaining {
            d if d < 0 => Self::Overdue(d.unsigned_abs()),
            0 => Self::Today,
            1 => Self::Tomorrow,
            d if d <= 3 => Self::Imminent(d),
            d if d <= 7 => Self::ThisWeek(d),
            d => Self::Later(d),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overdue(1) => write!(f, "[OVERDUE 1 day]"),
            Self::Overdue(n) => write!(f, "[OVERDUE {} days]", n),
            Self::Today => write!(f, "[TODAY]"),
            Self::Tomorrow => write!(f, "[TOMORROW]"),
            Self::Imminent(n) => write!(f, "[{} days]", n),
            Self::ThisWeek(n) => write!(f, "({} days)", n),
            Self::Later(n) => write!(f, "{} days", n),
        }
    }
}

/// Urgency text for a day offset; empty when the offset is unknown
pub fn urgency_label(days_remaining: Option<i64>) -> String {
    days_remaining
        .map(|d| Urgency::from_days(d).to_string())
        .unwrap_or_default()
}
