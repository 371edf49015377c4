//! Publication-date normalisation.
//!
//! Feeds write `pubDate` in whatever shape their CMS likes.  [`normalize`]
//! parses it permissively, pins offset-less values to GMT, moves the instant
//! to Asia/Tehran, and renders it as a Jalali date with Persian names and
//! digits:
//!
//! ```text
//! "Mon, 01 Jan 2024 12:00:00 GMT"  →  "دوشنبه، ۱۱ دی ۱۴۰۲ ⏰ ۱۵:۳۰"
//! ```
//!
//! Failure is never fatal: the caller gets no timestamp and the raw text as
//! the display string.

pub mod jalali;
pub mod persian;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Asia::Tehran;
use chrono_tz::Tz;
use thiserror::Error;

use jalali::JalaliDate;
use persian::to_persian_digits;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("unrecognised date format: {0:?}")]
    Unparsable(String),
    #[error("year {0} is outside the supported Jalali range")]
    OutOfRange(i32),
}

/// Result of normalising one `pubDate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    /// `None` when any step failed.
    pub timestamp: Option<DateTime<Tz>>,
    pub display: String,
}

/// Formats that carry an explicit numeric offset.  Matched after any
/// leading weekday has been removed.  `%z` takes `+0330` and `+03:30`.
const OFFSET_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %B %Y %H:%M:%S %z",
    "%d-%b-%y %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%z",
    "%Y/%m/%d %H:%M:%S %z",
    "%b %d %H:%M:%S %z %Y",
];

/// Formats without an offset; the value is read as GMT.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%d-%b-%y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
];

/// Weekday prefixes; a leading word starting with one of these is dropped
/// so a weekday that disagrees with the date never rejects it.
const WEEKDAY_PREFIXES: &[&str] = &["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Normalise a raw `pubDate`.  Never fails; see [`try_normalize`].
pub fn normalize(raw: &str) -> NormalizedDate {
    match try_normalize(raw) {
        Ok((timestamp, display)) => NormalizedDate {
            timestamp: Some(timestamp),
            display,
        },
        Err(e) => {
            tracing::debug!(raw = %raw, error = %e, "Keeping raw publication date");
            NormalizedDate {
                timestamp: None,
                display: raw.to_string(),
            }
        }
    }
}

/// Parse, convert to Tehran time, and render the Jalali display string.
///
/// # Errors
///
/// [`DateError::Unparsable`] if no known format matches, or
/// [`DateError::OutOfRange`] if the date falls outside the Jalali table.
pub fn try_normalize(raw: &str) -> Result<(DateTime<Tz>, String), DateError> {
    let tehran = to_tehran(parse_loose(raw)?);
    let display = render(&tehran)?;
    Ok((tehran, display))
}

/// The same instant on the Tehran wall clock.
pub fn to_tehran<Z: TimeZone>(dt: DateTime<Z>) -> DateTime<Tz> {
    dt.with_timezone(&Tehran)
}

/// Parse an RSS-ish date string.  Values without an offset are taken as GMT.
///
/// # Errors
///
/// [`DateError::Unparsable`] when nothing matches.
pub fn parse_loose(raw: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let text = raw.trim();
    let unparsable = || DateError::Unparsable(raw.to_string());
    if text.is_empty() {
        return Err(unparsable());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }

    let body = strip_weekday(text);
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(body, fmt).ok())
    {
        return Ok(dt);
    }

    // Zone names (GMT, UTC, IRST, ...) are not resolved; the value is GMT.
    let naive_text = strip_zone_name(body);
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive_text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(naive_text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(unparsable)?;

    Ok(Utc.from_utc_datetime(&naive).fixed_offset())
}

/// Drop a leading weekday word and the comma or spaces after it.
fn strip_weekday(text: &str) -> &str {
    let end = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let word = text[..end].to_ascii_lowercase();
    if word.len() >= 3 && WEEKDAY_PREFIXES.iter().any(|p| word.starts_with(p)) {
        text[end..].trim_start_matches(|c: char| c == ',' || c.is_whitespace())
    } else {
        text
    }
}

/// Drop a trailing alphabetic zone token, or a `Z` glued to the time.
fn strip_zone_name(text: &str) -> &str {
    if let Some((head, last)) = text.rsplit_once(char::is_whitespace) {
        let is_meridiem = last.eq_ignore_ascii_case("am") || last.eq_ignore_ascii_case("pm");
        if !last.is_empty() && !is_meridiem && last.chars().all(|c| c.is_ascii_alphabetic()) {
            return head.trim_end();
        }
    }
    text.strip_suffix('Z').unwrap_or(text)
}

/// `{weekday}، {day} {month} {year} ⏰ {HH:MM}` in Persian.
fn render(local: &DateTime<Tz>) -> Result<String, DateError> {
    let jd = JalaliDate::from_gregorian(local.date_naive())?;
    let day = to_persian_digits(&format!("{:02}", jd.day));
    let year = to_persian_digits(&format!("{:04}", jd.year));
    let time = to_persian_digits(&format!("{:02}:{:02}", local.hour(), local.minute()));

    Ok(format!(
        "{}، {} {} {} ⏰ {}",
        jd.weekday.persian_name(),
        day,
        jd.month.persian_name(),
        year,
        time
    ))
}
