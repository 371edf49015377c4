//! The normalised article every source is reduced to.
//!
//! An `Article` is built once from an extracted [`Entry`](super::Entry) plus
//! its normalised date, admitted at most once by the deduplicator, and never
//! mutated afterwards.  Rendering code reads these fields directly.

use std::cmp::Ordering;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use super::{Entry, FeedSource};
use crate::date::NormalizedDate;

/// A single news article, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Headline, trimmed.
    pub title: String,

    /// Article URL, trimmed.  Unique across a whole run.
    pub link: String,

    /// Description with all markup stripped.
    pub description: String,

    /// Localised date text.  Falls back to the raw `pubDate` text when the
    /// date could not be normalised.  Presentation only; never parsed back.
    pub display_date: String,

    /// Publication instant in Asia/Tehran, used for ordering.
    ///
    /// `None` means normalisation failed; such articles sort after every
    /// dated article in their category.
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: Option<DateTime<Tz>>,

    pub image_url: Option<String>,

    /// Display name of the feed this came from.
    pub source: String,

    pub category: String,
}

impl Article {
    pub fn new(entry: Entry, date: NormalizedDate, source: &FeedSource) -> Self {
        Self {
            title: entry.title,
            link: entry.link,
            description: entry.description,
            display_date: date.display,
            timestamp: date.timestamp,
            image_url: entry.image_url,
            source: source.name.clone(),
            category: source.category.clone(),
        }
    }

    /// Reverse-chronological comparison: newer articles sort first and
    /// undated articles sort last.
    ///
    /// Not an [`Ord`] impl: distinct articles with equal timestamps compare
    /// `Equal` here.
    pub fn newest_first(&self, other: &Self) -> Ordering {
        // `None < Some(_)`, so comparing `other` to `self` puts undated last.
        other.timestamp.cmp(&self.timestamp)
    }
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &Option<DateTime<Tz>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match timestamp {
        Some(ts) => serializer.serialize_some(&ts.fixed_offset().to_rfc3339()),
        None => serializer.serialize_none(),
    }
}
