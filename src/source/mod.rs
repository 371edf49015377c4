//! Feed source layer: fetching raw bytes and extracting entries.
//!
//! This module defines the [`Fetch`] trait, the [`FeedSource`] triple that
//! configuration hands to the pipeline, and the error type every per-source
//! failure is reported through.  Concrete pieces live in sub-modules:
//!
//! * [`fetch`] — the HTTP implementation of [`Fetch`].
//! * [`rss`] — RSS parsing into [`RawItem`]s and the image fallback chain.
//! * [`article`] — the normalised [`Article`] the rest of the crate works with.
//!
//! ## For contributors — swapping the transport
//!
//! The pipeline only ever talks to [`Fetch`].  Tests plug in an in-memory
//! implementation; `main.rs` plugs in [`HttpFetcher`].  Anything that can turn
//! a URL into bytes (a disk cache, a proxy client) slots in the same way.

pub(crate) mod article;
mod fetch;
mod rss;

pub use article::Article;
pub use fetch::{HttpFetcher, MAX_FEED_SIZE};
pub use rss::{extract, Entry, RawItem};

use std::future::Future;

use thiserror::Error;

/// One configured feed: which category it feeds, its display name, and URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub category: String,
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Coarse classification of a [`SourceError`], used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network error, timeout, oversized body or non-success HTTP status.
    SourceUnavailable,
    /// The payload arrived but is not a readable feed document.
    MalformedFeed,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnavailable => f.write_str("source unavailable"),
            Self::MalformedFeed => f.write_str("malformed feed"),
        }
    }
}

/// Everything that can make a whole source contribute zero articles.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connection, DNS, TLS or body-read failure.
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// Server answered with a non-2xx status.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The request did not finish within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// The body grew past the size limit.
    #[error("response larger than {0} bytes")]
    TooLarge(usize),
    /// The body could not be parsed as an RSS document.
    #[error("malformed feed: {0}")]
    MalformedFeed(#[from] ::rss::Error),
}

impl SourceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) | Self::HttpStatus(_) | Self::Timeout | Self::TooLarge(_) => {
                FailureKind::SourceUnavailable
            }
            Self::MalformedFeed(_) => FailureKind::MalformedFeed,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Network(e)
        }
    }
}

/// Anything that can retrieve the raw bytes of a feed.
///
/// The pipeline drives many fetches concurrently, so implementations must be
/// shareable across tasks.  A returned error means "this source yields no
/// items for this run"; callers never retry.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, SourceError>> + Send;
}
