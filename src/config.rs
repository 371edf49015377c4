//! Configuration for a digest run, read from an optional TOML file.
//!
//! ```toml
//! request_timeout_secs = 10
//! max_concurrent_fetches = 6
//! max_feed_bytes = 10485760
//!
//! [[categories]]
//! name = "اقتصاد"
//!
//! [[categories.sources]]
//! name = "ایرنا"
//! url = "https://www.irna.ir/rss/tp/27"
//! ```
//!
//! Every key is optional.  Without a `categories` key the built-in feed list
//! is used.  Category and source order in the file is the order articles are
//! deduplicated in and the order categories are rendered in.
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::source::{FeedSource, HttpFetcher, MAX_FEED_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file too large: {0} bytes")]
    TooLarge(u64),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Upper bound on feeds being fetched at the same time.
    pub max_concurrent_fetches: usize,

    /// Largest feed body accepted, in bytes.
    pub max_feed_bytes: usize,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Categories in display order, each with its sources in priority order.
    pub categories: Vec<CategoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl CategoryConfig {
    /// This category's sources, in declared order.
    pub fn feed_sources(&self) -> impl Iterator<Item = FeedSource> + '_ {
        self.sources
            .iter()
            .map(|source| FeedSource::new(&self.name, &source.name, &source.url))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: HttpFetcher::DEFAULT_TIMEOUT.as_secs(),
            max_concurrent_fetches: 6,
            max_feed_bytes: MAX_FEED_SIZE,
            user_agent: concat!("gozideh/", env!("CARGO_PKG_VERSION")).to_string(),
            categories: builtin_categories(),
        }
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Values that cannot drive a run → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(meta.len()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Every configured source, flattened in category-then-source order.
    pub fn feed_sources(&self) -> Vec<FeedSource> {
        self.categories
            .iter()
            .flat_map(CategoryConfig::feed_sources)
            .collect()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid("max_concurrent_fetches must be at least 1".into()));
        }
        if self.max_feed_bytes == 0 {
            return Err(ConfigError::Invalid("max_feed_bytes must be at least 1".into()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("no categories configured".into()));
        }
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(ConfigError::Invalid("category with an empty name".into()));
            }
            for source in &category.sources {
                if source.name.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "source with an empty name in category {:?}",
                        category.name
                    )));
                }
                if source.url.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "source {:?} has an empty url",
                        source.name
                    )));
                }
            }
        }
        Ok(())
    }
}

type BuiltinCategory = (&'static str, &'static [(&'static str, &'static str)]);

const BUILTIN_FEEDS: &[BuiltinCategory] = &[
    (
        "اقتصاد",
        &[
            ("تسنیم", "https://www.tasnimnews.com/fa/rss/feed/0/7/7/%D8%A7%D9%82%D8%AA%D8%B5%D8%A7%D8%AF%DB%8C"),
            ("اقتصاد نیوز", "https://www.eghtesadnews.com/feeds/"),
            ("اقتصاد آنلاین", "https://www.eghtesadonline.com/fa/rss/8"),
            ("باشگاه خبرنگاران", "https://www.yjc.ir/fa/rss/6"),
            ("دنیای اقتصاد", "https://donya-e-eqtesad.com/feeds/"),
            ("ایرنا", "https://www.irna.ir/rss/tp/27"),
        ],
    ),
    (
        "بورس، بانک و بیمه",
        &[
            ("(بورس) ایرنا", "https://www.irna.ir/rss/tp/1001669"),
            ("(بورس) اقتصاد آنلاین", "https://www.eghtesadonline.com/fa/rss/9"),
            ("بورس پرس", "https://boursepress.ir/rss/feeds/featured"),
            ("(بانک و بیمه) ایرنا", "https://www.irna.ir/rss/tp/26"),
            ("(بانک و بیمه) اقتصاد آنلاین", "https://www.eghtesadonline.com/fa/rss/25"),
        ],
    ),
    (
        "صنعت، معدن و تجارت",
        &[
            ("ایرنا", "https://www.irna.ir/rss/tp/23"),
            ("اقتصاد آنلاین", "https://www.eghtesadonline.com/fa/rss/26"),
        ],
    ),
    (
        "جهانی و سیاسی",
        &[
            ("ایرنا", "https://www.irna.ir/rss/tp/1"),
            ("تسنیم", "https://www.tasnimnews.com/fa/rss/feed/0/7/8/%D8%A8%DB%8C%D9%86-%D8%A7%D9%84%D9%85%D9%84%D9%84"),
            ("باشگاه خبرنگاران", "https://www.yjc.ir/fa/rss/9"),
            ("(سیاسی) تسنیم", "https://www.tasnimnews.com/fa/rss/feed/0/7/1/%D8%B3%DB%8C%D8%A7%D8%B3%DB%8C"),
            ("اقتصاد آنلاین", "https://www.eghtesadonline.com/fa/rss/11"),
            ("(سیاسی) باشگاه خبرنگاران", "https://www.yjc.ir/fa/rss/3"),
            ("همشهری", "https://www.hamshahrionline.ir/rss/tp/6"),
            ("همشهری (بین‌المللی)", "https://www.hamshahrionline.ir/rss/tp/11"),
        ],
    ),
];

fn builtin_categories() -> Vec<CategoryConfig> {
    BUILTIN_FEEDS
        .iter()
        .map(|(name, sources)| CategoryConfig {
            name: (*name).to_string(),
            sources: sources
                .iter()
                .map(|(name, url)| SourceConfig {
                    name: (*name).to_string(),
                    url: (*url).to_string(),
                })
                .collect(),
        })
        .collect()
}
