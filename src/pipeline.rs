//! One digest run: fetch every source, extract, normalise, deduplicate, sort.
//!
//! Fetching and parsing are independent per source and run concurrently.
//! Results are consumed in configuration order, though, so "first seen
//! wins" deduplication gives the same answer no matter which feed answered
//! first:
//!
//! ```text
//!  sources ──► fetch+extract (concurrent, ordered) ──► normalise ──► dedup ──► DigestBuilder
//!                                                      (sequential, category-then-source)
//! ```
//!
//! No failure below the run level escapes.  A source that cannot be fetched
//! or parsed contributes nothing, a malformed item is dropped, and an
//! unreadable date only loses its timestamp.

use futures::stream::{self, StreamExt};

use crate::config::CategoryConfig;
use crate::date;
use crate::dedup::Deduplicator;
use crate::digest::{Digest, DigestBuilder};
use crate::source::{extract, Article, FeedSource, Fetch, RawItem, SourceError};

/// Coordinates a single run.  Owns all per-run state; [`Pipeline::run`]
/// consumes it, so nothing carries over between runs.
pub struct Pipeline<F> {
    fetcher: F,
    max_concurrent: usize,
    dedup: Deduplicator,
}

/// Per-run counters, logged at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub sources_failed: usize,
    pub entries_dropped: usize,
    pub duplicates: usize,
    pub undated: usize,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(fetcher: F, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            max_concurrent: max_concurrent.max(1),
            dedup: Deduplicator::new(),
        }
    }

    /// Run every configured source and return the finished digest.
    pub async fn run(self, categories: &[CategoryConfig]) -> Digest {
        self.run_with_stats(categories).await.0
    }

    pub async fn run_with_stats(mut self, categories: &[CategoryConfig]) -> (Digest, RunStats) {
        let sources: Vec<FeedSource> = categories
            .iter()
            .flat_map(CategoryConfig::feed_sources)
            .collect();

        let fetcher = &self.fetcher;
        let fetched: Vec<(FeedSource, Result<Vec<RawItem>, SourceError>)> = stream::iter(sources)
            .map(move |source| async move {
                tracing::info!(source = %source.name, url = %source.url, "Reading feed");
                let result = fetch_and_extract(fetcher, &source.url).await;
                (source, result)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut builder = DigestBuilder::new(categories.iter().map(|c| c.name.as_str()));
        let mut stats = RunStats::default();

        for (source, result) in fetched {
            let items = match result {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(
                        source = %source.name,
                        url = %source.url,
                        kind = %e.kind(),
                        error = %e,
                        "Skipping source"
                    );
                    stats.sources_failed += 1;
                    continue;
                }
            };

            for item in items {
                if let Some(article) = self.admit(item, &source, &mut stats) {
                    builder.push(article);
                }
            }
        }

        let digest = builder.finalize();
        tracing::info!(
            articles = digest.article_count(),
            unique_links = self.dedup.len(),
            sources_failed = stats.sources_failed,
            entries_dropped = stats.entries_dropped,
            duplicates = stats.duplicates,
            undated = stats.undated,
            "Digest complete"
        );
        (digest, stats)
    }

    /// Turn one raw item into an article, or `None` if it is malformed or
    /// its link was already admitted.
    fn admit(&mut self, item: RawItem, source: &FeedSource, stats: &mut RunStats) -> Option<Article> {
        let entry = match item.into_entry() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(source = %source.name, error = %e, "Dropping malformed item");
                stats.entries_dropped += 1;
                return None;
            }
        };

        let normalized = date::normalize(&entry.pub_date);

        if !self.dedup.admit(&entry.link) {
            tracing::debug!(source = %source.name, link = %entry.link, "Duplicate link");
            stats.duplicates += 1;
            return None;
        }

        if normalized.timestamp.is_none() {
            stats.undated += 1;
        }
        Some(Article::new(entry, normalized, source))
    }
}

async fn fetch_and_extract<F: Fetch>(fetcher: &F, url: &str) -> Result<Vec<RawItem>, SourceError> {
    let bytes = fetcher.fetch(url).await?;
    extract(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves canned bodies; unknown URLs behave like a 404.
    struct StaticFetcher(HashMap<String, String>);

    impl Fetch for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
            self.0
                .get(url)
                .map(|body| body.clone().into_bytes())
                .ok_or(SourceError::HttpStatus(404))
        }
    }

    fn rss(items: &[(&str, &str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, date)| {
                format!(
                    "<item><title>{title}</title><link>{link}</link>\
                     <pubDate>{date}</pubDate><description>about {title}</description></item>"
                )
            })
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://example.com</link><description>d</description>{body}</channel></rss>"#)
    }

    fn category(name: &str, sources: &[(&str, &str)]) -> CategoryConfig {
        CategoryConfig {
            name: name.to_string(),
            sources: sources
                .iter()
                .map(|(name, url)| SourceConfig {
                    name: name.to_string(),
                    url: url.to_string(),
                })
                .collect(),
        }
    }

    fn links(digest: &Digest, category: &str) -> Vec<String> {
        digest
            .category(category)
            .unwrap()
            .articles
            .iter()
            .map(|a| a.link.clone())
            .collect()
    }

    fn fixture() -> (StaticFetcher, Vec<CategoryConfig>) {
        let mut bodies = HashMap::new();
        bodies.insert(
            "mem://econ-a".to_string(),
            rss(&[
                ("Shared", "https://news.example/shared", "Mon, 01 Jan 2024 10:00:00 GMT"),
                ("Econ A", "https://news.example/econ-a", "Mon, 01 Jan 2024 12:00:00 GMT"),
            ]),
        );
        bodies.insert(
            "mem://econ-b".to_string(),
            rss(&[
                ("Econ B", "https://news.example/econ-b", "not-a-date"),
                ("Econ A again", "https://news.example/econ-a", "Tue, 02 Jan 2024 12:00:00 GMT"),
            ]),
        );
        bodies.insert(
            "mem://world".to_string(),
            rss(&[
                ("Shared elsewhere", "https://news.example/shared", "Wed, 03 Jan 2024 12:00:00 GMT"),
                ("World", "https://news.example/world", "Tue, 02 Jan 2024 08:00:00 GMT"),
            ]),
        );
        bodies.insert("mem://broken".to_string(), "<html>gateway error</html>".to_string());

        let categories = vec![
            category(
                "economy",
                &[("A", "mem://econ-a"), ("Down", "mem://missing"), ("B", "mem://econ-b")],
            ),
            category("world", &[("Broken", "mem://broken"), ("W", "mem://world")]),
        ];
        (StaticFetcher(bodies), categories)
    }

    #[tokio::test]
    async fn first_seen_link_wins_across_categories() {
        let (fetcher, categories) = fixture();
        let digest = Pipeline::new(fetcher, 4).run(&categories).await;

        assert_eq!(
            links(&digest, "economy"),
            vec![
                "https://news.example/econ-a",
                "https://news.example/shared",
                "https://news.example/econ-b",
            ]
        );
        assert_eq!(links(&digest, "world"), vec!["https://news.example/world"]);

        let shared = &digest.category("economy").unwrap().articles[1];
        assert_eq!(shared.source, "A");
        assert_eq!(shared.title, "Shared");
    }

    #[tokio::test]
    async fn failures_are_local_and_counted() {
        let (fetcher, categories) = fixture();
        let (digest, stats) = Pipeline::new(fetcher, 4).run_with_stats(&categories).await;

        assert_eq!(stats.sources_failed, 2);
        assert_eq!(stats.duplicates, 2);
        assert_eq!(digest.article_count(), 4);

        let undated = &digest.category("economy").unwrap().articles[2];
        assert_eq!(undated.timestamp, None);
        assert_eq!(undated.display_date, "not-a-date");
    }

    #[tokio::test]
    async fn links_are_unique_and_categories_sorted() {
        let (fetcher, categories) = fixture();
        let digest = Pipeline::new(fetcher, 1).run(&categories).await;

        let mut all: Vec<_> = digest
            .categories()
            .iter()
            .flat_map(|c| c.articles.iter().map(|a| a.link.as_str()))
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);

        for category in digest.categories() {
            let stamps: Vec<_> = category.articles.iter().map(|a| a.timestamp).collect();
            let dated = stamps.iter().take_while(|t| t.is_some()).count();
            assert!(stamps[dated..].iter().all(Option::is_none));
            assert!(stamps[..dated].windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[tokio::test]
    async fn rerun_on_same_content_is_identical() {
        let (fetcher, categories) = fixture();
        let first = Pipeline::new(fetcher, 3).run(&categories).await;

        let (fetcher, _) = fixture();
        let second = Pipeline::new(fetcher, 1).run(&categories).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn malformed_entries_do_not_affect_siblings() {
        let mut bodies = HashMap::new();
        bodies.insert(
            "mem://feed".to_string(),
            rss(&[
                ("", "https://news.example/no-title", "Mon, 01 Jan 2024 10:00:00 GMT"),
                ("Fine", "https://news.example/fine", "Mon, 01 Jan 2024 10:00:00 GMT"),
            ]),
        );
        let categories = vec![category("c", &[("S", "mem://feed")])];

        let (digest, stats) = Pipeline::new(StaticFetcher(bodies), 2)
            .run_with_stats(&categories)
            .await;

        assert_eq!(stats.entries_dropped, 1);
        assert_eq!(links(&digest, "c"), vec!["https://news.example/fine"]);
    }

    #[tokio::test]
    async fn categories_without_articles_are_kept() {
        let categories = vec![
            category("empty", &[("Gone", "mem://nothing")]),
            category("also-empty", &[]),
        ];
        let digest = Pipeline::new(StaticFetcher(HashMap::new()), 2)
            .run(&categories)
            .await;

        let names: Vec<_> = digest.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["empty", "also-empty"]);
        assert_eq!(digest.article_count(), 0);
    }

    #[tokio::test]
    async fn end_to_end_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(rss(&[(
                        "Over HTTP",
                        "https://news.example/http",
                        "2024-01-01 12:00:00",
                    )]))
                    .insert_header("Content-Type", "application/rss+xml"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = crate::source::HttpFetcher::new(
            std::time::Duration::from_secs(5),
            "gozideh-test",
        )
        .unwrap();
        let categories = vec![category(
            "news",
            &[
                ("Down", &format!("{}/down", server.uri())),
                ("Up", &format!("{}/ok", server.uri())),
            ],
        )];

        let digest = Pipeline::new(fetcher, 2).run(&categories).await;
        let articles = &digest.category("news").unwrap().articles;

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, "Up");
        assert_eq!(articles[0].display_date, "دوشنبه، ۱۱ دی ۱۴۰۲ ⏰ ۱۵:۳۰");
    }
}
