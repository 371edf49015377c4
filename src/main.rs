//! gozideh — a one-shot Persian news digest built from RSS feeds.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ categories ┌─────────────┐  Digest  ┌───────────┐
//! │ config.rs │ ─────────► │ pipeline.rs │ ───────► │ render.rs │ ──► index.html
//! └───────────┘            └─────────────┘          └───────────┘
//!                            │         ▲
//!                  fetch()   ▼         │ Article
//!                          ┌─────────────┐   ┌──────────┐   ┌──────────┐
//!                          │  source/    │──►│  date/   │──►│ dedup.rs │
//!                          └─────────────┘   └──────────┘   └──────────┘
//! ```
//!
//! * **`source/`** — the `Fetch` trait, the HTTP fetcher, RSS extraction and
//!   the `Article` model.
//! * **`date`** — lenient `pubDate` parsing and Jalali rendering in Tehran
//!   time.
//! * **`dedup`** — first-seen-wins link filter for one run.
//! * **`digest`** — per-category grouping and newest-first ordering.
//! * **`pipeline`** — drives one run end to end.
//! * **`render`** — HTML page or JSON output.
//! * **`main`** — wires everything together: parse args, load config, run,
//!   write the result.

mod config;
mod date;
mod dedup;
mod digest;
mod pipeline;
mod render;
mod source;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use config::Config;
use pipeline::Pipeline;
use source::HttpFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "gozideh", version, about = "Build a Persian news digest from RSS feeds")]
struct Args {
    /// Feed configuration; the built-in feed list is used if it does not exist
    #[arg(long, value_name = "FILE", default_value = "feeds.toml")]
    config: PathBuf,

    /// Where to write the digest
    #[arg(long, value_name = "FILE", default_value = "index.html")]
    output: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Html)]
    format: Format,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // -- configuration -------------------------------------------------------
    let config = Config::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    tracing::info!(
        categories = ?config.category_names().collect::<Vec<_>>(),
        sources = config.feed_sources().len(),
        "Configuration loaded"
    );

    // -- one run -------------------------------------------------------------
    let fetcher = HttpFetcher::new(config.request_timeout(), &config.user_agent)
        .context("building HTTP client")?
        .with_max_body(config.max_feed_bytes);
    let digest = Pipeline::new(fetcher, config.max_concurrent_fetches)
        .run(&config.categories)
        .await;

    // -- output --------------------------------------------------------------
    let rendered = match args.format {
        Format::Html => render::html(&digest),
        Format::Json => render::json(&digest).context("serializing digest")?,
    };
    std::fs::write(&args.output, rendered)
        .with_context(|| format!("writing {}", args.output.display()))?;

    for category in digest.categories() {
        tracing::info!(category = %category.name, articles = category.articles.len(), "Category ready");
    }
    tracing::info!(
        output = %args.output.display(),
        articles = digest.article_count(),
        "Digest written"
    );
    Ok(())
}
