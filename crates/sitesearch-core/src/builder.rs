//! The build pipeline: configuration to artifact.
//!
//! A build loads `sitesearch.toml`, optionally starts the site, waits for it
//! to answer, crawls it, indexes the corpus and writes the artifact. When the
//! build started the site, everything after spawning runs under supervision:
//! the site exiting early fails the build, and the site is stopped once the
//! build is over, whatever its outcome.

use crate::artifact::SerializedIndexData;
use crate::config::{Config, ResolvedConfig};
use crate::crawler::{CrawlReport, Crawler};
use crate::fetcher::Fetcher;
use crate::queue::TaskQueue;
use crate::site::{SiteProcess, wait_until_ready};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Documents in the written corpus.
    pub documents: usize,
    /// Crawl page counters.
    pub report: CrawlReport,
    /// Where the artifact was written.
    pub output_path: PathBuf,
}

/// Build the project rooted at `project_root`.
pub async fn run_build(project_root: &Path) -> Result<BuildSummary> {
    let (config, config_path) = Config::load(project_root)?;
    let config_dir = config_path.parent().unwrap_or(project_root);
    let resolved = config.resolve(config_dir)?;
    build(&resolved).await
}

/// Build from an already resolved configuration.
pub async fn build(config: &ResolvedConfig) -> Result<BuildSummary> {
    let fetcher = Fetcher::with_timeout(config.request_timeout)?;

    let summary = match config.site_start_cmd.as_deref() {
        Some(command) => {
            let mut site = SiteProcess::start(command)?;
            let result = site.supervise(crawl_and_index(config, fetcher)).await;
            site.stop().await;
            result?
        },
        None => crawl_and_index(config, fetcher).await?,
    };

    info!("Done");
    Ok(summary)
}

async fn crawl_and_index(config: &ResolvedConfig, fetcher: Fetcher) -> Result<BuildSummary> {
    wait_until_ready(&fetcher, &config.ready_probe).await?;

    let crawler = Crawler::new(
        config.origin.clone(),
        config.rules.clone(),
        fetcher,
        TaskQueue::new(config.concurrency),
    );
    let outcome = crawler.crawl(config.start_url.clone()).await;
    let documents = outcome.corpus.len();

    let data = SerializedIndexData::build(
        outcome.corpus,
        config.hierarchy_field_names(),
        config.stemming,
    )?;
    data.write(&config.output_path)?;

    Ok(BuildSummary {
        documents,
        report: outcome.report,
        output_path: config.output_path.clone(),
    })
}
