//! # sitesearch-core
//!
//! Core functionality for sitesearch - crawl a rendered website into a
//! hierarchical, searchable corpus and answer queries with highlighted
//! snippets.
//!
//! ## Architecture
//!
//! Data flows one way at build time:
//!
//! - **Crawler**: fetches same-origin pages through a bounded [`TaskQueue`],
//!   deduplicating URLs and routing each path to a content rule
//! - **Extractor**: walks each page once and emits heading-scoped records
//! - **Index**: indexes the corpus with Tantivy and exports it as a blob
//! - **Artifact**: persists corpus, index and field names as one JSON file
//!
//! At query time the [`SearchService`] loads the index lazily, ranks hits,
//! flattens their match positions and cuts a highlighted snippet per hit.
//!
//! ## Quick Start
//!
//! ```rust
//! use sitesearch_core::dom::Page;
//! use sitesearch_core::extract::extract;
//! use sitesearch_core::rules::CompiledRule;
//! use sitesearch_core::{IndexedDocument, SearchService, SerializedIndexData};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let page = Page::parse(
//!     "http://localhost:3000/docs/".parse().unwrap(),
//!     "<h1>Docs</h1><h2 id=\"install\">Install</h2><p>Run the installer.</p>",
//! );
//! let rule = CompiledRule::parse(&["h1", "h2"], "p").unwrap();
//! let corpus: Vec<IndexedDocument> = extract(page.body(), &rule)
//!     .into_iter()
//!     .map(|record| IndexedDocument::from_record("/docs/", record))
//!     .collect();
//!
//! let levels = vec!["l_0".to_string(), "l_1".to_string()];
//! let service = SearchService::new(SerializedIndexData::build(corpus, levels, false)?);
//! let response = service.search(Some("install")).await?;
//! assert_eq!(response.results[0].anchor.as_deref(), Some("install"));
//! # Ok::<(), sitesearch_core::Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Fatal errors abort a build;
//! everything else is isolated to the page or request it happened in:
//!
//! ```rust
//! use sitesearch_core::{Config, Error};
//! use std::path::Path;
//!
//! let config = Config::from_toml_str(r#"
//!     site_origin = "http://localhost:3000"
//!     start_url = "/"
//! "#)?;
//! match config.resolve(Path::new(".")) {
//!     Err(Error::InvalidConfig(problems)) => assert!(!problems.is_empty()),
//!     other => panic!("expected an invalid configuration, got {other:?}"),
//! }
//! # Ok::<(), sitesearch_core::Error>(())
//! ```

/// Build artifact persistence
pub mod artifact;
/// The end-to-end build pipeline
pub mod builder;
/// Configuration loading and validation
pub mod config;
/// Recursive same-origin crawler
pub mod crawler;
/// DOM helpers over `scraper`
pub mod dom;
/// Error types and result aliases
pub mod error;
/// Hierarchical content extraction
pub mod extract;
/// HTTP fetching for pages and readiness probes
pub mod fetcher;
/// Match position flattening for highlights
pub mod highlight;
/// Search index implementation using Tantivy
pub mod index;
/// Bounded-concurrency FIFO job queue
pub mod queue;
/// Compiled content rules and path routing
pub mod rules;
/// Query-time search service
pub mod search;
/// Site process supervision and readiness polling
pub mod site;
/// Highlighted snippet construction
pub mod snippet;
/// Core data types and structures
pub mod types;

// Re-export commonly used types
pub use artifact::SerializedIndexData;
pub use builder::{BuildSummary, build, run_build};
pub use config::{Config, ResolvedConfig};
pub use crawler::{CrawlOutcome, CrawlReport, Crawler};
pub use error::{Error, Result};
pub use fetcher::Fetcher;
pub use index::{IndexBlob, IndexHit, SiteIndex};
pub use queue::{JobHandle, TaskQueue};
pub use search::{SearchApiResult, SearchResponse, SearchService};
pub use snippet::{Snippet, SnippetOptions};
pub use types::*;
