//! # CLI Structure and Argument Parsing
//!
//! ```bash
//! # Crawl the site described by ./sitesearch.toml and write the artifact
//! sitesearch build
//!
//! # Serve an artifact over HTTP
//! sitesearch serve --artifact public/sitesearch.json --bind 0.0.0.0:8080
//!
//! # Inspect an artifact without a server
//! sitesearch query --artifact public/sitesearch.json install guide
//! ```

use clap::{Args, Parser, Subcommand};
use sitesearch_core::SnippetOptions;
use std::path::PathBuf;

/// Main CLI structure for the `sitesearch` command
#[derive(Parser, Clone, Debug)]
#[command(name = "sitesearch")]
#[command(version)]
#[command(about = "sitesearch - Hierarchical full-text search for rendered websites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages (only show warnings and errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Crawl the site and write the search artifact
    Build {
        /// Directory containing `sitesearch.toml`
        #[arg(value_name = "PROJECT_ROOT", default_value = ".")]
        project_root: PathBuf,
    },

    /// Serve search results over HTTP
    Serve(ServeArgs),

    /// Run one query against an artifact and print the JSON response
    Query {
        /// Artifact written by `sitesearch build`
        #[arg(long, env = "SITESEARCH_ARTIFACT")]
        artifact: PathBuf,

        /// Search terms; the last one matches as a prefix
        #[arg(value_name = "QUERY", required = true, num_args = 1..)]
        query: Vec<String>,

        #[command(flatten)]
        snippet: SnippetArgs,
    },
}

/// Snippet geometry shared by `serve` and `query`.
#[derive(Args, Clone, Copy, Debug)]
pub struct SnippetArgs {
    /// Snippet width in characters
    #[arg(long, default_value_t = 100)]
    pub snippet_size: usize,

    /// How far snippet edges may move to land on a word boundary
    #[arg(long, default_value_t = 10)]
    pub snippet_margin: usize,
}

impl SnippetArgs {
    /// Geometry handed to the search service.
    pub const fn options(self) -> SnippetOptions {
        SnippetOptions {
            size: self.snippet_size,
            margin: self.snippet_margin,
        }
    }
}

/// Options for `sitesearch serve`.
#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Artifact written by `sitesearch build`
    #[arg(long, env = "SITESEARCH_ARTIFACT")]
    pub artifact: PathBuf,

    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SITESEARCH_BIND", default_value = "127.0.0.1:3000")]
    pub bind: String,

    /// Route answering `GET <path>?q=<query>`
    #[arg(long, default_value = "/search")]
    pub path: String,

    #[command(flatten)]
    pub snippet: SnippetArgs,
}
