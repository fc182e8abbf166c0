//! Error types and handling for sitesearch-core operations.
//!
//! A single error enum covers every failure the build and query paths can hit.
//! Errors are categorized so callers can log them uniformly.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: reading configuration, writing the build artifact
//! - **Network Errors**: fetching pages, polling the readiness probe
//! - **Configuration Errors**: malformed TOML, invalid selectors or patterns
//! - **Index Errors**: building, loading, or querying the full-text index
//! - **Storage Errors**: writing or reading the persisted build artifact
//! - **Lifecycle Errors**: readiness timeout, site process exiting early
//!
//! ## Fatal vs. isolated
//!
//! Configuration, readiness and site-process errors abort a build. Fetch and
//! parse failures for a single page only fail that page's crawl job:
//!
//! ```rust
//! use sitesearch_core::Error;
//!
//! let err = Error::SiteProcessExited("exit status: 1".to_string());
//! assert_eq!(err.category(), "site_process");
//! ```

use thiserror::Error;

/// The main error type for sitesearch-core operations.
///
/// All public functions in sitesearch-core return `Result<T, Error>`. Wrapped
/// library errors are preserved and available through `source()`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading the configuration file, writing the persisted artifact,
    /// and materializing index files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// Covers page fetches during the crawl and readiness probe requests.
    /// The crawler never retries; a failing page is logged and skipped.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A fetched page answered with a non-success status.
    #[error("HTTP {status} for '{url}'")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// Search index operation failed.
    ///
    /// Wraps Tantivy failures while building, loading, or querying the index.
    #[error("Index error: {0}")]
    Index(String),

    /// Reading or writing the build artifact failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration file could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration deserialized but failed validation.
    ///
    /// Carries every problem found, not just the first one, so a user can fix
    /// the whole file in a single pass.
    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    InvalidConfig(Vec<String>),

    /// Operation timed out.
    ///
    /// Raised when the site never becomes ready within the readiness window.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The supervised site process exited before the crawl finished.
    #[error("Site process stopped unexpectedly ({0})")]
    SiteProcessExited(String),

    /// A queued job could not produce a result.
    #[error("Task queue error: {0}")]
    Queue(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tantivy::TantivyError> for Error {
    fn from(err: tantivy::TantivyError) -> Self {
        Self::Index(err.to_string())
    }
}

impl Error {
    /// Get the error category as a string identifier.
    ///
    /// Useful as a structured logging field:
    ///
    /// ```rust
    /// use sitesearch_core::Error;
    ///
    /// let err = Error::Index("corrupt segment".to_string());
    /// tracing::error!(category = err.category(), "{err}");
    /// ```
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) | Self::HttpStatus { .. } => "network",
            Self::Index(_) => "index",
            Self::Storage(_) => "storage",
            Self::Config(_) | Self::InvalidConfig(_) => "config",
            Self::Timeout(_) => "timeout",
            Self::SiteProcessExited(_) => "site_process",
            Self::Queue(_) => "queue",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
