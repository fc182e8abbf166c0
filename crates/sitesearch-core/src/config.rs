//! Build configuration.
//!
//! A project is described by a `sitesearch.toml` file at its root. The file
//! names the site to crawl, an optional command that starts it locally, where
//! to write the build artifact, and the content rules used to extract records.
//!
//! ## Example Configuration File
//!
//! ```toml
//! site_start_cmd = "npm run serve"
//! site_origin = "http://localhost:3000"
//! start_url = "/docs"
//! ready_probe = "/"
//! output_path = "./public/site-search.json"
//! concurrency = 5
//!
//! [[rules]]
//! test = "^/docs(/|$)"
//! hierarchy = [
//!     { selector = "nav [aria-expanded=true]" },
//!     { selector = "article h1" },
//!     { selector = "article h2" },
//! ]
//! text = { selector = "article p, article li" }
//! ```
//!
//! Loading is split in two steps. [`Config::load`] deserializes the file;
//! [`Config::resolve`] validates it, compiles every rule, and resolves URLs and
//! paths. Validation reports every problem at once through
//! [`Error::InvalidConfig`].

use crate::index::level_field_name;
use crate::rules::CompiledRule;
use crate::types::ContentRule;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

/// File name looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "sitesearch.toml";

/// Default number of concurrently running crawl jobs.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default per-request timeout for page fetches, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw configuration as written in `sitesearch.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Shell command that starts the site locally.
    ///
    /// When set, the build supervises the process and fails if it exits
    /// before the crawl completes.
    #[serde(default)]
    pub site_start_cmd: Option<String>,

    /// Origin of the site, e.g. `http://localhost:3000`.
    ///
    /// Only links sharing this origin are followed.
    pub site_origin: String,

    /// First page to crawl, resolved against `site_origin`.
    pub start_url: String,

    /// URL polled until the site answers with a 2xx status.
    ///
    /// Defaults to `start_url`.
    #[serde(default)]
    pub ready_probe: Option<String>,

    /// Where the build artifact is written, relative to the config file.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Maximum number of fetch/extract jobs running at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Enable stemming in the index analyzer.
    ///
    /// Off by default so that indexed tokens match query terms literally.
    #[serde(default)]
    pub stemming: bool,

    /// Per-request timeout for page fetches, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Content rules, evaluated in declaration order.
    #[serde(default)]
    pub rules: Vec<ContentRule>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("sitesearch.json")
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Validated configuration with compiled rules and absolute URLs.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Shell command that starts the site, if any.
    pub site_start_cmd: Option<String>,
    /// Site origin; links outside it are ignored.
    pub origin: Url,
    /// First page to crawl.
    pub start_url: Url,
    /// URL polled for readiness.
    pub ready_probe: Url,
    /// Absolute artifact path.
    pub output_path: PathBuf,
    /// Crawl job limit.
    pub concurrency: NonZeroUsize,
    /// Index analyzer stemming flag.
    pub stemming: bool,
    /// Per-request timeout for page fetches.
    pub request_timeout: Duration,
    /// Compiled content rules.
    pub rules: Vec<CompiledRule>,
}

impl ResolvedConfig {
    /// Names of the per-level hierarchy fields in the index (`l_0`, `l_1`, …).
    ///
    /// The widest rule decides how many levels exist.
    pub fn hierarchy_field_names(&self) -> Vec<String> {
        (0..self.hierarchy_depth()).map(level_field_name).collect()
    }

    fn hierarchy_depth(&self) -> usize {
        self.rules.iter().map(CompiledRule::depth).max().unwrap_or(0)
    }
}

impl Config {
    /// Load `sitesearch.toml` from a project root.
    pub fn load(project_root: &Path) -> Result<(Self, PathBuf)> {
        let config_path = project_root.join(CONFIG_FILE_NAME);
        info!("Reading configuration at \"{}\"", config_path.display());

        let content = fs::read_to_string(&config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {e}", config_path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        Ok((config, config_path))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Validate and compile the configuration.
    ///
    /// `config_dir` anchors a relative `output_path`. Every problem found is
    /// reported in a single [`Error::InvalidConfig`].
    pub fn resolve(&self, config_dir: &Path) -> Result<ResolvedConfig> {
        let mut problems = Vec::new();

        let origin = match Url::parse(&self.site_origin) {
            Ok(url) if url.has_host() => Some(url),
            Ok(_) => {
                problems.push(format!(
                    "site_origin: '{}' has no host",
                    self.site_origin
                ));
                None
            },
            Err(err) => {
                problems.push(format!("site_origin: '{}': {err}", self.site_origin));
                None
            },
        };

        let start_url = origin
            .as_ref()
            .and_then(|origin| resolve_against(origin, &self.start_url, "start_url", &mut problems));

        let ready_probe = match (&self.ready_probe, &origin) {
            (Some(probe), Some(origin)) => resolve_against(origin, probe, "ready_probe", &mut problems),
            (None, _) => start_url.clone(),
            (Some(_), None) => None,
        };

        let concurrency = NonZeroUsize::new(self.concurrency);
        if concurrency.is_none() {
            problems.push("concurrency: must be at least 1".to_string());
        }

        if self.rules.is_empty() {
            problems.push("rules: at least one rule is required".to_string());
        }

        let mut rules = Vec::with_capacity(self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            match CompiledRule::compile(rule, &format!("rules[{i}]")) {
                Ok(compiled) => rules.push(compiled),
                Err(mut rule_problems) => problems.append(&mut rule_problems),
            }
        }

        if let Some(cmd) = &self.site_start_cmd {
            if cmd.trim().is_empty() {
                problems.push("site_start_cmd: must not be blank".to_string());
            }
        }

        match (origin, start_url, ready_probe, concurrency) {
            (Some(origin), Some(start_url), Some(ready_probe), Some(concurrency))
                if problems.is_empty() =>
            {
                Ok(ResolvedConfig {
                    site_start_cmd: self.site_start_cmd.clone(),
                    origin,
                    start_url,
                    ready_probe,
                    output_path: config_dir.join(&self.output_path),
                    concurrency,
                    stemming: self.stemming,
                    request_timeout: Duration::from_secs(self.request_timeout_secs),
                    rules,
                })
            },
            _ => Err(Error::InvalidConfig(problems)),
        }
    }
}

fn resolve_against(
    origin: &Url,
    reference: &str,
    field: &str,
    problems: &mut Vec<String>,
) -> Option<Url> {
    match origin.join(reference) {
        Ok(url) if url.origin() == origin.origin() => Some(url),
        Ok(url) => {
            problems.push(format!("{field}: '{url}' is outside of site_origin"));
            None
        },
        Err(err) => {
            problems.push(format!("{field}: '{reference}': {err}"));
            None
        },
    }
}
