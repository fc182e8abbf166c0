//! Query side: ranked, highlighted results from a build artifact.

use crate::artifact::SerializedIndexData;
use crate::highlight::merge_text_positions;
use crate::index::SiteIndex;
use crate::snippet::{Snippet, SnippetOptions, build_snippet};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Maximum number of results returned per query.
pub const MAX_RESULTS: usize = 10;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchApiResult {
    /// Heading path of the matched record.
    pub hierarchy: Vec<Option<String>>,
    /// Relevance score; results are sorted by it, descending.
    pub score: f32,
    /// Highlighted excerpt of the record text.
    pub snippet: Snippet,
    /// Page path of the record.
    pub path: String,
    /// In-page anchor of the record's heading.
    pub anchor: Option<String>,
}

/// Body of a search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Best results first.
    pub results: Vec<SearchApiResult>,
}

/// Answers queries against one artifact.
///
/// The index is loaded on the first query and kept for the lifetime of the
/// service.
pub struct SearchService {
    data: SerializedIndexData,
    index: OnceCell<SiteIndex>,
    snippet: SnippetOptions,
}

impl SearchService {
    /// Serve `data` with default snippet geometry.
    pub fn new(data: SerializedIndexData) -> Self {
        Self {
            data,
            index: OnceCell::new(),
            snippet: SnippetOptions::default(),
        }
    }

    /// Read the artifact at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        info!("Loading artifact \"{}\"", path.display());
        SerializedIndexData::read(path).map(Self::new)
    }

    /// Override snippet size and margin.
    #[must_use]
    pub fn with_snippet_options(mut self, options: SnippetOptions) -> Self {
        self.snippet = options;
        self
    }

    /// Number of documents in the served corpus.
    pub fn document_count(&self) -> usize {
        self.data.corpus.len()
    }

    async fn index(&self) -> Result<&SiteIndex> {
        self.index
            .get_or_try_init(|| async {
                debug!("Loading index into memory");
                self.data.open_index()
            })
            .await
    }

    /// Search for `query`.
    ///
    /// The last word of the query is matched as a prefix. A missing or blank
    /// query returns no results without touching the index.
    pub async fn search(&self, query: Option<&str>) -> Result<SearchResponse> {
        let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
            return Ok(SearchResponse::default());
        };

        let hits = self.index().await?.search(&format!("{query}*"), MAX_RESULTS)?;

        let results = hits
            .into_iter()
            .map(|hit| {
                let doc = self.data.corpus.get(hit.doc).ok_or_else(|| {
                    Error::Index(format!("Hit refers to missing document {}", hit.doc))
                })?;
                let highlights = merge_text_positions(&hit.matches);

                Ok(SearchApiResult {
                    hierarchy: doc.hierarchy.clone(),
                    score: hit.score,
                    snippet: build_snippet(&doc.text, &highlights, self.snippet),
                    path: doc.path.clone(),
                    anchor: doc.anchor.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Query '{query}' returned {} results", results.len());
        Ok(SearchResponse { results })
    }
}
