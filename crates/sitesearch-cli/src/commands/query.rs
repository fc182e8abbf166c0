//! One-shot query against an artifact

use anyhow::{Context, Result};
use sitesearch_core::{SearchService, SnippetOptions};
use std::path::Path;

/// Print the JSON response the HTTP endpoint would return for `query`.
pub async fn execute(artifact: &Path, query: &str, snippet: SnippetOptions) -> Result<()> {
    let service = SearchService::open(artifact)
        .with_context(|| format!("Failed to load artifact {}", artifact.display()))?
        .with_snippet_options(snippet);
    let response = service.search(Some(query)).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
