//! Build command implementation

use anyhow::{Context, Result};
use sitesearch_core::run_build;
use std::path::Path;
use tracing::{info, warn};

/// Crawl the project at `project_root` and write its artifact.
pub async fn execute(project_root: &Path) -> Result<()> {
    let summary = run_build(project_root)
        .await
        .with_context(|| format!("Build failed for {}", project_root.display()))?;

    let report = summary.report;
    if report.pages_failed > 0 {
        warn!("{} page(s) could not be fetched", report.pages_failed);
    }
    info!(
        "Indexed {} documents from {} pages ({} skipped) into {}",
        summary.documents,
        report.pages_fetched,
        report.pages_skipped,
        summary.output_path.display()
    );

    Ok(())
}
