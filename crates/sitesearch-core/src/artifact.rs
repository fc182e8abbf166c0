use crate::index::{IndexBlob, SiteIndex};
use crate::types::Corpus;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// The persisted build output: corpus, index and hierarchy field names.
///
/// Written once per build and read once per server process. `index` is only
/// meaningful to [`SiteIndex::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedIndexData {
    /// Documents in crawl order; hit ids index into this list.
    pub corpus: Corpus,
    /// Exported full-text index.
    pub index: IndexBlob,
    /// Index field names of the hierarchy levels, outermost first.
    pub hierarchy_field_names: Vec<String>,
}

impl SerializedIndexData {
    /// Index `corpus` with one field per entry of `hierarchy_field_names`.
    pub fn build(
        corpus: Corpus,
        hierarchy_field_names: Vec<String>,
        stemming: bool,
    ) -> Result<Self> {
        let index = SiteIndex::build(&corpus, &hierarchy_field_names, stemming)?;
        Ok(Self {
            corpus,
            index,
            hierarchy_field_names,
        })
    }

    /// Load the index this artifact carries.
    pub fn open_index(&self) -> Result<SiteIndex> {
        SiteIndex::load(&self.index, &self.hierarchy_field_names)
    }

    /// Write the artifact as JSON, creating parent directories.
    ///
    /// The file is written next to `path` first and renamed into place.
    pub fn write(&self, path: &Path) -> Result<()> {
        info!("Writing output at \"{}\"", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| Error::Storage(format!("Failed to write {}: {e}", tmp_path.display())))?;

        #[cfg(target_os = "windows")]
        if path.exists() {
            fs::remove_file(path).map_err(|e| {
                Error::Storage(format!("Failed to remove existing {}: {e}", path.display()))
            })?;
        }
        fs::rename(&tmp_path, path)
            .map_err(|e| Error::Storage(format!("Failed to commit {}: {e}", path.display())))?;

        debug!("Saved {} documents", self.corpus.len());
        Ok(())
    }

    /// Read an artifact written by [`write`](Self::write).
    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Storage(format!("Failed to parse {}: {e}", path.display())))
    }
}
