//! On-disk layout of a mirrored export run
//!
//! ```text
//! <mirror>/<agency>/<version>/json/publications/*.json.gz
//! <mirror>/<agency>/<version>/stat/export_metadata.json
//! <mirror>/<agency>/<version>/.force_reload
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::relation::Relation;

pub const PUBLICATIONS_DIR: &str = "json/publications";
pub const PUBLICATIONS_PATTERN: &str = "*.json.gz";
pub const METADATA_FILE: &str = "stat/export_metadata.json";
/// Marker file requesting a reload of an already-ingested run.
pub const FORCE_RELOAD_MARKER: &str = ".force_reload";

/// Agency and version identifying one export run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunLabel {
    pub agency: String,
    pub version: String,
}

impl RunLabel {
    pub fn new(agency: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            version: version.into(),
        }
    }

    /// `{agency}_{version}`
    pub fn batch_id(&self) -> String {
        format!("{}_{}", self.agency, self.version)
    }

    /// `{agency}_{version}_{relation}`
    pub fn table_name(&self, relation: Relation) -> String {
        format!("{}_{}", self.batch_id(), relation.name())
    }
}

impl fmt::Display for RunLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.agency, self.version)
    }
}

/// Paths inside one run directory.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: run_dir.into(),
        }
    }

    /// Run directory of `label` under a mirror root.
    pub fn under(mirror: &Path, label: &RunLabel) -> Self {
        Self::new(mirror.join(&label.agency).join(&label.version))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn force_reload_marker(&self) -> PathBuf {
        self.root.join(FORCE_RELOAD_MARKER)
    }

    /// Publication data files, sorted by path.
    pub fn publication_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(PUBLICATIONS_DIR);
        let pattern = format!(
            "{}/{PUBLICATIONS_PATTERN}",
            glob::Pattern::escape(&dir.to_string_lossy())
        );
        let paths = glob::glob(&pattern)
            .map_err(|e| IngestError::Configuration(format!("bad file pattern {pattern}: {e}")))?;
        let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
        files.sort();
        Ok(files)
    }

    /// Agency and version from the run directory's parent and own names.
    pub fn infer_label(&self) -> Option<RunLabel> {
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let version = root.file_name()?.to_str()?;
        let agency = root.parent()?.file_name()?.to_str()?;
        Some(RunLabel::new(agency, version))
    }
}

/// Runs under `mirror` carrying a force-reload marker, sorted.
pub fn force_reload_requests(mirror: &Path) -> Vec<RunLabel> {
    let pattern = format!(
        "{}/*/*/{FORCE_RELOAD_MARKER}",
        glob::Pattern::escape(&mirror.to_string_lossy())
    );
    let Ok(paths) = glob::glob(&pattern) else {
        return Vec::new();
    };
    let mut labels: Vec<RunLabel> = paths
        .filter_map(|p| p.ok())
        .filter_map(|marker| RunLayout::new(marker.parent()?).infer_label())
        .collect();
    labels.sort();
    labels.dedup();
    labels
}
