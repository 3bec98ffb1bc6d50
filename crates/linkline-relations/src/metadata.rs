//! Run metadata (`stat/export_metadata.json`)

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestError, Result};

/// Statistics shipped with an export run. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunMetadata {
    #[serde(default)]
    pub stats: ExportStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportStats {
    #[serde(default)]
    pub overall: OverallStats,
    /// Dataset alias records, one per alias.
    #[serde(default)]
    pub documents_per_alias: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverallStats {
    #[serde(default)]
    pub unique_documents_per_year: Vec<YearCount>,
}

/// Expected number of distinct documents for one publication year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub publication_year: i64,
    pub documents: i64,
}

impl RunMetadata {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(IngestError::NotFound(format!(
                "run metadata {}",
                path.display()
            )));
        }
        let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| IngestError::load(path.display(), e))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| IngestError::load("<metadata>", e))
    }

    /// Metadata carrying only expected per-year counts.
    pub fn with_year_counts(counts: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let mut meta = Self::default();
        meta.stats.overall.unique_documents_per_year = counts
            .into_iter()
            .map(|(publication_year, documents)| YearCount {
                publication_year,
                documents,
            })
            .collect();
        meta
    }

    pub fn year_counts(&self) -> &[YearCount] {
        &self.stats.overall.unique_documents_per_year
    }

    pub fn alias_records(&self) -> &[Map<String, Value>] {
        &self.stats.documents_per_alias
    }
}
