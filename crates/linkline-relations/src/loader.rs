//! Batch loader: record store + run metadata + memoized relations

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{IngestError, Result};
use crate::layout::{RunLabel, RunLayout};
use crate::metadata::RunMetadata;
use crate::relation::Relation;
use crate::store::RecordStore;
use crate::table::Table;
use crate::validate::{ValidationReport, check};

/// One agency+version batch held in memory.
///
/// Relations are computed on first request and cached for the lifetime of
/// the loader; the underlying store never changes.
#[derive(Debug)]
pub struct RelationLoader {
    store: RecordStore,
    metadata: Option<RunMetadata>,
    label: Option<RunLabel>,
    memo: Mutex<FxHashMap<Relation, Arc<Table>>>,
}

impl RelationLoader {
    pub fn new(store: RecordStore, metadata: Option<RunMetadata>, label: Option<RunLabel>) -> Self {
        Self {
            store,
            metadata,
            label,
            memo: Mutex::new(FxHashMap::default()),
        }
    }

    /// Load an explicit list of data files, with optional run metadata.
    pub fn from_files(
        files: &[PathBuf],
        metadata_file: Option<&Path>,
        label: Option<RunLabel>,
    ) -> Result<Self> {
        if files.is_empty() {
            return Err(IngestError::NotFound("no publication data files given".to_string()));
        }
        if let Some(missing) = files.iter().find(|f| !f.is_file()) {
            return Err(IngestError::NotFound(format!("data file {}", missing.display())));
        }
        let metadata = metadata_file.map(RunMetadata::from_file).transpose()?;
        let store = RecordStore::load(files)?;
        Ok(Self::new(store, metadata, label))
    }

    /// Load a run from the mirror layout.
    ///
    /// With a label, `base` is the mirror root and the run lives at
    /// `base/<agency>/<version>`. Without one, `base` is the run directory
    /// itself and the label comes from its parent and own names.
    pub fn from_dir(base: &Path, label: Option<RunLabel>) -> Result<Self> {
        let (layout, label) = match label {
            Some(label) => (RunLayout::under(base, &label), label),
            None => {
                let layout = RunLayout::new(base);
                let label = layout.infer_label().ok_or_else(|| {
                    IngestError::Configuration(format!(
                        "cannot infer agency and version from {}",
                        base.display()
                    ))
                })?;
                (layout, label)
            }
        };

        let files = layout.publication_files()?;
        if files.is_empty() {
            return Err(IngestError::NotFound(format!(
                "no publication data under {}",
                layout.root().display()
            )));
        }
        let metadata_file = layout.metadata_file();
        if !metadata_file.is_file() {
            return Err(IngestError::NotFound(format!(
                "run metadata {}",
                metadata_file.display()
            )));
        }
        log::info!("loading {label} from {} ({} files)", layout.root().display(), files.len());
        Self::from_files(&files, Some(&metadata_file), Some(label))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn metadata(&self) -> Option<&RunMetadata> {
        self.metadata.as_ref()
    }

    pub fn label(&self) -> Option<&RunLabel> {
        self.label.as_ref()
    }

    /// Batch name used in messages: `{agency}_{version}`.
    pub fn batch_name(&self) -> String {
        self.label
            .as_ref()
            .map_or_else(|| "unlabelled batch".to_string(), RunLabel::batch_id)
    }

    /// A relation, computed on first use.
    pub fn relation(&self, relation: Relation) -> Result<Arc<Table>> {
        if let Some(table) = self.cached(relation) {
            return Ok(table);
        }
        let table = Arc::new(relation.build(&self.store, self.metadata.as_ref())?);
        log::debug!(
            "{relation}: {} rows x {} columns",
            table.num_rows(),
            table.columns().len()
        );
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        // another thread may have finished first; keep whichever landed
        Ok(Arc::clone(memo.entry(relation).or_insert(table)))
    }

    /// Every relation in declared order, computing missing ones in parallel.
    pub fn compute_all(&self) -> Result<Vec<(Relation, Arc<Table>)>> {
        Relation::ALL
            .par_iter()
            .map(|&r| self.relation(r).map(|t| (r, t)))
            .collect()
    }

    fn cached(&self, relation: Relation) -> Option<Arc<Table>> {
        let memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        memo.get(&relation).cloned()
    }

    /// Year-count parity and eid uniqueness, without failing.
    pub fn validation_report(&self) -> Result<ValidationReport> {
        let metadata = self.metadata.as_ref().ok_or_else(|| {
            IngestError::Configuration("run metadata is required for validation".to_string())
        })?;
        let publications = self.relation(Relation::Publications)?;
        Ok(check(&publications, &self.store, metadata))
    }

    /// Validate the batch. With `raise_on_failure`, a failed check is an error.
    pub fn validate(&self, raise_on_failure: bool) -> Result<bool> {
        let report = self.validation_report()?;
        log::info!(
            "{}: publications per year match metadata: {}",
            self.batch_name(),
            report.year_counts_valid()
        );
        log::info!("{}: eids unique: {}", self.batch_name(), report.eids_unique());

        if !report.is_valid() && raise_on_failure {
            return Err(IngestError::Validation {
                batch: self.batch_name(),
                reason: report.describe(),
            });
        }
        Ok(report.is_valid())
    }
}
