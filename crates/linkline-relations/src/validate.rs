//! Batch validation against run metadata

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::metadata::RunMetadata;
use crate::store::RecordStore;
use crate::table::Table;
use crate::values::as_int;

/// A publication year whose distinct-document count differs from the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMismatch {
    pub publication_year: i64,
    pub expected: i64,
    pub observed: i64,
}

/// Outcome of both validation checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub year_mismatches: Vec<YearMismatch>,
    pub duplicate_eids: Vec<String>,
    pub max_eid_occurrences: usize,
}

impl ValidationReport {
    pub fn year_counts_valid(&self) -> bool {
        self.year_mismatches.is_empty()
    }

    pub fn eids_unique(&self) -> bool {
        self.max_eid_occurrences <= 1
    }

    pub fn is_valid(&self) -> bool {
        self.year_counts_valid() && self.eids_unique()
    }

    /// Human-readable failure summary; empty when valid.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if !self.year_mismatches.is_empty() {
            out.push_str("publication counts differ for years");
            for m in &self.year_mismatches {
                let _ = write!(
                    out,
                    " {} (expected {}, found {})",
                    m.publication_year, m.expected, m.observed
                );
            }
        }
        if !self.eids_unique() {
            if !out.is_empty() {
                out.push_str("; ");
            }
            let _ = write!(
                out,
                "{} duplicate eids (max {} occurrences): {}",
                self.duplicate_eids.len(),
                self.max_eid_occurrences,
                self.duplicate_eids.join(", ")
            );
        }
        out
    }
}

/// Distinct eids per publication year. Rows without an integer year are ignored.
pub fn observed_year_counts(publications: &Table) -> BTreeMap<i64, i64> {
    let (Some(keys), Some(years)) = (publications.keys(), publications.column("publication_year"))
    else {
        return BTreeMap::new();
    };
    let mut by_year: BTreeMap<i64, FxHashSet<Arc<str>>> = BTreeMap::new();
    for (key, year) in keys.iter().zip(years) {
        if let Some(year) = as_int(year) {
            by_year.entry(year).or_default().insert(Arc::clone(&key.eid));
        }
    }
    by_year
        .into_iter()
        .map(|(year, eids)| (year, eids.len() as i64))
        .collect()
}

/// Outer-join observed and expected year counts; keep the years that differ.
pub fn year_mismatches(observed: &BTreeMap<i64, i64>, metadata: &RunMetadata) -> Vec<YearMismatch> {
    let mut expected: BTreeMap<i64, i64> = BTreeMap::new();
    for yc in metadata.year_counts() {
        *expected.entry(yc.publication_year).or_default() += yc.documents;
    }
    let years: BTreeSet<i64> = observed.keys().chain(expected.keys()).copied().collect();
    years
        .into_iter()
        .filter_map(|year| {
            let expected = expected.get(&year).copied().unwrap_or(0);
            let observed = observed.get(&year).copied().unwrap_or(0);
            (expected != observed).then_some(YearMismatch {
                publication_year: year,
                expected,
                observed,
            })
        })
        .collect()
}

/// Run both checks over a batch.
pub fn check(publications: &Table, store: &RecordStore, metadata: &RunMetadata) -> ValidationReport {
    let observed = observed_year_counts(publications);
    ValidationReport {
        year_mismatches: year_mismatches(&observed, metadata),
        duplicate_eids: store.duplicate_eids(),
        max_eid_occurrences: store.max_eid_occurrences(),
    }
}
