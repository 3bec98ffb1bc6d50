//! Handing a validated batch to a persistence destination

use crate::error::{IngestError, Result};
use crate::loader::RelationLoader;
use crate::table::Table;

/// What to do when a destination table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    FailIfExists,
}

/// A store that accepts named tables.
pub trait Destination {
    fn table_exists(&self, name: &str) -> Result<bool>;

    /// Write `table` under `name`, returning the number of rows written.
    fn write_table(&mut self, name: &str, table: &Table, mode: WriteMode) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Replace existing tables instead of failing.
    pub force_overwrite: bool,
}

impl LoadOptions {
    pub fn write_mode(&self) -> WriteMode {
        if self.force_overwrite {
            WriteMode::Replace
        } else {
            WriteMode::FailIfExists
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub batch: String,
    /// `(table name, rows)` in load order.
    pub tables: Vec<(String, usize)>,
}

impl LoadSummary {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

/// Write every relation of the batch to `destination`.
///
/// All relations are computed before the first write so a schema failure
/// never leaves a partially written batch behind.
pub fn load(
    loader: &RelationLoader,
    options: &LoadOptions,
    destination: &mut dyn Destination,
) -> Result<LoadSummary> {
    let label = loader.label().ok_or_else(|| {
        IngestError::Configuration("agency and version are required to load a batch".to_string())
    })?;
    let mode = options.write_mode();
    let relations = loader.compute_all()?;

    let mut tables = Vec::with_capacity(relations.len());
    for (relation, table) in relations {
        let name = label.table_name(relation);
        log::info!("loading {relation} into {name} ({} rows)", table.num_rows());
        let rows = destination.write_table(&name, &table, mode)?;
        tables.push((name, rows));
    }

    let summary = LoadSummary {
        batch: label.batch_id(),
        tables,
    };
    log::info!(
        "{}: loaded {} tables, {} rows",
        summary.batch,
        summary.tables.len(),
        summary.total_rows()
    );
    Ok(summary)
}
