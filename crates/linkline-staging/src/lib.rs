//! linkline-staging: DuckDB staging database for normalized batches
//!
//! Each relation of a batch lands in its own table,
//! `{agency}_{version}_{relation}`, with column types inferred from the data.

mod config;
mod sql;

pub use config::StagingConfig;

use std::path::{Path, PathBuf};

use duckdb::Connection;
use duckdb::types::Value as DuckValue;
use linkline_relations::{
    ColumnType, Destination, IngestError, Relation, RunLabel, Table, WriteMode, cell_text,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("table {0} already exists (use force overwrite to replace it)")]
    TableExists(String),
    #[error("duckdb: {0}")]
    DuckDb(#[from] duckdb::Error),
}

impl From<StagingError> for IngestError {
    fn from(e: StagingError) -> Self {
        IngestError::destination(e)
    }
}

type Result<T> = std::result::Result<T, StagingError>;

/// Owned connection to the staging database.
pub struct StagingDb {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for StagingDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingDb")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl StagingDb {
    /// Open the configured database file, creating it if needed.
    pub fn open(config: &StagingConfig) -> linkline_relations::Result<Self> {
        let path = config.database.as_ref().ok_or_else(|| {
            IngestError::Configuration("no staging database configured".to_string())
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(IngestError::destination)?;
        }
        log::debug!("opening staging database {}", path.display());
        let conn = Connection::open(path).map_err(StagingError::from)?;
        Self::configure(&conn, &config.memory_limit)?;
        Ok(Self {
            conn,
            path: Some(path.clone()),
        })
    }

    pub fn open_in_memory() -> linkline_relations::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StagingError::from)?;
        Self::configure(&conn, &StagingConfig::default().memory_limit)?;
        Ok(Self { conn, path: None })
    }

    fn configure(conn: &Connection, memory_limit: &str) -> Result<()> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        conn.execute_batch(&sql::configure(memory_limit, threads))?;
        Ok(())
    }

    /// Database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn exists(&self, name: &str) -> Result<bool> {
        let n: i64 = self
            .conn
            .query_row(sql::table_exists(), [name], |row| row.get(0))?;
        Ok(n > 0)
    }

    /// Whether the run's publications table has already been staged.
    pub fn has_run(&self, label: &RunLabel) -> linkline_relations::Result<bool> {
        Ok(self.exists(&label.table_name(Relation::Publications))?)
    }

    pub fn row_count(&self, name: &str) -> linkline_relations::Result<u64> {
        let n: i64 = self
            .conn
            .query_row(&sql::row_count(name), [], |row| row.get(0))
            .map_err(StagingError::from)?;
        Ok(n as u64)
    }

    fn write(&mut self, name: &str, table: &Table, mode: WriteMode) -> Result<usize> {
        if mode == WriteMode::FailIfExists && self.exists(name)? {
            return Err(StagingError::TableExists(name.to_string()));
        }

        let types = table.column_types();
        let mut columns: Vec<(String, ColumnType)> = Vec::with_capacity(types.len() + 1);
        if table.is_keyed() {
            columns.push((linkline_relations::export::EID_COLUMN.to_string(), ColumnType::Utf8));
        }
        columns.extend(table.columns().iter().cloned().zip(types.iter().copied()));

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql::create_table(name, &columns, mode == WriteMode::Replace))?;
        {
            let mut appender = tx.appender(name)?;
            for (idx, row) in table.rows().iter().enumerate() {
                let key = table
                    .keys()
                    .map(|keys| DuckValue::Text(keys[idx].eid.to_string()));
                let cells = row.iter().zip(&types).map(|(cell, ty)| to_duck(cell, *ty));
                appender.append_row(duckdb::appender_params_from_iter(key.into_iter().chain(cells)))?;
            }
            appender.flush()?;
        }
        tx.commit()?;
        log::debug!("staged {} rows into {name}", table.num_rows());
        Ok(table.num_rows())
    }
}

impl Destination for StagingDb {
    fn table_exists(&self, name: &str) -> linkline_relations::Result<bool> {
        Ok(self.exists(name)?)
    }

    fn write_table(
        &mut self,
        name: &str,
        table: &Table,
        mode: WriteMode,
    ) -> linkline_relations::Result<usize> {
        Ok(self.write(name, table, mode)?)
    }
}

fn to_duck(cell: &Value, ty: ColumnType) -> DuckValue {
    let converted = match ty {
        ColumnType::Boolean => cell.as_bool().map(DuckValue::Boolean),
        ColumnType::Int64 => cell.as_i64().map(DuckValue::BigInt),
        ColumnType::Float64 => cell.as_f64().map(DuckValue::Double),
        ColumnType::Utf8 => cell_text(cell).map(DuckValue::Text),
    };
    converted.unwrap_or(DuckValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_without_database_is_configuration_error() {
        let err = StagingDb::open(&StagingConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::Configuration(_)));
    }

    #[test]
    fn bulk_write_keeps_values_and_order() {
        let lines: Vec<String> = (0..5000)
            .map(|i| json!({"eid": format!("E{i:05}"), "publication_year": 2000 + i % 20, "doi": null}).to_string())
            .collect();
        let store = linkline_relations::RecordStore::from_json_lines("mem", &lines.join("\n")).unwrap();
        let publications = Relation::Publications.build(&store, None).unwrap();

        let mut db = StagingDb::open_in_memory().unwrap();
        assert_eq!(db.write("pubs", &publications, WriteMode::FailIfExists).unwrap(), 5000);
        assert_eq!(db.row_count("pubs").unwrap(), 5000);

        let (eid, year, doi): (String, i64, Option<String>) = db
            .conn
            .query_row(
                "SELECT eid, publication_year, doi FROM pubs ORDER BY eid DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(eid, "E04999");
        assert_eq!(year, 2019);
        assert_eq!(doi, None);
    }

    #[test]
    fn converts_cells_by_column_type() {
        assert!(matches!(to_duck(&json!(true), ColumnType::Boolean), DuckValue::Boolean(true)));
        assert!(matches!(to_duck(&json!(7), ColumnType::Int64), DuckValue::BigInt(7)));
        assert!(matches!(to_duck(&json!(7), ColumnType::Float64), DuckValue::Double(f) if f == 7.0));
        assert!(matches!(to_duck(&json!([1]), ColumnType::Utf8), DuckValue::Text(ref s) if s == "[1]"));
        assert!(matches!(to_duck(&Value::Null, ColumnType::Int64), DuckValue::Null));
    }
}
