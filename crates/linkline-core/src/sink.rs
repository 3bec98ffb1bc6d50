//! Parquet export of relation batches
//!
//! Each relation becomes `<dir>/<relation>.parquet`. Rows go to
//! `<relation>.parquet.tmp` first and the file is renamed into place only
//! after the footer is written.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

const TMP_SUFFIX: &str = "tmp";

pub struct ParquetSink {
    writer: ArrowWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    rows: usize,
}

impl std::fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetSink")
            .field("final_path", &self.final_path)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl ParquetSink {
    /// Open `<output_dir>/<name>.parquet` for writing with zstd at `zstd_level`.
    pub fn new(name: &str, output_dir: &Path, schema: SchemaRef, zstd_level: i32) -> io::Result<Self> {
        let final_path = output_dir.join(format!("{name}.parquet"));
        let tmp_path = final_path.with_extension(format!("parquet.{TMP_SUFFIX}"));

        let level = ZstdLevel::try_new(zstd_level)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build();
        // File::create truncates a stale tmp file left by an interrupted export
        let file = File::create(&tmp_path)?;
        let writer = ArrowWriter::try_new(file, schema, Some(props)).map_err(io::Error::other)?;

        Ok(Self {
            writer,
            tmp_path,
            final_path,
            rows: 0,
        })
    }

    pub fn write_batch(&mut self, batch: &RecordBatch) -> io::Result<()> {
        self.writer.write(batch).map_err(io::Error::other)?;
        self.rows += batch.num_rows();
        Ok(())
    }

    /// Write the footer and move the file into place; returns rows written.
    pub fn finalize(self) -> io::Result<usize> {
        self.writer.close().map_err(io::Error::other)?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        log::debug!("{}: {} rows", self.final_path.display(), self.rows);
        Ok(self.rows)
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }
}

/// Delete leftover `.tmp` files from interrupted exports, returning how many.
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == TMP_SUFFIX) {
            log::warn!("removing stale {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
