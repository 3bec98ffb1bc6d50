//! `linkline export` - write every relation of a batch as Parquet

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::Cell;

use linkline_core::{ParquetSink, cleanup_tmp_files, fmt_num, is_shutdown_requested};
use linkline_relations::{RelationLoader, to_record_batch};

use super::{BatchFiles, styled_table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub batch: BatchFiles,

    /// Output directory, one <relation>.parquet per relation
    #[arg(short, long)]
    pub output: PathBuf,

    /// Zstd compression level (1-22)
    #[arg(short, long)]
    pub zstd_level: Option<i32>,
}

pub fn run(args: ExportArgs, config: &Config) -> Result<()> {
    let level = args.zstd_level.unwrap_or(config.output.compression_level);
    let loader =
        RelationLoader::from_files(&args.batch.files, args.batch.metadata.as_deref(), None)?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    cleanup_tmp_files(&args.output)?;

    let relations = loader.compute_all()?;
    let mut summary = styled_table(&["Relation", "Rows", "File"]);
    for (relation, table) in relations {
        if is_shutdown_requested() {
            bail!("export interrupted");
        }
        let batch = to_record_batch(&table)
            .with_context(|| format!("converting {relation} to arrow"))?;
        let mut sink = ParquetSink::new(relation.name(), &args.output, batch.schema(), level)?;
        sink.write_batch(&batch)?;
        let path = sink.final_path().display().to_string();
        let rows = sink.finalize()?;
        log::debug!("wrote {rows} rows to {path}");
        summary.add_row(vec![
            Cell::new(relation),
            Cell::new(fmt_num(rows)),
            Cell::new(path),
        ]);
    }
    eprintln!("\n{summary}");
    Ok(())
}
