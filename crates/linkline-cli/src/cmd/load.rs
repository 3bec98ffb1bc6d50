//! `linkline load` - load explicit files as one batch

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;

use linkline_core::{NOTIFY_TARGET, fmt_num};
use linkline_relations::{LoadOptions, LoadSummary, RelationLoader, RunLabel, load};
use linkline_staging::StagingDb;

use super::{BatchFiles, StagingArgs, styled_table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub batch: BatchFiles,

    /// Agency the batch belongs to
    #[arg(long)]
    pub agency: String,

    /// Export version of the batch
    #[arg(long)]
    pub version: String,

    /// Replace existing tables
    #[arg(long)]
    pub force: bool,

    /// Load without checking the batch against its metadata
    #[arg(long)]
    pub skip_validation: bool,

    #[command(flatten)]
    pub staging: StagingArgs,
}

pub fn run(args: LoadArgs, config: &Config) -> Result<()> {
    let label = RunLabel::new(args.agency, args.version);
    let loader = RelationLoader::from_files(
        &args.batch.files,
        args.batch.metadata.as_deref(),
        Some(label.clone()),
    )?;

    if args.skip_validation {
        log::warn!("{label}: loading without validation");
    } else {
        loader.validate(true)?;
    }

    let mut db = StagingDb::open(&args.staging.resolve(config))?;
    let options = LoadOptions {
        force_overwrite: args.force,
    };
    let summary = load(&loader, &options, &mut db)?;
    print_summary(&summary);
    log::info!(target: NOTIFY_TARGET, "{label}: completed load");
    Ok(())
}

fn print_summary(summary: &LoadSummary) {
    let mut table = styled_table(&["Table", "Rows"]);
    for (name, rows) in &summary.tables {
        table.add_row(vec![Cell::new(name), Cell::new(fmt_num(*rows))]);
    }
    eprintln!("\n{table}");
    eprintln!(
        "{}: {} rows in {} tables",
        summary.batch,
        fmt_num(summary.total_rows()),
        summary.tables.len()
    );
}
