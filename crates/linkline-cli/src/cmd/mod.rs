//! Subcommands and the arguments they share

pub mod dump;
pub mod export;
pub mod ingest;
pub mod load;
pub mod sync;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use linkline_relations::RunLabel;
use linkline_staging::StagingConfig;

use crate::config::Config;

#[derive(Args, Debug, Default)]
pub struct StagingArgs {
    /// DuckDB staging database file
    #[arg(long, env = "LINKLINE_DATABASE")]
    pub database: Option<PathBuf>,

    /// DuckDB memory limit (e.g. "8GB")
    #[arg(long, env = "LINKLINE_MEMORY_LIMIT")]
    pub memory_limit: Option<String>,
}

impl StagingArgs {
    pub fn resolve(self, config: &Config) -> StagingConfig {
        config.staging_config(self.database, self.memory_limit)
    }
}

/// Publication files of one batch plus optional run metadata.
#[derive(Args, Debug)]
pub struct BatchFiles {
    /// Publication data files (JSON lines, plain or gzip)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Run metadata file (stat/export_metadata.json)
    #[arg(long)]
    pub metadata: Option<PathBuf>,
}

/// Both or neither of `--agency` and `--version`.
pub fn label_from(agency: Option<String>, version: Option<String>) -> Result<Option<RunLabel>> {
    match (agency, version) {
        (Some(agency), Some(version)) => Ok(Some(RunLabel::new(agency, version))),
        (None, None) => Ok(None),
        _ => bail!("--agency and --version must be given together"),
    }
}

/// Table with the shared preset and a cyan header row.
pub fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}
