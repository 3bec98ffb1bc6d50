//! linkline - ingest research-linkage exports into a staging database
//!
//! Mirrors the export bucket locally, normalizes each agency/version batch
//! into relational tables, validates it against the run metadata and loads
//! it into DuckDB.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "linkline")]
#[command(about = "Ingest research-linkage exports into a staging database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./linkline.toml or ~/.config/linkline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync the bucket, then validate and load every updated batch
    Ingest(cmd::ingest::IngestArgs),
    /// Sync the bucket into the local mirror
    Sync(cmd::sync::SyncArgs),
    /// Load publication files as one batch into the staging database
    Load(cmd::load::LoadArgs),
    /// Check a mirrored batch against its run metadata
    Validate(cmd::validate::ValidateArgs),
    /// Print one relation of a batch
    Dump(cmd::dump::DumpArgs),
    /// Write every relation of a batch as Parquet
    Export(cmd::export::ExportArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(linkline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn + notify) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    linkline_core::init_logging(quiet, cli.debug, multi);

    if let Err(e) = linkline_core::install_signal_handlers() {
        log::warn!("could not install signal handlers: {e}");
    }

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Ingest(args) => cmd::ingest::run(args, &config, &progress),
        Command::Sync(args) => cmd::sync::run(args, &config, &progress),
        Command::Load(args) => cmd::load::run(args, &config),
        Command::Validate(args) => cmd::validate::run(args),
        Command::Dump(args) => cmd::dump::run(args),
        Command::Export(args) => cmd::export::run(args, &config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let unset = || "not set".to_string();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Mirror directory".to_string(),
                config
                    .mirror
                    .dir
                    .as_ref()
                    .map_or_else(unset, |d| d.display().to_string()),
            ]);
            table.add_row(vec![
                "Bucket URL".to_string(),
                config.bucket.url.clone().unwrap_or_else(unset),
            ]);
            table.add_row(vec![
                "Bucket endpoint".to_string(),
                config
                    .bucket
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| "AWS (default)".to_string()),
            ]);
            table.add_row(vec![
                "Bucket credentials".to_string(),
                config.bucket.auth_summary(),
            ]);
            table.add_row(vec![
                "Staging database".to_string(),
                config
                    .staging
                    .database
                    .as_ref()
                    .map_or_else(unset, |d| d.display().to_string()),
            ]);
            table.add_row(vec![
                "Memory limit".to_string(),
                config.staging.memory_limit.clone(),
            ]);
            table.add_row(vec![
                "Sync workers".to_string(),
                config.sync.workers.to_string(),
            ]);
            table.add_row(vec![
                "Overwrite mirrored".to_string(),
                config.sync.overwrite.to_string(),
            ]);
            table.add_row(vec![
                "Max retries".to_string(),
                config.sync.max_retries.to_string(),
            ]);
            table.add_row(vec![
                "Compression level".to_string(),
                config.output.compression_level.to_string(),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dump_parses_relation_and_columns() {
        let cli = Cli::try_parse_from([
            "linkline",
            "dump",
            "topicclusters",
            "a.json.gz",
            "b.json.gz",
            "--columns",
            "topic_cluster_id,topic_cluster_name",
        ])
        .unwrap();
        let Command::Dump(args) = cli.command else {
            panic!("expected dump");
        };
        assert_eq!(args.relation, linkline_relations::Relation::TopicClusters);
        assert_eq!(args.batch.files.len(), 2);
        assert_eq!(args.columns, vec!["topic_cluster_id", "topic_cluster_name"]);
        assert_eq!(args.limit, 20);
    }

    #[test]
    fn sync_parses_bucket_credentials() {
        let cli = Cli::try_parse_from([
            "linkline",
            "sync",
            "--bucket",
            "s3://exports/susd",
            "--region",
            "eu-west-1",
            "--profile",
            "exports",
            "--workers",
            "3",
        ])
        .unwrap();
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.bucket.as_deref(), Some("s3://exports/susd"));
        assert_eq!(args.region.as_deref(), Some("eu-west-1"));
        assert_eq!(args.profile.as_deref(), Some("exports"));
        assert!(!args.anonymous);
        assert_eq!(args.workers, Some(3));
    }

    #[test]
    fn unknown_relation_is_rejected() {
        assert!(Cli::try_parse_from(["linkline", "dump", "journals", "a.json.gz"]).is_err());
    }
}
