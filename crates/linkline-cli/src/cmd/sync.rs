//! `linkline sync` - mirror the export bucket locally

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::{Cell, Color};

use linkline_core::{SharedProgress, fmt_num, shutdown_flag};
use linkline_mirror::{
    BucketSettings, MirrorError, ObjectSource, S3Bucket, SyncOptions, SyncReport, parse_bucket_url,
};
use linkline_relations::RunLabel;

use super::styled_table;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Export bucket (s3://bucket/prefix)
    #[arg(long, env = "LINKLINE_BUCKET")]
    pub bucket: Option<String>,

    /// S3-compatible endpoint (default: AWS)
    #[arg(long, env = "LINKLINE_BUCKET_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS region of the bucket
    #[arg(long, env = "LINKLINE_BUCKET_REGION")]
    pub region: Option<String>,

    /// Named AWS profile
    #[arg(long, env = "LINKLINE_BUCKET_PROFILE")]
    pub profile: Option<String>,

    /// Send unsigned requests (public buckets)
    #[arg(long)]
    pub anonymous: bool,

    /// Local mirror directory
    #[arg(short, long, env = "LINKLINE_MIRROR")]
    pub mirror: Option<PathBuf>,

    /// Number of parallel downloads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Download objects already present in the mirror
    #[arg(long)]
    pub overwrite: bool,
}

/// Fully resolved sync settings.
pub struct MirrorPlan {
    pub source: S3Bucket,
    pub prefix: String,
    pub mirror: PathBuf,
    pub options: SyncOptions,
}

impl SyncArgs {
    pub fn resolve(self, config: &Config) -> Result<MirrorPlan> {
        let url = self
            .bucket
            .or_else(|| config.bucket.url.clone())
            .context("no bucket configured (--bucket, LINKLINE_BUCKET or [bucket] url)")?;
        let mirror = self
            .mirror
            .or_else(|| config.mirror.dir.clone())
            .context("no mirror directory configured (--mirror, LINKLINE_MIRROR or [mirror] dir)")?;
        let (bucket, prefix) = parse_bucket_url(&url)?;
        let endpoint = self.endpoint.or_else(|| config.bucket.endpoint.clone());
        let mut credentials = config.bucket.credentials();
        if let Some(profile) = self.profile {
            credentials.access_key_id = None;
            credentials.secret_access_key = None;
            credentials.profile = Some(profile);
        }
        credentials.anonymous |= self.anonymous;
        let source = S3Bucket::connect(&BucketSettings {
            bucket,
            endpoint,
            region: self.region.or_else(|| config.bucket.region.clone()),
            auth: credentials.resolve()?,
        });

        Ok(MirrorPlan {
            source,
            prefix,
            mirror,
            options: SyncOptions {
                workers: self.workers.unwrap_or(config.sync.workers),
                overwrite: self.overwrite || config.sync.overwrite,
                max_retries: config.sync.max_retries,
            },
        })
    }
}

impl MirrorPlan {
    /// Sync until done or until a shutdown signal arrives.
    pub fn run(&self, progress: &SharedProgress) -> Result<SyncReport, MirrorError> {
        linkline_mirror::sync(
            &self.source,
            &self.prefix,
            &self.mirror,
            &self.options,
            shutdown_flag(),
            progress,
        )
    }

    pub fn describe(&self) -> String {
        format!("{}{}", self.source.describe(), self.prefix)
    }
}

pub fn run(args: SyncArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let plan = args.resolve(config)?;
    let report = plan
        .run(progress)
        .with_context(|| format!("sync of {} failed", plan.describe()))?;
    print_report(&report);

    if !report.is_complete() {
        bail!(
            "{} downloads failed, {} never started",
            report.failed.len(),
            report.abandoned.len()
        );
    }
    Ok(())
}

fn labels(set: &std::collections::BTreeSet<RunLabel>) -> String {
    if set.is_empty() {
        return "-".to_string();
    }
    set.iter().map(RunLabel::batch_id).collect::<Vec<_>>().join(", ")
}

pub fn print_report(report: &SyncReport) {
    let mut table = styled_table(&["Sync", "Value"]);
    table.add_row(vec![Cell::new("Objects listed"), Cell::new(fmt_num(report.listed))]);
    table.add_row(vec![Cell::new("Downloaded"), Cell::new(fmt_num(report.downloaded))]);
    table.add_row(vec![Cell::new("Skipped"), Cell::new(fmt_num(report.skipped))]);
    let failed = Cell::new(report.failed.len());
    table.add_row(vec![
        Cell::new("Failed"),
        if report.failed.is_empty() { failed } else { failed.fg(Color::Red) },
    ]);
    let abandoned = Cell::new(report.abandoned.len());
    table.add_row(vec![
        Cell::new("Abandoned"),
        if report.abandoned.is_empty() { abandoned } else { abandoned.fg(Color::Yellow) },
    ]);
    table.add_row(vec![Cell::new("Updated runs"), Cell::new(labels(&report.updated))]);
    table.add_row(vec![Cell::new("Incomplete runs"), Cell::new(labels(&report.incomplete))]);
    table.add_row(vec![
        Cell::new("Elapsed"),
        Cell::new(format!("{:.1}s", report.elapsed.as_secs_f64())),
    ]);
    eprintln!("\n{table}");
}
