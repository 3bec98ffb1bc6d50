//! `linkline ingest` - sync, then validate and load every updated batch

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use clap::Args;
use indicatif::ProgressBar;

use linkline_core::{NOTIFY_TARGET, SharedProgress, shutdown_flag};
use linkline_relations::{
    LoadOptions, LoadSummary, RelationLoader, RunLabel, RunLayout, force_reload_requests, load,
};
use linkline_staging::StagingDb;

use super::StagingArgs;
use super::sync::{SyncArgs, print_report};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    #[command(flatten)]
    pub staging: StagingArgs,

    /// Replace the tables of batches that are already staged
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: IngestArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let staging = args.staging.resolve(config);
    if staging.database.is_none() {
        bail!("no staging database configured (--database, LINKLINE_DATABASE or [staging] database)");
    }
    let plan = args.sync.resolve(config)?;
    let mut db = StagingDb::open(&staging)?;

    let updated = match plan.run(progress) {
        Ok(report) => {
            print_report(&report);
            report.updated
        }
        Err(e) => {
            log::error!(target: NOTIFY_TARGET, "sync of {} failed: {e}", plan.describe());
            BTreeSet::new()
        }
    };

    let pending = pending_batches(&plan.mirror, updated, args.force);
    if pending.is_empty() {
        log::info!("no new batches to load");
        return Ok(());
    }
    log::info!("{} batches to load", pending.len());

    let failed = load_pending(&mut db, &plan.mirror, &pending, shutdown_flag(), progress);
    if failed > 0 {
        bail!("{failed} of {} batches failed to load", pending.len());
    }
    Ok(())
}

/// A batch queued for loading.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingBatch {
    /// Replace already staged tables
    force: bool,
    /// Force-reload marker, removed right before the batch is loaded
    marker: Option<PathBuf>,
}

/// Updated runs plus runs carrying a force-reload marker. Markers stay on
/// disk until their batch is picked up.
fn pending_batches(
    mirror: &Path,
    updated: BTreeSet<RunLabel>,
    force: bool,
) -> BTreeMap<RunLabel, PendingBatch> {
    let mut pending: BTreeMap<RunLabel, PendingBatch> = updated
        .into_iter()
        .map(|l| (l, PendingBatch { force, marker: None }))
        .collect();
    for label in force_reload_requests(mirror) {
        log::info!("{label}: reload requested");
        let marker = RunLayout::under(mirror, &label).force_reload_marker();
        pending.insert(
            label,
            PendingBatch {
                force: true,
                marker: Some(marker),
            },
        );
    }
    pending
}

/// Load batches in order until done or `cancel` is raised. Returns the
/// number of failed batches.
fn load_pending(
    db: &mut StagingDb,
    mirror: &Path,
    pending: &BTreeMap<RunLabel, PendingBatch>,
    cancel: &AtomicBool,
    progress: &SharedProgress,
) -> usize {
    let mut failed = 0usize;
    for (done, (label, batch)) in pending.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            log::warn!(
                "shutdown requested, {} batches left unloaded",
                pending.len() - done
            );
            break;
        }
        if let Some(marker) = &batch.marker {
            if let Err(e) = std::fs::remove_file(marker) {
                log::warn!("could not remove {}: {e}", marker.display());
            }
        }
        note_staged(db, label, batch.force);
        let line = progress.stage_line(&label.batch_id());
        match ingest_batch(db, mirror, label, batch.force, &line) {
            Ok(summary) => log::info!(
                target: NOTIFY_TARGET,
                "{label}: completed load of {} tables ({} rows)",
                summary.tables.len(),
                summary.total_rows()
            ),
            Err(e) => {
                failed += 1;
                log::error!(target: NOTIFY_TARGET, "{label}: load failed: {e:#}");
            }
        }
        line.finish_and_clear();
    }
    failed
}

/// Log whether a batch is about to replace or collide with staged tables.
fn note_staged(db: &StagingDb, label: &RunLabel, force: bool) -> bool {
    match db.has_run(label) {
        Ok(true) if force => {
            log::info!("{label}: replacing staged tables");
            true
        }
        Ok(true) => {
            log::warn!("{label}: already staged; use --force or a reload marker to replace it");
            true
        }
        Ok(false) => false,
        Err(e) => {
            log::warn!("{label}: could not check staged tables: {e}");
            false
        }
    }
}

fn ingest_batch(
    db: &mut StagingDb,
    mirror: &Path,
    label: &RunLabel,
    force: bool,
    line: &ProgressBar,
) -> Result<LoadSummary> {
    line.set_message("reading");
    let loader = RelationLoader::from_dir(mirror, Some(label.clone()))?;
    line.set_message("validating");
    loader.validate(true)?;
    line.set_message("loading");
    let options = LoadOptions {
        force_overwrite: force,
    };
    Ok(load(&loader, &options, db)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use linkline_core::ProgressContext;
    use linkline_relations::{Destination, RecordStore, Relation, WriteMode};
    use tempfile::TempDir;

    fn mark_for_reload(mirror: &Path, label: &RunLabel) -> PathBuf {
        let layout = RunLayout::under(mirror, label);
        std::fs::create_dir_all(layout.root()).unwrap();
        std::fs::write(layout.force_reload_marker(), b"").unwrap();
        layout.force_reload_marker()
    }

    #[test]
    fn force_reload_markers_join_updated_runs() {
        let dir = TempDir::new().unwrap();
        let marker = mark_for_reload(dir.path(), &RunLabel::new("nih", "v3"));

        let updated = BTreeSet::from([RunLabel::new("nsf", "v1")]);
        let pending = pending_batches(dir.path(), updated, false);

        assert_eq!(
            pending.into_iter().collect::<Vec<_>>(),
            vec![
                (
                    RunLabel::new("nih", "v3"),
                    PendingBatch {
                        force: true,
                        marker: Some(marker.clone()),
                    }
                ),
                (
                    RunLabel::new("nsf", "v1"),
                    PendingBatch {
                        force: false,
                        marker: None,
                    }
                ),
            ]
        );
        // still there until the batch is actually loaded
        assert!(marker.exists());
    }

    #[test]
    fn marker_survives_shutdown_before_load() {
        let dir = TempDir::new().unwrap();
        let label = RunLabel::new("nih", "v3");
        let marker = mark_for_reload(dir.path(), &label);
        let pending = pending_batches(dir.path(), BTreeSet::new(), false);

        let mut db = StagingDb::open_in_memory().unwrap();
        let cancel = AtomicBool::new(true);
        let progress = Arc::new(ProgressContext::hidden());
        let failed = load_pending(&mut db, dir.path(), &pending, &cancel, &progress);

        assert_eq!(failed, 0);
        assert!(marker.exists());
    }

    #[test]
    fn marker_is_consumed_when_batch_is_picked_up() {
        let dir = TempDir::new().unwrap();
        let label = RunLabel::new("nih", "v3");
        let marker = mark_for_reload(dir.path(), &label);
        let pending = pending_batches(dir.path(), BTreeSet::new(), false);

        // no publication files under the run: the load fails, the request is spent
        let mut db = StagingDb::open_in_memory().unwrap();
        let cancel = AtomicBool::new(false);
        let progress = Arc::new(ProgressContext::hidden());
        let failed = load_pending(&mut db, dir.path(), &pending, &cancel, &progress);

        assert_eq!(failed, 1);
        assert!(!marker.exists());
    }

    #[test]
    fn staged_runs_are_detected() {
        let label = RunLabel::new("nsf", "v1");
        let mut db = StagingDb::open_in_memory().unwrap();
        assert!(!note_staged(&db, &label, false));

        let store = RecordStore::from_json_lines("mem", r#"{"eid":"E1","publication_year":2020}"#).unwrap();
        let publications = Relation::Publications.build(&store, None).unwrap();
        db.write_table(
            &label.table_name(Relation::Publications),
            &publications,
            WriteMode::FailIfExists,
        )
        .unwrap();

        assert!(note_staged(&db, &label, false));
        assert!(note_staged(&db, &label, true));
        assert!(!note_staged(&db, &RunLabel::new("nsf", "v2"), false));
    }

    #[test]
    fn marker_forces_an_updated_run() {
        let dir = TempDir::new().unwrap();
        let label = RunLabel::new("nsf", "v1");
        let layout = RunLayout::under(dir.path(), &label);
        std::fs::create_dir_all(layout.root()).unwrap();
        std::fs::write(layout.force_reload_marker(), b"").unwrap();

        let pending = pending_batches(dir.path(), BTreeSet::from([label.clone()]), false);
        assert_eq!(pending.get(&label).map(|b| b.force), Some(true));
    }
}
