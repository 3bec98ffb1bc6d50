//! Mirror synchronization: bounded, cancellable download pool

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use linkline_core::retry::backoff_duration;
use linkline_core::{ProgressContext, WorkQueue, fmt_num, retry_with_backoff};
use linkline_relations::RunLabel;

use crate::bucket::normalize_prefix;
use crate::error::MirrorError;
use crate::source::ObjectSource;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Concurrent downloads
    pub workers: usize,
    /// Download objects even when the mirror already has them
    pub overwrite: bool,
    /// Retries per object for transient failures
    pub max_retries: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            overwrite: false,
            max_retries: 3,
        }
    }
}

/// Outcome of one synchronization run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub listed: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub bytes: u64,
    /// Keys that failed after retries
    pub failed: Vec<String>,
    /// Keys never started because of cancellation
    pub abandoned: Vec<String>,
    /// Runs whose every planned object downloaded
    pub updated: BTreeSet<RunLabel>,
    /// Runs with failed or abandoned objects
    pub incomplete: BTreeSet<RunLabel>,
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.abandoned.is_empty()
    }

    pub fn log(&self) {
        log::info!(
            "sync: {} objects listed, {} downloaded ({} bytes), {} skipped in {:.1}s",
            fmt_num(self.listed),
            fmt_num(self.downloaded),
            self.bytes,
            fmt_num(self.skipped),
            self.elapsed.as_secs_f64()
        );
        if !self.failed.is_empty() {
            log::warn!("sync: {} downloads failed", self.failed.len());
        }
        if !self.abandoned.is_empty() {
            log::warn!("sync: cancelled, {} downloads never started", self.abandoned.len());
        }
        if !self.incomplete.is_empty() {
            let names: Vec<String> = self.incomplete.iter().map(RunLabel::batch_id).collect();
            log::warn!("sync: incomplete runs: {}", names.join(", "));
        }
    }
}

#[derive(Debug)]
struct Download {
    key: String,
    dest: PathBuf,
    label: Option<RunLabel>,
}

/// Mirror every object under `prefix` of `source` into `mirror`.
///
/// Objects already present locally are skipped unless `overwrite` is set.
/// Once `cancel` is raised workers stop claiming new objects; downloads in
/// flight finish and the rest are reported as abandoned.
pub fn sync(
    source: &dyn ObjectSource,
    prefix: &str,
    mirror: &Path,
    options: &SyncOptions,
    cancel: &AtomicBool,
    progress: &ProgressContext,
) -> Result<SyncReport, MirrorError> {
    let start = Instant::now();
    let prefix = normalize_prefix(prefix);
    log::info!(
        "listing objects from {} under '{prefix}' into {}",
        source.describe(),
        mirror.display()
    );
    let objects = source.list(&prefix)?;

    let mut report = SyncReport {
        listed: objects.len(),
        ..SyncReport::default()
    };
    let mut planned = Vec::new();
    for object in objects {
        let Some(stem) = object.key.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let parts: Vec<&str> = stem.split('/').collect();
        if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
            log::debug!("ignoring object key {}", object.key);
            continue;
        }
        let dest = parts.iter().fold(mirror.to_path_buf(), |p, seg| p.join(seg));
        if dest.exists() && !options.overwrite {
            report.skipped += 1;
            continue;
        }
        let label = (parts.len() > 2).then(|| RunLabel::new(parts[0], parts[1]));
        planned.push(Download {
            key: object.key,
            dest,
            label,
        });
    }
    log::info!(
        "{} objects to download, {} already mirrored",
        planned.len(),
        report.skipped
    );

    let queue = WorkQueue::new(planned);
    let bar = progress.objects_bar("sync", queue.total() as u64);
    let outcomes: Mutex<Vec<(&Download, Result<u64, MirrorError>)>> = Mutex::new(Vec::new());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .thread_name(|i| format!("mirror-{i}"))
        .build()?;
    pool.scope(|s| {
        for _ in 0..options.workers.max(1) {
            s.spawn(|_| {
                while !cancel.load(Ordering::Relaxed) {
                    let Some(item) = queue.next() else {
                        break;
                    };
                    bar.set_message(item.key.clone());
                    let outcome = download(source, item, options.max_retries);
                    bar.inc(1);
                    outcomes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((item, outcome));
                }
            });
        }
    });
    bar.finish_and_clear();

    let mut complete: BTreeSet<RunLabel> = BTreeSet::new();
    let outcomes = outcomes.into_inner().unwrap_or_else(PoisonError::into_inner);
    for (item, outcome) in outcomes {
        match outcome {
            Ok(bytes) => {
                report.downloaded += 1;
                report.bytes += bytes;
                complete.extend(item.label.clone());
            }
            Err(e) => {
                log::error!("failed to download {} to {}: {e}", item.key, item.dest.display());
                report.failed.push(item.key.clone());
                report.incomplete.extend(item.label.clone());
            }
        }
    }
    for item in queue.unclaimed() {
        report.abandoned.push(item.key.clone());
        report.incomplete.extend(item.label.clone());
    }
    report.updated = complete.difference(&report.incomplete).cloned().collect();
    report.failed.sort();
    report.elapsed = start.elapsed();
    report.log();
    Ok(report)
}

fn download(source: &dyn ObjectSource, item: &Download, max_retries: u32) -> Result<u64, MirrorError> {
    log::debug!("downloading {} to {}", item.key, item.dest.display());
    retry_with_backoff(&item.key, max_retries, backoff_duration, || {
        fetch_to_file(source, &item.key, &item.dest)
    })
}

/// Fetch into `<dest>.part`, renaming only once the object is complete.
fn fetch_to_file(source: &dyn ObjectSource, key: &str, dest: &Path) -> Result<u64, MirrorError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| MirrorError::io(parent, e))?;
    }
    let part = part_path(dest);
    let file = File::create(&part).map_err(|e| MirrorError::io(&part, e))?;
    let mut writer = BufWriter::new(file);

    let written = source.fetch(key, &mut writer).and_then(|n| {
        writer.flush().map_err(|e| MirrorError::io(&part, e))?;
        Ok(n)
    });
    drop(writer);

    match written {
        Ok(n) => {
            fs::rename(&part, dest).map_err(|e| MirrorError::io(dest, e))?;
            Ok(n)
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/m/a/v/x.json.gz")),
            PathBuf::from("/m/a/v/x.json.gz.part")
        );
    }

    #[test]
    fn default_options() {
        let o = SyncOptions::default();
        assert_eq!(o.workers, 5);
        assert!(!o.overwrite);
    }
}
