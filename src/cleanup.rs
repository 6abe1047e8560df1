//! Periodic temp-directory sweep.
//!
//! Uploads land in the temp root under unique names and are unlinked on
//! completion; this sweep is the safety net for crashed or abandoned
//! requests. It runs on a ticker (half the max age) and removes regular
//! files whose modification time is older than the max age. Directories are
//! left alone.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Runs the sweep until `shutdown` flips to `true`.
pub async fn run_periodic_cleanup(
    dir: PathBuf,
    max_age: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // tokio intervals reject a zero period.
    let interval = interval.max(Duration::from_secs(1));
    info!(
        dir = %dir.display(),
        max_age_secs = max_age.as_secs(),
        interval_secs = interval.as_secs(),
        "starting periodic temp file cleanup"
    );

    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_old_files(&dir, max_age);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("stopping periodic temp file cleanup");
                    return;
                }
            }
        }
    }
}

/// One sweep pass: unlink regular files older than `max_age`.
pub fn sweep_old_files(dir: &Path, max_age: Duration) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "temp directory does not exist, skipping cleanup");
            return;
        }
        Err(e) => {
            warn!(dir = %dir.display(), "error reading temp directory: {e}");
            return;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0usize;
    let mut removed_bytes = 0u64;

    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                removed_bytes += metadata.len();
                debug!(file = %path.display(), age_secs = age.as_secs(), "cleaned up old temp file");
            }
            Err(e) => warn!(file = %path.display(), "error removing temp file: {e}"),
        }
    }

    if removed > 0 {
        info!(
            removed,
            kib = removed_bytes / 1024,
            "periodic cleanup removed old temp files"
        );
    }
}
