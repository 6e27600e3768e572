//! Best-effort removal of run files
//!
//! Nothing here returns an error: failures are logged as warnings and counted.

use super::RunWorkspace;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a cleanup pass did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files and directories removed
    pub removed: usize,
    /// Removals that failed (including already-missing files)
    pub failed: usize,
}

impl CleanupReport {
    fn merge(&mut self, other: CleanupReport) {
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// Remove every file in the run directory except those listed in `keep`
///
/// Used right after export: the acquired tracks (and any partial downloads) go,
/// the exported mashup stays for delivery.
pub async fn clear_downloads(workspace: &RunWorkspace, keep: &[&Path]) -> CleanupReport {
    let mut report = CleanupReport::default();

    let mut entries = match tokio::fs::read_dir(workspace.dir()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(job_id = %workspace.id(), dir = ?workspace.dir(), error = %e, "failed to read run directory during cleanup");
            report.failed += 1;
            return report;
        }
    };

    let mut targets = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && !keep.iter().any(|k| *k == path.as_path()) {
            targets.push(path);
        }
    }

    report.merge(remove_files(workspace, &targets).await);
    debug!(
        job_id = %workspace.id(),
        removed = report.removed,
        failed = report.failed,
        "cleared downloaded tracks"
    );
    report
}

/// Remove `files`, then the run directory and whatever is left in it
pub async fn cleanup_run(workspace: &RunWorkspace, files: &[PathBuf]) -> CleanupReport {
    let mut report = remove_files(workspace, files).await;

    match tokio::fs::remove_dir_all(workspace.dir()).await {
        Ok(()) => report.removed += 1,
        Err(e) => {
            warn!(job_id = %workspace.id(), dir = ?workspace.dir(), error = %e, "failed to remove run directory");
            report.failed += 1;
        }
    }

    info!(
        job_id = %workspace.id(),
        removed = report.removed,
        failed = report.failed,
        "cleanup complete"
    );
    report
}

async fn remove_files(workspace: &RunWorkspace, files: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();
    for file in files {
        match tokio::fs::remove_file(file).await {
            Ok(()) => {
                debug!(job_id = %workspace.id(), ?file, "deleted file");
                report.removed += 1;
            }
            Err(e) => {
                warn!(job_id = %workspace.id(), ?file, error = %e, "failed to delete file");
                report.failed += 1;
            }
        }
    }
    report
}
