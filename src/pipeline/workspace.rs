//! Per-run working directories

use crate::error::AcquisitionError;
use crate::types::JobId;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A run's private directory, `<work_dir>/<job id>/`
///
/// Everything a run downloads or produces for mailing lives here, so concurrent runs
/// never see each other's files and cleanup can remove the directory wholesale.
#[derive(Clone, Debug)]
pub struct RunWorkspace {
    id: JobId,
    dir: PathBuf,
}

impl RunWorkspace {
    /// Create the directory for `id` under `work_dir`
    pub async fn create(work_dir: &Path, id: JobId) -> Result<Self, AcquisitionError> {
        let dir = work_dir.join(id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AcquisitionError::WorkDir {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
        debug!(job_id = %id, ?dir, "created run directory");
        Ok(Self { id, dir })
    }

    /// Job this directory belongs to
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The directory itself
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file inside the directory
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}
