//! Media acquisition
//!
//! A [`MediaSource`] turns "top N results for a query" into audio files inside a
//! run directory. [`acquire`] wraps a source with the batch rule shared by every
//! backend: keep the first N files in retrieval order, and fail the whole run if
//! fewer than N arrived.

use crate::error::AcquisitionError;
use crate::types::AcquiredTrack;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

mod ytdlp;

pub use ytdlp::YtDlpSource;

/// Container every acquired file is converted to
pub const AUDIO_EXTENSION: &str = "mp3";

/// Search-and-download backend
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Download up to `count` audio tracks matching `query` into `dest`
    ///
    /// Returned tracks are in retrieval order and must all live under `dest`.
    /// Returning fewer than `count` is allowed; [`acquire`] decides what that means.
    async fn fetch(
        &self,
        query: &str,
        count: usize,
        dest: &Path,
    ) -> Result<Vec<AcquiredTrack>, AcquisitionError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Fetch a batch of exactly `count` tracks
///
/// Extra files beyond `count` are left in `dest` for cleanup but not used.
pub async fn acquire(
    source: &dyn MediaSource,
    query: &str,
    count: usize,
    dest: &Path,
) -> Result<Vec<AcquiredTrack>, AcquisitionError> {
    debug!(source = source.name(), query, count, ?dest, "acquiring tracks");

    let tracks = source.fetch(query, count, dest).await?;
    let batch = select_batch(tracks, count)?;

    info!(source = source.name(), count = batch.len(), "tracks acquired");
    Ok(batch)
}

/// Keep the first `count` tracks, renumbered 0..count in their existing order
pub fn select_batch(
    mut tracks: Vec<AcquiredTrack>,
    count: usize,
) -> Result<Vec<AcquiredTrack>, AcquisitionError> {
    if tracks.len() < count {
        return Err(AcquisitionError::InsufficientResults {
            found: tracks.len(),
            required: count,
        });
    }
    tracks.truncate(count);
    for (index, track) in tracks.iter_mut().enumerate() {
        track.index = index;
    }
    Ok(tracks)
}

/// List audio files directly inside `dir`, sorted by file name
pub(crate) async fn list_audio_files(dir: &Path) -> Result<Vec<AcquiredTrack>, AcquisitionError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| AcquisitionError::WorkDir {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut paths = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(AUDIO_EXTENSION))
        {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| AcquiredTrack { index, path })
        .collect())
}
