//! yt-dlp backed media source

use super::{AUDIO_EXTENSION, MediaSource, list_audio_files};
use crate::error::AcquisitionError;
use crate::types::AcquiredTrack;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Media source that runs the external `yt-dlp` binary
///
/// One invocation searches for the top `count` results, downloads the best audio
/// stream of each (no playlists, no video) and converts it to mp3 named
/// `<title>.mp3` inside the destination directory. yt-dlp prints each final file
/// path, which attributes files to this run in retrieval order.
pub struct YtDlpSource {
    binary_path: PathBuf,
    ignore_errors: bool,
}

impl YtDlpSource {
    /// Create a source with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ignore_errors: false,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Tolerate individual download failures as long as some files were produced
    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Path of the binary this source runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn args(&self, query: &str, count: usize, dest: &Path) -> Vec<String> {
        let template = dest.join("%(title)s.%(ext)s");
        let mut args = vec![
            format!("ytsearch{}:{}", count, query),
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--no-playlist".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            AUDIO_EXTENSION.to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
        ];
        if self.ignore_errors {
            args.push("--ignore-errors".to_string());
        }
        args
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn fetch(
        &self,
        query: &str,
        count: usize,
        dest: &Path,
    ) -> Result<Vec<AcquiredTrack>, AcquisitionError> {
        let output = Command::new(&self.binary_path)
            .args(self.args(query, count, dest))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AcquisitionError::Spawn {
                tool: "yt-dlp".to_string(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut tracks = printed_tracks(&stdout, dest);
        if tracks.is_empty() {
            debug!(?dest, "yt-dlp printed no paths, listing run directory");
            tracks = list_audio_files(dest).await?;
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !(self.ignore_errors && !tracks.is_empty()) {
                return Err(AcquisitionError::Failed {
                    code: output.status.code(),
                    stderr,
                });
            }
            warn!(
                code = ?output.status.code(),
                downloaded = tracks.len(),
                error = %stderr,
                "yt-dlp reported errors, continuing with downloaded files"
            );
        }

        Ok(tracks)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Turn yt-dlp's printed file paths into tracks
///
/// Lines that do not name an existing file under `dest` are ignored, as are repeats.
fn printed_tracks(stdout: &str, dest: &Path) -> Vec<AcquiredTrack> {
    let mut seen = HashSet::new();
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .filter(|path| path.starts_with(dest) && path.is_file())
        .filter(|path| seen.insert(path.clone()))
        .enumerate()
        .map(|(index, path)| AcquiredTrack { index, path })
        .collect()
}
