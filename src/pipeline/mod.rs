//! The mashup pipeline
//!
//! acquire → trim → concatenate → export, inside a per-run [`RunWorkspace`].
//!
//! [`MashupPipeline::run_to_file`] is the synchronous command-line path and cleans up
//! after itself. [`MashupPipeline::produce`] stops after export and after clearing the
//! downloaded tracks; the job runner calls it, mails the artifact, and then removes
//! the run directory with [`cleanup::cleanup_run`].

use crate::acquisition::{self, MediaSource, YtDlpSource};
use crate::audio::{AudioCodec, FfmpegCodec};
use crate::config::Config;
use crate::error::{AcquisitionError, ExportError, Result};
use crate::types::{Event, JobId, MashupArtifact, MashupRequest, OutputTarget};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub mod cleanup;
pub mod concat;
pub mod trim;
mod workspace;

pub use cleanup::CleanupReport;
pub use trim::TrimReport;
pub use workspace::RunWorkspace;

/// Orchestrates one mashup run over pluggable source and codec backends
pub struct MashupPipeline {
    source: Arc<dyn MediaSource>,
    codec: Arc<dyn AudioCodec>,
    work_dir: PathBuf,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl MashupPipeline {
    /// Create a pipeline writing run directories under `work_dir`
    pub fn new(
        source: Arc<dyn MediaSource>,
        codec: Arc<dyn AudioCodec>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            codec,
            work_dir: work_dir.into(),
            event_tx: None,
        }
    }

    /// Build the production pipeline (yt-dlp + ffmpeg) from configuration
    ///
    /// Explicit tool paths win; otherwise PATH is searched if `tools.search_path` is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let tools = &config.tools;

        let yt_dlp = resolve_binary(tools.yt_dlp_path.as_ref(), "yt-dlp", tools.search_path)
            .ok_or_else(|| AcquisitionError::ToolNotFound {
                tool: "yt-dlp".to_string(),
            })?;
        let ffmpeg = resolve_binary(tools.ffmpeg_path.as_ref(), "ffmpeg", tools.search_path)
            .ok_or_else(|| {
                ExportError::EncoderUnavailable(
                    "ffmpeg not found (set its path in the configuration or install it on PATH)"
                        .to_string(),
                )
            })?;

        let source = YtDlpSource::new(yt_dlp).with_ignore_errors(tools.ignore_errors);
        let codec = FfmpegCodec::new(
            ffmpeg,
            config.audio.pcm_format(),
            config.audio.bitrate.clone(),
        );

        Ok(Self::new(
            Arc::new(source),
            Arc::new(codec),
            config.workspace.work_dir.clone(),
        ))
    }

    /// Publish stage events on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Parent of the per-run directories
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Create the private directory for run `id`
    pub async fn create_workspace(&self, id: JobId) -> Result<RunWorkspace> {
        Ok(RunWorkspace::create(&self.work_dir, id).await?)
    }

    /// Run the whole pipeline for a file-target request and clean up afterwards
    ///
    /// The run directory is removed whatever the outcome.
    pub async fn run_to_file(&self, request: &MashupRequest) -> Result<MashupArtifact> {
        let output = match request.target() {
            OutputTarget::File(path) => path.clone(),
            OutputTarget::Email(_) => {
                return Err(crate::Error::Config {
                    message: "run_to_file needs a file target".to_string(),
                    key: None,
                });
            }
        };

        let workspace = self.create_workspace(JobId::new()).await?;
        let result = self.produce(&workspace, request, &output).await;
        cleanup::cleanup_run(&workspace, &[]).await;
        result
    }

    /// Acquire, trim, concatenate and export into `output`
    ///
    /// Downloaded tracks are removed from the run directory before returning, whether
    /// or not export succeeded. `output` itself is kept.
    pub async fn produce(
        &self,
        workspace: &RunWorkspace,
        request: &MashupRequest,
        output: &Path,
    ) -> Result<MashupArtifact> {
        let id = workspace.id();
        info!(
            job_id = %id,
            query = request.query(),
            track_count = request.track_count(),
            clip_seconds = request.clip_seconds(),
            "starting mashup"
        );

        let result = self.produce_inner(workspace, request, output).await;

        cleanup::clear_downloads(workspace, &[output]).await;

        if let Err(e) = &result {
            warn!(job_id = %id, code = e.error_code(), error = %e, "mashup failed");
        }
        result
    }

    async fn produce_inner(
        &self,
        workspace: &RunWorkspace,
        request: &MashupRequest,
        output: &Path,
    ) -> Result<MashupArtifact> {
        let id = workspace.id();
        let count = request.track_count() as usize;

        let tracks =
            acquisition::acquire(self.source.as_ref(), request.query(), count, workspace.dir())
                .await?;
        self.emit(Event::TracksAcquired {
            id,
            count: tracks.len(),
        });

        let report =
            trim::trim_and_collect(self.codec.as_ref(), &tracks, request.clip_duration()).await;
        for skipped in &report.skipped {
            self.emit(Event::ClipSkipped {
                id,
                path: skipped.path.clone(),
                error: skipped.reason.clone(),
            });
        }
        let clips = report.into_clips()?;
        info!(job_id = %id, clips = clips.len(), acquired = tracks.len(), "clips ready");

        let joined = concat::concatenate(&clips)?;
        let clip_count = clips.len();
        drop(clips);

        Ok(concat::export(self.codec.as_ref(), &joined, clip_count, output).await?)
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            tx.send(event).ok();
        }
    }
}

fn resolve_binary(explicit: Option<&PathBuf>, name: &str, search_path: bool) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.clone()),
        None if search_path => which::which(name).ok(),
        None => None,
    }
}
