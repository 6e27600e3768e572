//! Core types for mashup

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::audio::PcmBuffer;

/// Unique identifier for a pipeline run
///
/// Also names the run's private working directory, so two runs never share files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a fresh random JobId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Where the finished mashup goes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OutputTarget {
    /// Write to this path (command line)
    File(PathBuf),
    /// Mail the archived mashup to this address (web)
    Email(String),
}

/// A validated mashup request
///
/// Only the validator constructs these, so every instance satisfies
/// `track_count > 10`, `clip_seconds > 20` and a non-empty trimmed query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MashupRequest {
    query: String,
    track_count: u32,
    clip_seconds: u32,
    target: OutputTarget,
}

impl MashupRequest {
    pub(crate) fn new(
        query: String,
        track_count: u32,
        clip_seconds: u32,
        target: OutputTarget,
    ) -> Self {
        Self {
            query,
            track_count,
            clip_seconds,
            target,
        }
    }

    /// Search term, trimmed
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of tracks to acquire (N)
    pub fn track_count(&self) -> u32 {
        self.track_count
    }

    /// Seconds kept from the start of each track (Y)
    pub fn clip_seconds(&self) -> u32 {
        self.clip_seconds
    }

    /// Length of each clip as a Duration
    pub fn clip_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.clip_seconds))
    }

    /// Output destination
    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Recipient address, for web requests
    pub fn recipient(&self) -> Option<&str> {
        match &self.target {
            OutputTarget::Email(address) => Some(address),
            OutputTarget::File(_) => None,
        }
    }
}

/// A downloaded audio file, tagged with its retrieval position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquiredTrack {
    /// Retrieval order, 0-based
    pub index: usize,
    /// Location inside the run directory
    pub path: PathBuf,
}

impl AcquiredTrack {
    /// File name for logs, falling back to the full path
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// The first `clip_seconds` of one acquired track, decoded into memory
#[derive(Clone, Debug)]
pub struct TrimmedClip {
    /// Retrieval position of the source track
    pub source_index: usize,
    /// The source file
    pub source: PathBuf,
    /// Decoded audio, already truncated
    pub pcm: PcmBuffer,
}

impl TrimmedClip {
    /// Playback length of the clip
    pub fn duration(&self) -> Duration {
        self.pcm.duration()
    }
}

/// The encoded mashup on disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MashupArtifact {
    /// Encoded output file
    pub path: PathBuf,
    /// Number of clips stitched together
    pub clip_count: usize,
    /// Total playback length
    pub duration: Duration,
}

/// Single-entry zip archive wrapping a [`MashupArtifact`] for mailing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryPackage {
    /// Archive path
    pub path: PathBuf,
    /// Name of the single entry inside the archive
    pub entry_name: String,
}

impl DeliveryPackage {
    /// File name of the archive, used as the attachment name
    pub fn file_name(&self) -> String {
        file_name_or(&self.path, "mashup.zip")
    }
}

/// Terminal state of a job, handed to the notifier exactly once
#[derive(Clone, Debug)]
pub enum JobOutcome {
    /// The mashup was exported
    Completed(MashupArtifact),
    /// The run stopped at a fatal error
    Failed {
        /// Machine-readable code (see [`crate::Error::error_code`])
        code: &'static str,
        /// Human-readable description
        message: String,
    },
}

impl JobOutcome {
    /// Build a failed outcome from a pipeline error
    pub fn from_error(error: &crate::Error) -> Self {
        JobOutcome::Failed {
            code: error.error_code(),
            message: error.to_string(),
        }
    }

    /// Whether the run produced an artifact
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }

    /// Error description for failed runs
    pub fn error(&self) -> Option<&str> {
        match self {
            JobOutcome::Completed(_) => None,
            JobOutcome::Failed { message, .. } => Some(message),
        }
    }

    /// The artifact for successful runs
    pub fn artifact(&self) -> Option<&MashupArtifact> {
        match self {
            JobOutcome::Completed(artifact) => Some(artifact),
            JobOutcome::Failed { .. } => None,
        }
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, task not yet started
    Queued,
    /// Pipeline in progress
    Running,
    /// Mashup exported (notification may still be in flight)
    Succeeded,
    /// Pipeline stopped at a fatal error, or the exported mashup could not be packaged
    /// for delivery (error code `packaging_failed`, after a `Succeeded` moment)
    Failed,
}

/// Point-in-time view of a job, served by `GET /jobs/:id`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job ID
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Search term
    pub query: String,
    /// Tracks requested
    pub track_count: u32,
    /// Seconds per clip
    pub clip_seconds: u32,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When the pipeline reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Error code for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error description for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Request accepted and job created
    JobQueued {
        /// Job ID
        id: JobId,
        /// Search term
        query: String,
    },

    /// Background task started the pipeline
    JobStarted {
        /// Job ID
        id: JobId,
    },

    /// Download finished and the batch was selected
    TracksAcquired {
        /// Job ID
        id: JobId,
        /// Number of tracks in the batch
        count: usize,
    },

    /// A track failed to decode and was left out
    ClipSkipped {
        /// Job ID
        id: JobId,
        /// Source file
        path: PathBuf,
        /// Decoder error
        error: String,
    },

    /// Mashup exported
    JobCompleted {
        /// Job ID
        id: JobId,
        /// Number of clips in the mashup
        clip_count: usize,
        /// Total length in seconds
        duration_secs: f64,
    },

    /// Pipeline stopped at a fatal error
    JobFailed {
        /// Job ID
        id: JobId,
        /// Machine-readable error code
        code: String,
        /// Error description
        error: String,
    },

    /// Result mail handed to the relay
    NotificationSent {
        /// Job ID
        id: JobId,
        /// Whether the mail carried the mashup or a failure notice
        success: bool,
    },

    /// Result mail could not be delivered and was dropped
    NotificationDropped {
        /// Job ID
        id: JobId,
        /// Delivery error
        error: String,
    },
}

pub(crate) fn file_name_or(path: &Path, fallback: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}
