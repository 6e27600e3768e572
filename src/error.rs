//! Error types for mashup
//!
//! Errors follow the pipeline stages:
//! - [`ValidationError`] - bad input, raised before any I/O
//! - [`AcquisitionError`] - search/download failures and short result sets
//! - [`ProcessingError`] - nothing usable survived trimming
//! - [`ExportError`] - the encoded mashup could not be written
//! - [`DeliveryError`] - packaging or mailing failed (logged and dropped, never propagated)
//!
//! [`DecodeError`] is the only recoverable kind: a single source that fails to decode is
//! skipped and the run continues.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mashup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mashup
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "smtp.username")
        key: Option<String>,
    },

    /// User input rejected by the validator
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Search or download failed
    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// Trimming produced nothing usable
    #[error("processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// Writing the final mashup failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Machine-readable error code, stable across releases
    ///
    /// Used in job records, lifecycle events and structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Acquisition(AcquisitionError::InsufficientResults { .. }) => {
                "insufficient_results"
            }
            Error::Acquisition(AcquisitionError::ToolNotFound { .. }) => "tool_not_found",
            Error::Acquisition(_) => "acquisition_failed",
            Error::Processing(ProcessingError::NoUsableClips { .. }) => "no_usable_clips",
            Error::Processing(ProcessingError::FormatMismatch { .. }) => "format_mismatch",
            Error::Export(_) => "export_failed",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

/// Which request field failed validation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// Search term (`singer` on the web form)
    Query,
    /// Number of tracks to fetch (`n`)
    TrackCount,
    /// Seconds kept from each track (`y`)
    ClipSeconds,
    /// Recipient email address (`email`)
    Recipient,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Query => "query",
            Field::TrackCount => "track count",
            Field::ClipSeconds => "clip seconds",
            Field::Recipient => "recipient",
        };
        f.write_str(name)
    }
}

/// Input validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The command line had the wrong number of positional arguments
    #[error("expected {expected} arguments, got {actual}")]
    WrongArgumentCount {
        /// Number of positional arguments required
        expected: usize,
        /// Number of positional arguments supplied
        actual: usize,
    },

    /// A form field was absent or blank
    #[error("{field} is required")]
    MissingField {
        /// The missing field
        field: Field,
    },

    /// The search term was empty after trimming
    #[error("query must not be empty")]
    EmptyQuery,

    /// Track count was not an integer above the minimum
    #[error("track count must be an integer > {min}, got {value:?}")]
    InvalidTrackCount {
        /// The raw value supplied
        value: String,
        /// Exclusive lower bound
        min: u32,
    },

    /// Clip length was not an integer above the minimum
    #[error("clip seconds must be an integer > {min}, got {value:?}")]
    InvalidClipSeconds {
        /// The raw value supplied
        value: String,
        /// Exclusive lower bound
        min: u32,
    },

    /// Recipient does not look like an email address
    #[error("invalid email address {value:?}")]
    InvalidEmail {
        /// The raw value supplied
        value: String,
    },
}

impl ValidationError {
    /// The field this error refers to, if any
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::WrongArgumentCount { .. } => None,
            ValidationError::MissingField { field } => Some(*field),
            ValidationError::EmptyQuery => Some(Field::Query),
            ValidationError::InvalidTrackCount { .. } => Some(Field::TrackCount),
            ValidationError::InvalidClipSeconds { .. } => Some(Field::ClipSeconds),
            ValidationError::InvalidEmail { .. } => Some(Field::Recipient),
        }
    }
}

/// Search/download errors
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The download engine binary could not be located
    #[error("{tool} not found (set its path in the configuration or install it on PATH)")]
    ToolNotFound {
        /// Name of the missing binary
        tool: String,
    },

    /// The download engine could not be started
    #[error("failed to run {tool}: {reason}")]
    Spawn {
        /// Name of the binary
        tool: String,
        /// Underlying error
        reason: String,
    },

    /// The download engine ran but reported failure
    #[error("download failed (exit code {code:?}): {stderr}")]
    Failed {
        /// Process exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// Fewer tracks than requested were produced
    #[error("only {found} files downloaded, but {required} required")]
    InsufficientResults {
        /// Number of files produced by this run
        found: usize,
        /// Number of files requested
        required: usize,
    },

    /// The run directory could not be prepared or read
    #[error("working directory {path} unavailable: {reason}")]
    WorkDir {
        /// The directory
        path: PathBuf,
        /// Underlying error
        reason: String,
    },
}

/// A single source failed to decode; the file is skipped
#[derive(Debug, Clone, Error)]
#[error("failed to decode {path}: {reason}")]
pub struct DecodeError {
    /// The source file
    pub path: PathBuf,
    /// Decoder output or I/O error
    pub reason: String,
}

/// Errors after acquisition but before export
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Every acquired track failed to decode
    #[error("no usable clips ({attempted} tracks attempted, all failed to decode)")]
    NoUsableClips {
        /// Number of tracks that were attempted
        attempted: usize,
    },

    /// A clip's PCM layout differs from the first clip's
    #[error("clip {index} has format {found}, expected {expected}")]
    FormatMismatch {
        /// Position of the offending clip
        index: usize,
        /// Format of the first clip
        expected: String,
        /// Format of the offending clip
        found: String,
    },
}

/// Errors writing the final mashup
#[derive(Debug, Error)]
pub enum ExportError {
    /// The encoder binary could not be located or started
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// The encoder ran but failed
    #[error("failed to encode {path}: {reason}")]
    Encode {
        /// Output path
        path: PathBuf,
        /// Encoder output or pipe error
        reason: String,
    },

    /// The output location could not be prepared
    #[error("cannot write {path}: {source}")]
    Io {
        /// Output path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Packaging and mail transport errors
///
/// These never propagate past the notifier: the requester has already received
/// their acknowledgment, so a failed delivery is logged and dropped.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Creating the zip archive failed
    #[error("failed to package {path}: {reason}")]
    Package {
        /// The artifact being packaged
        path: PathBuf,
        /// Underlying error
        reason: String,
    },

    /// The email could not be built (bad address, bad header)
    #[error("failed to build message: {0}")]
    Message(String),

    /// The SMTP relay rejected or could not be reached
    #[error("failed to send message: {0}")]
    Transport(String),
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_distinguish_failure_stages() {
        let cases: Vec<(Error, &str)> = vec![
            (
                Error::Config {
                    message: "missing".into(),
                    key: Some("smtp.username".into()),
                },
                "config_error",
            ),
            (Error::Validation(ValidationError::EmptyQuery), "validation_error"),
            (
                Error::Acquisition(AcquisitionError::InsufficientResults {
                    found: 3,
                    required: 11,
                }),
                "insufficient_results",
            ),
            (
                Error::Acquisition(AcquisitionError::ToolNotFound {
                    tool: "yt-dlp".into(),
                }),
                "tool_not_found",
            ),
            (
                Error::Acquisition(AcquisitionError::Failed {
                    code: Some(1),
                    stderr: "HTTP Error 429".into(),
                }),
                "acquisition_failed",
            ),
            (
                Error::Processing(ProcessingError::NoUsableClips { attempted: 11 }),
                "no_usable_clips",
            ),
            (
                Error::Export(ExportError::EncoderUnavailable("ffmpeg".into())),
                "export_failed",
            ),
            (Error::Io(std::io::Error::other("disk")), "io_error"),
        ];

        for (error, code) in cases {
            assert_eq!(error.error_code(), code, "wrong code for {error}");
        }
    }

    #[test]
    fn insufficient_results_message_names_both_counts() {
        let err = AcquisitionError::InsufficientResults {
            found: 4,
            required: 12,
        };
        assert_eq!(err.to_string(), "only 4 files downloaded, but 12 required");
    }

    #[test]
    fn validation_errors_report_their_field() {
        assert_eq!(ValidationError::EmptyQuery.field(), Some(Field::Query));
        assert_eq!(
            ValidationError::InvalidEmail {
                value: "x".into()
            }
            .field(),
            Some(Field::Recipient)
        );
        assert_eq!(
            ValidationError::WrongArgumentCount {
                expected: 4,
                actual: 2
            }
            .field(),
            None
        );
    }

    #[test]
    fn validation_error_displays_without_stage_prefix() {
        let err: Error = ValidationError::MissingField {
            field: Field::Recipient,
        }
        .into();
        assert_eq!(err.to_string(), "recipient is required");
    }
}
