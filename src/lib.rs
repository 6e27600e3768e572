//! # mashup
//!
//! Search a video platform for an artist, pull the top N results as audio, cut the first
//! Y seconds from each, and stitch the clips into one track.
//!
//! Two front ends share the same pipeline:
//! - the `mashup` binary writes the result to a file and exits;
//! - the `mashup-web` binary serves a form, runs each request as a background job, and
//!   mails the result as a zip archive.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mashup::{Config, MashupPipeline, validation::validate_cli_args};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let pipeline = MashupPipeline::from_config(&config)?;
//!
//! let args: Vec<String> = ["Test Artist", "11", "21", "mashup.mp3"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let request = validate_cli_args(&args)?;
//!
//! let artifact = pipeline.run_to_file(&request).await?;
//! println!("{} clips, {:?}", artifact.clip_count, artifact.duration);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Search-and-download backends
pub mod acquisition;
/// Web server
pub mod api;
/// PCM buffers and the encoder/decoder seam
pub mod audio;
/// Configuration types
pub mod config;
/// Zip packaging and mail
pub mod delivery;
/// Error types
pub mod error;
/// Background jobs for the web variant
pub mod jobs;
/// Acquire, trim, concatenate, export
pub mod pipeline;
/// Core types and events
pub mod types;
/// Request validation
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{
    AcquisitionError, DecodeError, DeliveryError, Error, ExportError, ProcessingError, Result,
    ValidationError,
};
pub use jobs::{JobHandle, JobRegistry, JobRunner};
pub use pipeline::MashupPipeline;
pub use types::{
    Event, JobId, JobOutcome, JobRecord, JobStatus, MashupArtifact, MashupRequest, OutputTarget,
};

/// Resolve when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Used as the web server's graceful-shutdown trigger.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolve when the process receives Ctrl+C.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
