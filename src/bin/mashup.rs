//! Command-line mashup generator
//!
//! **Usage:**
//! ```bash
//! mashup [--config <file>] [--work-dir <dir>] <SingerName> <NumberOfVideos> <AudioDuration> <OutputFileName>
//! ```
//!
//! Prints `Mashup created successfully: <OutputFileName>` and exits 0, or prints the
//! reason and exits 1.

use clap::Parser;
use mashup::error::{AcquisitionError, ProcessingError};
use mashup::validation::{cli_message, validate_cli_args};
use mashup::{Config, Error, Event, MashupArtifact, MashupPipeline, MashupRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Build a single audio mashup from the top search results for an artist
#[derive(Parser, Debug)]
#[command(name = "mashup", version)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "FILE", env = "MASHUP_CONFIG")]
    config: Option<PathBuf>,

    /// Parent directory for per-run download folders
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// <SingerName> <NumberOfVideos> <AudioDuration> <OutputFileName>
    #[arg(value_name = "ARGS", allow_negative_numbers = true)]
    positional: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let informational = !e.use_stderr();
            e.print().ok();
            return if informational {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    let request = match validate_cli_args(&args.positional) {
        Ok(request) => request,
        Err(e) => {
            println!("{}", cli_message(&e));
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            println!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (event_tx, event_rx) = broadcast::channel(1000);
    let result = runtime.block_on(async {
        let printer = tokio::spawn(report_skipped(event_rx, |line| println!("{}", line)));
        // The pipeline owns the only sender; dropping it ends the printer
        let result = run(args, &request, event_tx).await;
        printer.await.ok();
        result
    });

    match result {
        Ok(artifact) => {
            debug!(clips = artifact.clip_count, duration = ?artifact.duration, "mashup written");
            println!("Mashup created successfully: {}", artifact.path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(
    args: Args,
    request: &MashupRequest,
    event_tx: broadcast::Sender<Event>,
) -> mashup::Result<MashupArtifact> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.work_dir {
        config.workspace.work_dir = dir;
    }
    let pipeline = MashupPipeline::from_config(&config)?.with_events(event_tx);
    pipeline.run_to_file(request).await
}

/// Print a line for every skipped clip until the channel closes
///
/// Returns how many lines were emitted. A lagging receiver keeps going with the
/// events still buffered.
async fn report_skipped(
    mut events: broadcast::Receiver<Event>,
    mut emit: impl FnMut(String),
) -> usize {
    let mut emitted = 0;
    loop {
        match events.recv().await {
            Ok(Event::ClipSkipped { path, error, .. }) => {
                emit(format!("Error processing {}: {}", path.display(), error));
                emitted += 1;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "event printer fell behind, some skipped clips were not reported");
            }
            Err(RecvError::Closed) => break,
        }
    }
    emitted
}

/// Message printed for a failed run
fn failure_message(error: &Error) -> String {
    match error {
        Error::Acquisition(AcquisitionError::InsufficientResults { found, required }) => format!(
            "Error: Only {} files downloaded, but {} required.",
            found, required
        ),
        Error::Acquisition(e @ (AcquisitionError::Failed { .. } | AcquisitionError::Spawn { .. })) => {
            format!("Network error during download: {}", e)
        }
        Error::Processing(ProcessingError::NoUsableClips { .. }) => {
            "No valid audio files to process.".to_string()
        }
        other => format!("Error: {}", other),
    }
}
