//! Web mashup generator
//!
//! Serves the request form and mails each finished mashup as a zip archive.
//!
//! **Usage:**
//! ```bash
//! MASHUP_SMTP_USERNAME=... MASHUP_SMTP_PASSWORD=... mashup-web [--config <file>] [--bind <addr>]
//! ```

use clap::Parser;
use mashup::delivery::{Notifier, SmtpMailer};
use mashup::{Config, JobRunner, MashupPipeline, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Serve the mashup request form
#[derive(Parser, Debug)]
#[command(name = "mashup-web", version)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "FILE", env = "MASHUP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "mashup-web exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.api.bind_address = bind;
    }
    config.validate_for_delivery()?;

    let mailer = SmtpMailer::from_config(&config.smtp)?;
    let pipeline = MashupPipeline::from_config(&config)?;
    let notifier = Notifier::new(
        std::sync::Arc::new(mailer),
        config.workspace.archive_name.clone(),
    );
    let runner = JobRunner::new(pipeline, notifier, config.workspace.output_name.clone())
        .with_job_retention(config.api.job_retention());

    info!(
        work_dir = ?config.workspace.work_dir,
        smtp_host = %config.smtp.host,
        "mashup-web configured"
    );

    mashup::api::start_api_server(runner, &config.api).await
}
