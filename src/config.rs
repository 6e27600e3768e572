//! Configuration types for mashup
//!
//! Settings come from three layers, later layers winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `MASHUP_*` environment variables (a `.env` file in the working directory is honored)
//!
//! SMTP credentials are only ever read from the file or the environment.

use crate::audio::PcmFormat;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Working storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent of the per-run directories (default: "./downloads")
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// File name of the exported mashup for mailed jobs (default: "mashup.mp3")
    #[serde(default = "default_output_name")]
    pub output_name: String,

    /// File name of the delivery archive (default: "mashup.zip")
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            output_name: default_output_name(),
            archive_name: default_archive_name(),
        }
    }
}

/// External binaries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Keep going when individual search results fail to download (default: false)
    ///
    /// The run still fails if fewer tracks than requested end up on disk.
    #[serde(default)]
    pub ignore_errors: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            ignore_errors: false,
        }
    }
}

/// Decoded representation and output encoding
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate every source is resampled to (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Channel count every source is mixed to (default: 2)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Encoder bitrate for the exported mashup (default: "192k")
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bitrate: default_bitrate(),
        }
    }
}

impl AudioConfig {
    /// PCM layout used for every decoded clip
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Web server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// How long finished jobs stay queryable at `/jobs/:id`, in seconds (default: 3600)
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,
}

impl ApiConfig {
    /// Retention window for finished job records
    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            job_retention_secs: default_job_retention_secs(),
        }
    }
}

/// Outgoing mail relay
///
/// The relay is always reached with STARTTLS and credential authentication.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay host (default: "smtp.gmail.com")
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// Relay port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Login name
    #[serde(default)]
    pub username: Option<String>,

    /// Login password, never serialized back out
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Sender address (defaults to the login name)
    #[serde(default)]
    pub from: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from: None,
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .finish()
    }
}

impl SmtpConfig {
    /// Sender address: explicit `from`, else the login name
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }
}

/// Main configuration
///
/// Sections map one-to-one onto TOML tables:
/// - [`workspace`](WorkspaceConfig) - per-run directories and output names
/// - [`tools`](ToolsConfig) - yt-dlp and ffmpeg locations
/// - [`audio`](AudioConfig) - decode format and encoder bitrate
/// - [`api`](ApiConfig) - web server bind address
/// - [`smtp`](SmtpConfig) - mail relay and credentials
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Working storage settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// External binaries
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Decode format and encoder settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Web server settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Mail relay settings
    #[serde(default)]
    pub smtp: SmtpConfig,
}

impl Config {
    /// Load defaults, then `path` (if any), then the environment, and validate the result
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })
    }

    /// Overlay `MASHUP_*` variables resolved through `lookup`
    ///
    /// Recognized keys: `MASHUP_WORK_DIR`, `MASHUP_YT_DLP_PATH`, `MASHUP_FFMPEG_PATH`,
    /// `MASHUP_AUDIO_BITRATE`, `MASHUP_BIND_ADDRESS`, `MASHUP_JOB_RETENTION_SECS`, `MASHUP_SMTP_HOST`,
    /// `MASHUP_SMTP_PORT`, `MASHUP_SMTP_USERNAME`, `MASHUP_SMTP_PASSWORD`, `MASHUP_SMTP_FROM`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("MASHUP_WORK_DIR") {
            self.workspace.work_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("MASHUP_YT_DLP_PATH") {
            self.tools.yt_dlp_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("MASHUP_FFMPEG_PATH") {
            self.tools.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(bitrate) = lookup("MASHUP_AUDIO_BITRATE") {
            self.audio.bitrate = bitrate;
        }
        if let Some(addr) = lookup("MASHUP_BIND_ADDRESS") {
            self.api.bind_address = addr.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address {:?}: {}", addr, e),
                key: Some("api.bind_address".to_string()),
            })?;
        }
        if let Some(secs) = lookup("MASHUP_JOB_RETENTION_SECS") {
            self.api.job_retention_secs = secs.parse().map_err(|e| Error::Config {
                message: format!("invalid job retention {:?}: {}", secs, e),
                key: Some("api.job_retention_secs".to_string()),
            })?;
        }
        if let Some(host) = lookup("MASHUP_SMTP_HOST") {
            self.smtp.host = host;
        }
        if let Some(port) = lookup("MASHUP_SMTP_PORT") {
            self.smtp.port = port.parse().map_err(|e| Error::Config {
                message: format!("invalid SMTP port {:?}: {}", port, e),
                key: Some("smtp.port".to_string()),
            })?;
        }
        if let Some(username) = lookup("MASHUP_SMTP_USERNAME") {
            self.smtp.username = Some(username);
        }
        if let Some(password) = lookup("MASHUP_SMTP_PASSWORD") {
            self.smtp.password = Some(password);
        }
        if let Some(from) = lookup("MASHUP_SMTP_FROM") {
            self.smtp.from = Some(from);
        }
        Ok(())
    }

    /// Check settings every entry point needs
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(config_error("sample rate must be positive", "audio.sample_rate"));
        }
        if self.audio.channels == 0 {
            return Err(config_error("channel count must be positive", "audio.channels"));
        }
        if self.audio.bitrate.trim().is_empty() {
            return Err(config_error("bitrate must not be empty", "audio.bitrate"));
        }
        if self.workspace.output_name.trim().is_empty() {
            return Err(config_error(
                "output name must not be empty",
                "workspace.output_name",
            ));
        }
        if self.workspace.archive_name.trim().is_empty() {
            return Err(config_error(
                "archive name must not be empty",
                "workspace.archive_name",
            ));
        }
        Ok(())
    }

    /// Check the settings the mailing web variant additionally needs
    pub fn validate_for_delivery(&self) -> Result<()> {
        if self.smtp.username.as_deref().is_none_or(str::is_empty) {
            return Err(config_error(
                "SMTP username is required (set MASHUP_SMTP_USERNAME)",
                "smtp.username",
            ));
        }
        if self.smtp.password.as_deref().is_none_or(str::is_empty) {
            return Err(config_error(
                "SMTP password is required (set MASHUP_SMTP_PASSWORD)",
                "smtp.password",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_output_name() -> String {
    "mashup.mp3".to_string()
}

fn default_archive_name() -> String {
    "mashup.zip".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_channels() -> u16 {
    2
}

fn default_bitrate() -> String {
    "192k".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_job_retention_secs() -> u64 {
    3600
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}
