//! ffmpeg-backed codec using the external `ffmpeg` binary

use super::{AudioCodec, PcmBuffer, PcmFormat};
use crate::error::{DecodeError, ExportError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Codec that shells out to `ffmpeg`
///
/// Decoding pipes raw `s16le` PCM out of ffmpeg's stdout; encoding pipes it back in
/// through stdin and lets ffmpeg pick the container from the output extension.
///
/// # Examples
///
/// ```no_run
/// use mashup::audio::{AudioCodec, FfmpegCodec, PcmFormat};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = FfmpegCodec::from_path(PcmFormat::default(), "192k")
///     .expect("ffmpeg not found in PATH");
/// let pcm = codec.decode(Path::new("track.mp3"), None).await?;
/// codec.encode(&pcm, Path::new("copy.mp3")).await?;
/// # Ok(())
/// # }
/// ```
pub struct FfmpegCodec {
    binary_path: PathBuf,
    format: PcmFormat,
    bitrate: String,
}

impl FfmpegCodec {
    /// Create a codec with an explicit binary path
    pub fn new(binary_path: PathBuf, format: PcmFormat, bitrate: impl Into<String>) -> Self {
        Self {
            binary_path,
            format,
            bitrate: bitrate.into(),
        }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path(format: PcmFormat, bitrate: impl Into<String>) -> Option<Self> {
        which::which("ffmpeg")
            .ok()
            .map(|path| Self::new(path, format, bitrate))
    }

    /// Path of the binary this codec runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn decode_args(&self, path: &Path, limit: Option<Duration>) -> Vec<String> {
        let mut args = vec![
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        if let Some(limit) = limit {
            args.push("-t".to_string());
            args.push(format!("{:.3}", limit.as_secs_f64()));
        }
        args.extend(self.raw_pcm_args());
        args.push("-".to_string());
        args
    }

    fn encode_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
        ];
        args.extend(self.raw_pcm_args());
        args.extend([
            "-i".to_string(),
            "-".to_string(),
            "-b:a".to_string(),
            self.bitrate.clone(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }

    fn raw_pcm_args(&self) -> [String; 8] {
        [
            "-f".to_string(),
            "s16le".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            self.format.sample_rate.to_string(),
            "-ac".to_string(),
            self.format.channels.to_string(),
        ]
    }
}

#[async_trait]
impl AudioCodec for FfmpegCodec {
    async fn decode(&self, path: &Path, limit: Option<Duration>) -> Result<PcmBuffer, DecodeError> {
        let output = Command::new(&self.binary_path)
            .args(self.decode_args(path, limit))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DecodeError {
                path: path.to_path_buf(),
                reason: format!("failed to execute ffmpeg: {}", e),
            })?;

        if !output.status.success() {
            return Err(DecodeError {
                path: path.to_path_buf(),
                reason: stderr_or_status(&output.stderr, output.status.code()),
            });
        }

        let pcm = PcmBuffer::from_le_bytes(self.format, &output.stdout);
        if pcm.is_empty() {
            return Err(DecodeError {
                path: path.to_path_buf(),
                reason: "no audio samples decoded".to_string(),
            });
        }

        debug!(?path, frames = pcm.frames(), "decoded source");
        Ok(pcm)
    }

    async fn encode(&self, pcm: &PcmBuffer, output: &Path) -> Result<(), ExportError> {
        if pcm.format() != self.format {
            return Err(ExportError::Encode {
                path: output.to_path_buf(),
                reason: format!("buffer is {}, encoder expects {}", pcm.format(), self.format),
            });
        }

        let mut child = Command::new(&self.binary_path)
            .args(self.encode_args(output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::EncoderUnavailable(format!("failed to execute ffmpeg: {}", e)))?;

        let mut stdin = child.stdin.take().ok_or_else(|| ExportError::Encode {
            path: output.to_path_buf(),
            reason: "ffmpeg stdin unavailable".to_string(),
        })?;

        // Feed stdin from a separate task so a full stderr pipe cannot stall the writer
        let bytes = pcm.to_le_bytes();
        let writer = tokio::spawn(async move {
            stdin.write_all(&bytes).await?;
            stdin.shutdown().await
        });

        let result = child.wait_with_output().await.map_err(|e| ExportError::Encode {
            path: output.to_path_buf(),
            reason: format!("failed to wait for ffmpeg: {}", e),
        })?;

        if !result.status.success() {
            return Err(ExportError::Encode {
                path: output.to_path_buf(),
                reason: stderr_or_status(&result.stderr, result.status.code()),
            });
        }

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ExportError::Encode {
                    path: output.to_path_buf(),
                    reason: format!("failed to stream PCM to ffmpeg: {}", e),
                });
            }
            Err(e) => {
                return Err(ExportError::Encode {
                    path: output.to_path_buf(),
                    reason: format!("PCM writer task failed: {}", e),
                });
            }
        }

        debug!(?output, frames = pcm.frames(), "encoded mashup");
        Ok(())
    }

    fn format(&self) -> PcmFormat {
        self.format
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

fn stderr_or_status(stderr: &[u8], code: Option<i32>) -> String {
    let text = String::from_utf8_lossy(stderr).trim().to_string();
    if text.is_empty() {
        format!("ffmpeg exited with status {:?}", code)
    } else {
        text
    }
}
