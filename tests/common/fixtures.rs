//! Fake backends that drive the pipeline without network access or binaries
//!
//! `FakeSource` writes one small text file per track describing the audio it stands
//! for; `FakeCodec` decodes that description into a tone whose samples carry the
//! track number, so tests can check both clip lengths and ordering.

use async_trait::async_trait;
use mashup::acquisition::MediaSource;
use mashup::audio::{AudioCodec, PcmBuffer, PcmFormat};
use mashup::delivery::{Mailer, OutgoingMail};
use mashup::error::{AcquisitionError, DecodeError, DeliveryError, ExportError};
use mashup::types::AcquiredTrack;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// 100 Hz mono keeps buffers small
pub const TEST_FORMAT: PcmFormat = PcmFormat {
    sample_rate: 100,
    channels: 1,
};

/// What a fake track decodes to
#[derive(Clone, Copy, Debug)]
pub enum FakeTrack {
    /// A decodable track of this many seconds
    Audio(u32),
    /// A file the decoder rejects
    Corrupt,
}

/// Search backend that writes `tracks` into the destination directory
pub struct FakeSource {
    tracks: Vec<FakeTrack>,
    fail_with: Option<String>,
    calls: Mutex<usize>,
}

impl FakeSource {
    /// Source returning `tracks` (capped at the requested count)
    pub fn new(tracks: Vec<FakeTrack>) -> Self {
        Self {
            tracks,
            fail_with: None,
            calls: Mutex::new(0),
        }
    }

    /// `count` decodable tracks of `seconds` each
    pub fn uniform(count: usize, seconds: u32) -> Self {
        Self::new(vec![FakeTrack::Audio(seconds); count])
    }

    /// Source whose download engine fails after writing its tracks
    pub fn failing(tracks: Vec<FakeTrack>, stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            ..Self::new(tracks)
        }
    }

    /// Number of `fetch` calls
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    async fn fetch(
        &self,
        _query: &str,
        count: usize,
        dest: &Path,
    ) -> Result<Vec<AcquiredTrack>, AcquisitionError> {
        *self.calls.lock().unwrap() += 1;

        let mut acquired = Vec::new();
        for (index, track) in self.tracks.iter().take(count).enumerate() {
            let path = dest.join(format!("Track {:02}.mp3", index));
            let body = match track {
                FakeTrack::Audio(seconds) => format!("audio {} {}", index + 1, seconds),
                FakeTrack::Corrupt => "corrupt".to_string(),
            };
            tokio::fs::write(&path, body).await.unwrap();
            acquired.push(AcquiredTrack { index, path });
        }

        if let Some(stderr) = &self.fail_with {
            return Err(AcquisitionError::Failed {
                code: Some(1),
                stderr: stderr.clone(),
            });
        }
        Ok(acquired)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Codec that understands `FakeSource` files and records what it encodes
#[derive(Default)]
pub struct FakeCodec {
    encoded: Mutex<Vec<PcmBuffer>>,
}

impl FakeCodec {
    /// Buffers handed to `encode`, in call order
    pub fn encoded(&self) -> Vec<PcmBuffer> {
        self.encoded.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioCodec for FakeCodec {
    async fn decode(&self, path: &Path, _limit: Option<Duration>) -> Result<PcmBuffer, DecodeError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| decode_error(path, e.to_string()))?;

        let mut parts = text.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("audio"), Some(marker), Some(seconds)) => {
                let marker: i16 = marker.parse().unwrap();
                let seconds: usize = seconds.parse().unwrap();
                let frames = seconds * TEST_FORMAT.sample_rate as usize;
                Ok(PcmBuffer::new(TEST_FORMAT, vec![marker; frames]))
            }
            _ => Err(decode_error(path, "invalid data found when processing input".into())),
        }
    }

    async fn encode(&self, pcm: &PcmBuffer, output: &Path) -> Result<(), ExportError> {
        tokio::fs::write(output, format!("frames {}", pcm.frames()))
            .await
            .map_err(|e| ExportError::Io {
                path: output.to_path_buf(),
                source: e,
            })?;
        self.encoded.lock().unwrap().push(pcm.clone());
        Ok(())
    }

    fn format(&self) -> PcmFormat {
        TEST_FORMAT
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn decode_error(path: &Path, reason: String) -> DecodeError {
    DecodeError {
        path: path.to_path_buf(),
        reason,
    }
}

/// Mailer that keeps every mail it is given
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    /// Mails sent so far
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Positional command-line arguments as owned strings
pub fn cli_args(query: &str, count: &str, seconds: &str, output: &Path) -> Vec<String> {
    vec![
        query.to_string(),
        count.to_string(),
        seconds.to_string(),
        output.display().to_string(),
    ]
}

/// Whether `dir` has no entries
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}
