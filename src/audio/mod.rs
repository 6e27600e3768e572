//! Audio decoding, slicing and encoding
//!
//! Every source is decoded into the same in-memory representation ([`PcmBuffer`]:
//! interleaved signed 16-bit samples at a fixed rate and channel count), so trimming
//! and concatenation are plain slice operations. The container work sits behind the
//! [`AudioCodec`] trait; [`FfmpegCodec`] is the production implementation.

use crate::error::{DecodeError, ExportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod ffmpeg;

pub use ffmpeg::FfmpegCodec;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Sample layout shared by every buffer in a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Frames per second
    pub sample_rate: u32,
    /// Interleaved channels per frame
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

impl std::fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz/{} ch", self.sample_rate, self.channels)
    }
}

impl PcmFormat {
    /// Number of whole frames that fit in `duration`
    pub fn frames_in(&self, duration: Duration) -> usize {
        let frames = duration.as_nanos() * u128::from(self.sample_rate) / NANOS_PER_SEC;
        usize::try_from(frames).unwrap_or(usize::MAX)
    }
}

/// Decoded audio held in memory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcmBuffer {
    format: PcmFormat,
    samples: Vec<i16>,
}

impl PcmBuffer {
    /// Wrap interleaved samples. A trailing partial frame is dropped.
    pub fn new(format: PcmFormat, mut samples: Vec<i16>) -> Self {
        let channels = usize::from(format.channels.max(1));
        samples.truncate(samples.len() - samples.len() % channels);
        Self { format, samples }
    }

    /// An empty buffer in the given format
    pub fn empty(format: PcmFormat) -> Self {
        Self {
            format,
            samples: Vec::new(),
        }
    }

    /// Parse raw `s16le` bytes as produced by a decoder. A trailing odd byte is dropped.
    pub fn from_le_bytes(format: PcmFormat, bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(format, samples)
    }

    /// Raw `s16le` bytes for an encoder
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Sample layout
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }

    /// Whether the buffer holds no audio
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length
    pub fn duration(&self) -> Duration {
        if self.format.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = self.frames() as u128 * NANOS_PER_SEC / u128::from(self.format.sample_rate);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Keep only the first `duration` of audio. Shorter buffers are left untouched.
    pub fn truncate(&mut self, duration: Duration) {
        let frames = self.format.frames_in(duration);
        let keep = frames.saturating_mul(usize::from(self.format.channels.max(1)));
        self.samples.truncate(keep);
    }

    /// Append another buffer's samples. Both must share a format.
    pub(crate) fn extend_from(&mut self, other: &PcmBuffer) {
        debug_assert_eq!(self.format, other.format);
        self.samples.extend_from_slice(&other.samples);
    }
}

/// Container/codec backend
///
/// Implementations decode any supported container into a [`PcmBuffer`] in
/// [`format`](AudioCodec::format) and encode a buffer into the container implied by
/// the output path.
#[async_trait]
pub trait AudioCodec: Send + Sync {
    /// Decode `path` into memory.
    ///
    /// `limit` is a hint: implementations may stop decoding after that much audio, but
    /// callers still truncate the result themselves.
    async fn decode(&self, path: &Path, limit: Option<Duration>) -> Result<PcmBuffer, DecodeError>;

    /// Encode `pcm` to `output`, replacing any existing file
    async fn encode(&self, pcm: &PcmBuffer, output: &Path) -> Result<(), ExportError>;

    /// Layout of every buffer returned by [`decode`](AudioCodec::decode)
    fn format(&self) -> PcmFormat;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn mono(rate: u32) -> PcmFormat {
        PcmFormat {
            sample_rate: rate,
            channels: 1,
        }
    }

    #[test]
    fn duration_follows_frame_count() {
        let buf = PcmBuffer::new(PcmFormat::default(), vec![0; 44_100 * 2 * 3]);
        assert_eq!(buf.frames(), 44_100 * 3);
        assert_eq!(buf.duration(), Duration::from_secs(3));
    }

    #[test]
    fn truncate_keeps_prefix() {
        let mut buf = PcmBuffer::new(mono(10), (0..100).collect());
        buf.truncate(Duration::from_secs(3));
        assert_eq!(buf.samples(), (0..30).collect::<Vec<i16>>().as_slice());
        assert_eq!(buf.duration(), Duration::from_secs(3));
    }

    #[test]
    fn truncate_longer_than_source_is_noop() {
        let mut buf = PcmBuffer::new(mono(10), vec![1; 150]);
        buf.truncate(Duration::from_secs(30));
        assert_eq!(buf.duration(), Duration::from_secs(15));
    }

    #[test]
    fn truncate_respects_frame_boundaries() {
        let stereo = PcmFormat {
            sample_rate: 4,
            channels: 2,
        };
        let mut buf = PcmBuffer::new(stereo, (0..16).collect());
        buf.truncate(Duration::from_millis(500));
        assert_eq!(buf.samples(), &[0, 1, 2, 3]);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let stereo = PcmFormat {
            sample_rate: 8_000,
            channels: 2,
        };
        let buf = PcmBuffer::new(stereo, vec![1, 2, 3]);
        assert_eq!(buf.samples(), &[1, 2]);
    }

    #[test]
    fn le_bytes_decode_signed_samples() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0x7f];
        let buf = PcmBuffer::from_le_bytes(mono(8_000), &bytes);
        assert_eq!(buf.samples(), &[1, -1, i16::MIN]);
        assert_eq!(buf.to_le_bytes(), bytes[..6].to_vec());
    }

    #[test]
    fn extend_appends_in_order() {
        let mut a = PcmBuffer::new(mono(1), vec![1, 2]);
        let b = PcmBuffer::new(mono(1), vec![3]);
        a.extend_from(&b);
        assert_eq!(a.samples(), &[1, 2, 3]);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        let buf = PcmBuffer::new(mono(0), vec![1, 2, 3]);
        assert_eq!(buf.duration(), Duration::ZERO);
    }
}
