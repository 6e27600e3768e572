//! Trim-and-collect stage

use crate::audio::AudioCodec;
use crate::error::{DecodeError, ProcessingError};
use crate::types::{AcquiredTrack, TrimmedClip};
use std::time::Duration;
use tracing::{debug, warn};

/// Result of trimming a batch
#[derive(Debug, Default)]
pub struct TrimReport {
    /// Clips in acquisition order
    pub clips: Vec<TrimmedClip>,
    /// Tracks that failed to decode and were skipped
    pub skipped: Vec<DecodeError>,
}

impl TrimReport {
    /// Number of tracks that were attempted
    pub fn attempted(&self) -> usize {
        self.clips.len() + self.skipped.len()
    }

    /// The clips, or [`ProcessingError::NoUsableClips`] if every track failed
    pub fn into_clips(self) -> Result<Vec<TrimmedClip>, ProcessingError> {
        if self.clips.is_empty() {
            return Err(ProcessingError::NoUsableClips {
                attempted: self.attempted(),
            });
        }
        Ok(self.clips)
    }
}

/// Decode each track and keep its first `clip` of audio
///
/// Tracks are processed one at a time in the order given. A decode failure is logged
/// and recorded in [`TrimReport::skipped`]; it never aborts the batch.
pub async fn trim_and_collect(
    codec: &dyn AudioCodec,
    tracks: &[AcquiredTrack],
    clip: Duration,
) -> TrimReport {
    let mut report = TrimReport::default();

    for track in tracks {
        match codec.decode(&track.path, Some(clip)).await {
            Ok(mut pcm) => {
                pcm.truncate(clip);
                debug!(
                    index = track.index,
                    track = %track.display_name(),
                    duration_ms = pcm.duration().as_millis() as u64,
                    "trimmed clip"
                );
                report.clips.push(TrimmedClip {
                    source_index: track.index,
                    source: track.path.clone(),
                    pcm,
                });
            }
            Err(e) => {
                warn!(index = track.index, error = %e, "skipping track that failed to decode");
                report.skipped.push(e);
            }
        }
    }

    report
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PcmBuffer, PcmFormat};
    use crate::error::ExportError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    const FORMAT: PcmFormat = PcmFormat {
        sample_rate: 100,
        channels: 1,
    };

    /// Codec whose sources are seconds-of-audio per file name; missing names fail
    struct LengthCodec(HashMap<PathBuf, u64>);

    #[async_trait]
    impl AudioCodec for LengthCodec {
        async fn decode(
            &self,
            path: &Path,
            _limit: Option<Duration>,
        ) -> Result<PcmBuffer, DecodeError> {
            let secs = self.0.get(path).ok_or_else(|| DecodeError {
                path: path.to_path_buf(),
                reason: "corrupt".into(),
            })?;
            Ok(PcmBuffer::new(FORMAT, vec![1; (*secs * 100) as usize]))
        }

        async fn encode(&self, _pcm: &PcmBuffer, _output: &Path) -> Result<(), ExportError> {
            Ok(())
        }

        fn format(&self) -> PcmFormat {
            FORMAT
        }

        fn name(&self) -> &'static str {
            "length"
        }
    }

    fn track(index: usize, name: &str) -> AcquiredTrack {
        AcquiredTrack {
            index,
            path: PathBuf::from(name),
        }
    }

    #[tokio::test]
    async fn clips_are_min_of_source_and_limit() {
        let codec = LengthCodec(HashMap::from([
            (PathBuf::from("long.mp3"), 60),
            (PathBuf::from("short.mp3"), 15),
        ]));
        let tracks = [track(0, "long.mp3"), track(1, "short.mp3")];

        let report = trim_and_collect(&codec, &tracks, Duration::from_secs(30)).await;
        let clips = report.into_clips().unwrap();

        assert_eq!(clips[0].duration(), Duration::from_secs(30));
        assert_eq!(clips[1].duration(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn failures_are_skipped_and_order_kept() {
        let codec = LengthCodec(HashMap::from([
            (PathBuf::from("a.mp3"), 40),
            (PathBuf::from("c.mp3"), 40),
        ]));
        let tracks = [track(0, "a.mp3"), track(1, "b.mp3"), track(2, "c.mp3")];

        let report = trim_and_collect(&codec, &tracks, Duration::from_secs(21)).await;

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, PathBuf::from("b.mp3"));
        let order: Vec<_> = report.clips.iter().map(|c| c.source_index).collect();
        assert_eq!(order, [0, 2]);
    }

    #[tokio::test]
    async fn all_failures_is_no_usable_clips() {
        let codec = LengthCodec(HashMap::new());
        let tracks = [track(0, "a.mp3"), track(1, "b.mp3")];

        let err = trim_and_collect(&codec, &tracks, Duration::from_secs(21))
            .await
            .into_clips()
            .unwrap_err();

        assert!(matches!(err, ProcessingError::NoUsableClips { attempted: 2 }));
    }
}
