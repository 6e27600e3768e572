//! Concatenation and export stage

use crate::audio::{AudioCodec, PcmBuffer};
use crate::error::{ExportError, ProcessingError};
use crate::types::{MashupArtifact, TrimmedClip};
use std::path::Path;
use tracing::info;

/// Join clips end to end in the order given
///
/// No cross-fade, gain change or silence trimming is applied. Every clip must share
/// the first clip's format.
pub fn concatenate(clips: &[TrimmedClip]) -> Result<PcmBuffer, ProcessingError> {
    let first = clips
        .first()
        .ok_or(ProcessingError::NoUsableClips { attempted: 0 })?;
    let format = first.pcm.format();

    let mut joined = PcmBuffer::empty(format);
    for (index, clip) in clips.iter().enumerate() {
        if clip.pcm.format() != format {
            return Err(ProcessingError::FormatMismatch {
                index,
                expected: format.to_string(),
                found: clip.pcm.format().to_string(),
            });
        }
        joined.extend_from(&clip.pcm);
    }
    Ok(joined)
}

/// Encode the joined audio to `output`
///
/// The parent directory must already exist; a missing one is reported as an
/// [`ExportError::Io`] rather than created.
pub async fn export(
    codec: &dyn AudioCodec,
    pcm: &PcmBuffer,
    clip_count: usize,
    output: &Path,
) -> Result<MashupArtifact, ExportError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        let metadata = tokio::fs::metadata(parent)
            .await
            .map_err(|source| ExportError::Io {
                path: output.to_path_buf(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(ExportError::Io {
                path: output.to_path_buf(),
                source: std::io::Error::other(format!("{} is not a directory", parent.display())),
            });
        }
    }

    codec.encode(pcm, output).await?;

    let artifact = MashupArtifact {
        path: output.to_path_buf(),
        clip_count,
        duration: pcm.duration(),
    };
    info!(
        ?output,
        clip_count,
        duration_secs = artifact.duration.as_secs_f64(),
        codec = codec.name(),
        "mashup exported"
    );
    Ok(artifact)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmFormat;
    use crate::error::DecodeError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    const FORMAT: PcmFormat = PcmFormat {
        sample_rate: 10,
        channels: 1,
    };

    fn clip(index: usize, samples: Vec<i16>) -> TrimmedClip {
        TrimmedClip {
            source_index: index,
            source: PathBuf::from(format!("{index}.mp3")),
            pcm: PcmBuffer::new(FORMAT, samples),
        }
    }

    #[derive(Default)]
    struct RecordingCodec {
        written: Mutex<Vec<(PathBuf, Vec<i16>)>>,
    }

    #[async_trait]
    impl AudioCodec for RecordingCodec {
        async fn decode(
            &self,
            path: &Path,
            _limit: Option<Duration>,
        ) -> Result<PcmBuffer, DecodeError> {
            Err(DecodeError {
                path: path.to_path_buf(),
                reason: "unused".into(),
            })
        }

        async fn encode(&self, pcm: &PcmBuffer, output: &Path) -> Result<(), ExportError> {
            self.written
                .lock()
                .unwrap()
                .push((output.to_path_buf(), pcm.samples().to_vec()));
            Ok(())
        }

        fn format(&self) -> PcmFormat {
            FORMAT
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn concatenation_preserves_order() {
        let clips = [clip(0, vec![1, 1]), clip(1, vec![2]), clip(2, vec![3, 3, 3])];
        let joined = concatenate(&clips).unwrap();
        assert_eq!(joined.samples(), &[1, 1, 2, 3, 3, 3]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            concatenate(&[]),
            Err(ProcessingError::NoUsableClips { attempted: 0 })
        ));
    }

    #[test]
    fn mixed_formats_are_rejected() {
        let mut odd = clip(1, vec![2, 2]);
        odd.pcm = PcmBuffer::new(
            PcmFormat {
                sample_rate: 10,
                channels: 2,
            },
            vec![2, 2],
        );
        let err = concatenate(&[clip(0, vec![1]), odd]).unwrap_err();
        assert!(matches!(err, ProcessingError::FormatMismatch { index: 1, .. }));
    }

    #[tokio::test]
    async fn export_reports_duration_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp3");
        let codec = RecordingCodec::default();
        let pcm = PcmBuffer::new(FORMAT, vec![0; 50]);

        let artifact = export(&codec, &pcm, 2, &output).await.unwrap();

        assert_eq!(artifact.duration, Duration::from_secs(5));
        assert_eq!(artifact.clip_count, 2);
        assert_eq!(codec.written.lock().unwrap()[0].0, output);
    }

    #[tokio::test]
    async fn export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("no/such/dir/out.mp3");
        let codec = RecordingCodec::default();
        let pcm = PcmBuffer::new(FORMAT, vec![0; 10]);

        let err = export(&codec, &pcm, 1, &output).await.unwrap_err();

        assert!(matches!(err, ExportError::Io { .. }));
        assert!(codec.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bare_file_name_exports_to_current_directory() {
        let codec = RecordingCodec::default();
        let pcm = PcmBuffer::new(FORMAT, vec![0; 10]);
        let artifact = export(&codec, &pcm, 1, Path::new("out.mp3")).await.unwrap();
        assert_eq!(artifact.path, PathBuf::from("out.mp3"));
    }
}
