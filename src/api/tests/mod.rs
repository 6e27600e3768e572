use super::*;
use std::result::Result;
use crate::acquisition::MediaSource;
use crate::audio::{AudioCodec, PcmBuffer, PcmFormat};
use crate::delivery::{Mailer, Notifier, OutgoingMail};
use crate::error::{AcquisitionError, DecodeError, DeliveryError, ExportError};
use crate::pipeline::MashupPipeline;
use crate::types::AcquiredTrack;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;


const FORMAT: PcmFormat = PcmFormat {
    sample_rate: 100,
    channels: 1,
};

/// Writes placeholder tracks; optionally waits for `gate` before returning
struct StubSource {
    gate: Option<Arc<Notify>>,
    calls: Mutex<usize>,
}

#[async_trait]
impl MediaSource for StubSource {
    async fn fetch(
        &self,
        _query: &str,
        count: usize,
        dest: &Path,
    ) -> Result<Vec<AcquiredTrack>, AcquisitionError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let mut tracks = Vec::new();
        for index in 0..count {
            let path = dest.join(format!("{:02}.mp3", index));
            tokio::fs::write(&path, b"audio").await.unwrap();
            tracks.push(AcquiredTrack { index, path });
        }
        Ok(tracks)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

struct StubCodec;

#[async_trait]
impl AudioCodec for StubCodec {
    async fn decode(&self, _path: &Path, _limit: Option<Duration>) -> Result<PcmBuffer, DecodeError> {
        Ok(PcmBuffer::new(FORMAT, vec![0; 100 * 30]))
    }

    async fn encode(&self, _pcm: &PcmBuffer, output: &Path) -> Result<(), ExportError> {
        tokio::fs::write(output, b"mp3").await.unwrap();
        Ok(())
    }

    fn format(&self) -> PcmFormat {
        FORMAT
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[derive(Default)]
struct StubMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

struct TestApp {
    runner: JobRunner,
    source: Arc<StubSource>,
    mailer: Arc<StubMailer>,
    _work_dir: tempfile::TempDir,
}

fn test_app(gate: Option<Arc<Notify>>) -> TestApp {
    let work_dir = tempfile::tempdir().unwrap();
    let source = Arc::new(StubSource {
        gate,
        calls: Mutex::new(0),
    });
    let mailer = Arc::new(StubMailer::default());
    let pipeline = MashupPipeline::new(source.clone(), Arc::new(StubCodec), work_dir.path());
    let runner = JobRunner::new(
        pipeline,
        Notifier::new(mailer.clone(), "mashup.zip"),
        "mashup.mp3",
    );
    TestApp {
        runner,
        source,
        mailer,
        _work_dir: work_dir,
    }
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn api_server_binds_and_aborts() {
    let app = test_app(None);
    let config = crate::config::ApiConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..Default::default()
    };

    let handle = tokio::spawn(async move { start_api_server(app.runner, &config).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!handle.is_finished(), "server should still be serving");
    handle.abort();
}
