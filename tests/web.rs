//! Web job flow: form submission through mailed archive

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use mashup::api::create_router;
use mashup::delivery::Notifier;
use mashup::delivery::notifier::{FAILURE_SUBJECT, SUCCESS_SUBJECT};
use mashup::{Event, JobRunner, JobStatus, MashupPipeline};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct WebHarness {
    runner: JobRunner,
    mailer: Arc<RecordingMailer>,
    source: Arc<FakeSource>,
    work_dir: tempfile::TempDir,
}

fn harness(source: FakeSource) -> WebHarness {
    let work_dir = tempfile::tempdir().unwrap();
    let source = Arc::new(source);
    let mailer = Arc::new(RecordingMailer::default());
    let pipeline = MashupPipeline::new(
        source.clone(),
        Arc::new(FakeCodec::default()),
        work_dir.path(),
    );
    let runner = JobRunner::new(
        pipeline,
        Notifier::new(mailer.clone(), "mashup.zip"),
        "mashup.mp3",
    );
    WebHarness {
        runner,
        mailer,
        source,
        work_dir,
    }
}

fn submit(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_notification(events: &mut tokio::sync::broadcast::Receiver<Event>) -> Event {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("job did not finish in time")
            .unwrap();
        if matches!(
            event,
            Event::NotificationSent { .. } | Event::NotificationDropped { .. }
        ) {
            return event;
        }
    }
}

#[tokio::test]
async fn accepted_request_mails_single_entry_archive() {
    let h = harness(FakeSource::uniform(11, 60));
    let mut events = h.runner.subscribe();

    let response = create_router(h.runner.clone())
        .oneshot(submit("singer=Test+Artist&n=11&y=21&email=fan%40example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let event = wait_for_notification(&mut events).await;
    assert!(matches!(event, Event::NotificationSent { success: true, .. }));

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "fan@example.com");
    assert_eq!(sent[0].subject, SUCCESS_SUBJECT);

    let attachment = sent[0].attachment.as_ref().unwrap();
    assert_eq!(attachment.filename, "mashup.zip");
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(attachment.data.clone())).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_index(0).unwrap();
    assert_eq!(entry.name(), "mashup.mp3");
    let mut contents = String::new();
    entry.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "frames 23100");
}

#[tokio::test]
async fn failed_job_mails_error_and_cleans_up() {
    let h = harness(FakeSource::uniform(4, 60));
    let mut events = h.runner.subscribe();

    create_router(h.runner.clone())
        .oneshot(submit("singer=Obscure&n=11&y=21&email=fan%40example.com"))
        .await
        .unwrap();

    let event = wait_for_notification(&mut events).await;
    assert!(matches!(event, Event::NotificationSent { success: false, .. }));

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, FAILURE_SUBJECT);
    assert!(sent[0].body.contains("only 4 files downloaded, but 11 required"));
    assert!(sent[0].attachment.is_none());

    // Cleanup runs after the notification event
    for _ in 0..100 {
        if is_empty_dir(h.work_dir.path()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(is_empty_dir(h.work_dir.path()));
}

#[tokio::test]
async fn rejected_form_spawns_nothing() {
    let h = harness(FakeSource::uniform(11, 60));

    let response = create_router(h.runner.clone())
        .oneshot(submit("singer=Artist&n=11&y=21&email=not-an-email"))
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    assert_eq!(&body[..], b"Error: Invalid email format.");
    assert!(h.runner.registry().is_empty().await);
    assert_eq!(h.source.calls(), 0);
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn parallel_jobs_each_get_one_mail() {
    let h = harness(FakeSource::uniform(11, 60));
    let mut handles = Vec::new();
    for (i, email) in ["a@example.com", "b@example.com", "c@example.com"]
        .into_iter()
        .enumerate()
    {
        let request = mashup::validation::validate_web_form(
            Some(&format!("Artist {}", i)),
            Some("11"),
            Some("21"),
            Some(email),
        )
        .unwrap();
        handles.push(h.runner.spawn(request).await);
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.id());
        assert!(handle.wait().await.is_success());
    }

    let mut recipients: Vec<String> = h.mailer.sent().into_iter().map(|m| m.to).collect();
    recipients.sort();
    assert_eq!(recipients, ["a@example.com", "b@example.com", "c@example.com"]);

    for id in ids {
        let record = h.runner.registry().get(id).await.unwrap();
        assert_eq!(record.status, JobStatus::Succeeded);
    }
    assert!(is_empty_dir(h.work_dir.path()));
}
