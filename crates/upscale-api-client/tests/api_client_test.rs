use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockito::Matcher;
use upscale_api_client::{
    ApiClient, Endpoints, ProgressFn, RetryPolicy, RunOutcome, UpscaleBackend, UpscaleRunner,
};
use upscale_core::models::{CandidateFile, JobId};
use upscale_core::{UpscaleConfig, UpscaleError, UpscaleSession};

fn client(base_url: String) -> ApiClient {
    ApiClient::new(base_url, Endpoints::default(), Duration::from_secs(5)).unwrap()
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> CandidateFile {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    CandidateFile::from_path(&path).unwrap()
}

fn session_with(candidate: CandidateFile) -> UpscaleSession {
    let mut session = UpscaleSession::with_local_previews(&UpscaleConfig::default());
    session.select_files(vec![candidate]).unwrap();
    session
}

fn recorder() -> (ProgressFn, Arc<Mutex<Vec<(u64, u64)>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let progress: ProgressFn = Arc::new(move |sent, total| sink.lock().unwrap().push((sent, total)));
    (progress, calls)
}

#[tokio::test]
async fn test_image_upload_sends_multipart_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/upscale/image")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="file"; filename="photo.png""#.to_string()),
            Matcher::Regex(r#"(?s)name="target_resolution".*3840x2160"#.to_string()),
            Matcher::Regex(r#"(?s)name="scale".*4x"#.to_string()),
            Matcher::Regex(r#"(?s)name="preserve_audio".*true"#.to_string()),
            Matcher::Regex("fake png bytes".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jobId":"abc123"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(write_file(dir.path(), "photo.png", b"fake png bytes"));
    let request = session.begin_transfer().unwrap();

    let (progress, calls) = recorder();
    let response = client(server.url())
        .upload(&request, progress)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.job_id.as_deref(), Some("abc123"));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.last(), Some(&(14, 14)));
}

#[tokio::test]
async fn test_video_and_unknown_kinds_use_video_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/upscale/video")
        .with_status(200)
        .with_body(r#"{"resultUrl":"https://cdn.example.com/out.mp4"}"#)
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let api = client(server.url());

    for name in ["clip.mp4", "archive.bin"] {
        let mut session = session_with(write_file(dir.path(), name, b"data"));
        let request = session.begin_transfer().unwrap();
        let (progress, _) = recorder();
        let response = api.upload(&request, progress).await.unwrap();
        assert_eq!(
            response.result_url.as_deref(),
            Some("https://cdn.example.com/out.mp4")
        );
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_upload_server_error_is_upload_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/upscale/video")
        .with_status(500)
        .with_body("disk full")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(write_file(dir.path(), "clip.mp4", b"data"));
    let request = session.begin_transfer().unwrap();
    let (progress, _) = recorder();

    let err = client(server.url())
        .upload(&request, progress)
        .await
        .unwrap_err();
    match err {
        UpscaleError::UploadFailure(reason) => {
            assert!(reason.contains("500"), "{}", reason);
            assert!(reason.contains("disk full"), "{}", reason);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_unreachable_server_is_upload_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(write_file(dir.path(), "clip.mp4", b"data"));
    let request = session.begin_transfer().unwrap();
    let (progress, _) = recorder();

    // nothing listens on port 9 of localhost
    let err = client("http://127.0.0.1:9".to_string())
        .upload(&request, progress)
        .await
        .unwrap_err();
    assert!(matches!(err, UpscaleError::UploadFailure(_)));
}

#[tokio::test]
async fn test_upload_of_vanished_file_is_io_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/upscale/video")
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(write_file(dir.path(), "clip.mp4", b"data"));
    let request = session.begin_transfer().unwrap();
    std::fs::remove_file(dir.path().join("clip.mp4")).unwrap();
    let (progress, calls) = recorder();

    let err = client(server.url())
        .upload(&request, progress)
        .await
        .unwrap_err();
    assert!(matches!(err, UpscaleError::Io(_)), "{:?}", err);
    assert!(calls.lock().unwrap().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_job_status_parses_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/upscale/status/abc123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"processing","progress":42.5}"#)
        .create_async()
        .await;

    let status = client(server.url())
        .job_status(&JobId::new("abc123"))
        .await
        .unwrap();
    assert_eq!(status.status, "processing");
    assert_eq!(status.progress, Some(42.5));
}

#[tokio::test]
async fn test_job_status_encodes_job_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock(
            "GET",
            Matcher::Regex(r"^/api/upscale/status/a(%2F|/)b(%20| )c$".to_string()),
        )
        .with_status(200)
        .with_body(r#"{"status":"done","resultUrl":"https://x/r.png"}"#)
        .create_async()
        .await;

    let status = client(server.url())
        .job_status(&JobId::new("a/b c"))
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(status.result_url.as_deref(), Some("https://x/r.png"));
}

#[tokio::test]
async fn test_job_status_errors_are_transient() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/upscale/status/down")
        .with_status(503)
        .create_async()
        .await;
    server
        .mock("GET", "/api/upscale/status/garbled")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let api = client(server.url());
    for id in ["down", "garbled"] {
        let err = api.job_status(&JobId::new(id)).await.unwrap_err();
        assert!(
            matches!(err, UpscaleError::StatusQueryTransient(_)),
            "{}: {:?}",
            id,
            err
        );
    }
}

#[tokio::test]
async fn test_download_result_writes_file() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/results/out.png")
        .with_status(200)
        .with_body("upscaled pixels")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("out.png");
    let api = client(server.url());

    // relative URLs resolve against the API base
    let written = api
        .download_result("/results/out.png", &destination)
        .await
        .unwrap();
    assert_eq!(written, 15);
    assert_eq!(std::fs::read(&destination).unwrap(), b"upscaled pixels");

    let absolute = format!("{}/results/out.png", server.url());
    let other = dir.path().join("again.png");
    api.download_result(&absolute, &other).await.unwrap();
    assert!(other.exists());
}

#[tokio::test]
async fn test_download_missing_result_fails() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/results/gone.png")
        .with_status(404)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = client(server.url())
        .download_result("/results/gone.png", &dir.path().join("gone.png"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_runner_against_http_backend() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/upscale/video")
        .with_status(200)
        .with_body(r#"{"jobId":"job-7"}"#)
        .create_async()
        .await;
    let status_mock = server
        .mock("GET", "/api/upscale/status/job-7")
        .with_status(200)
        .with_body(r#"{"status":"done","progress":100,"resultUrl":"https://x/job-7.mp4"}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(write_file(dir.path(), "clip.mp4", b"frames"));
    let runner = UpscaleRunner::new(
        client(server.url()),
        RetryPolicy {
            interval: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            max_consecutive_failures: 3,
        },
    );

    let outcome = runner.submit(&mut session, |_| {}).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed("https://x/job-7.mp4".to_string()));
    status_mock.assert_async().await;
    assert_eq!(session.transfer_progress().value(), 100);
}
