use std::sync::{Arc, Mutex};

use palaver::core::attachment::TransferMethod;
use palaver::core::config::EndpointConfig;
use palaver::core::controller::{ComposedMessage, OutboundFile};
use palaver::core::environment::ImageLoader;
use palaver::endpoint::{
    ChatRelay, HttpUploader, ProgressFn, RelayError, UploadError, UploadTransport,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, body_string_contains, header, method, path},
};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

// ============================================================================
// Helper Functions
// ============================================================================

fn endpoint(server: &MockServer, api_key: Option<&str>) -> EndpointConfig {
    EndpointConfig {
        base_url: server.uri(),
        api_key: api_key.map(str::to_string),
        user: "palaver-test".to_string(),
    }
}

fn question(query: &str) -> ComposedMessage {
    ComposedMessage {
        query: query.to_string(),
        files: Vec::new(),
    }
}

/// Progress callback that records every percentage it sees.
fn recorder() -> (ProgressFn, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));
    (progress, seen)
}

// ============================================================================
// Chat relay
// ============================================================================

#[tokio::test]
async fn test_relay_returns_answer_and_conversation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .and(header("Authorization", "Bearer app-secret"))
        .and(body_partial_json(serde_json::json!({
            "query": "what is this?",
            "response_mode": "blocking",
            "user": "palaver-test",
            "conversation_id": "conv-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message_id": "m-9",
            "conversation_id": "conv-1",
            "answer": "A cat."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let relay = ChatRelay::new(&endpoint(&mock_server, Some("app-secret")));
    let answer = relay
        .deliver(&question("what is this?"), Some("conv-1"))
        .await
        .unwrap();

    assert_eq!(answer.answer, "A cat.");
    assert_eq!(answer.conversation_id.as_deref(), Some("conv-1"));
    assert_eq!(answer.message_id.as_deref(), Some("m-9"));
}

#[tokio::test]
async fn test_relay_sends_attached_files() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .and(body_partial_json(serde_json::json!({
            "files": [{
                "type": "image",
                "transfer_method": "remote_url",
                "url": "https://x.test/cat.png"
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "answer": "ok" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let message = ComposedMessage {
        query: "look".to_string(),
        files: vec![OutboundFile {
            kind: "image".to_string(),
            transfer_method: TransferMethod::RemoteUrl,
            url: "https://x.test/cat.png".to_string(),
            upload_file_id: None,
        }],
    };
    let relay = ChatRelay::new(&endpoint(&mock_server, None));
    let answer = relay.deliver(&message, None).await.unwrap();
    assert_eq!(answer.answer, "ok");
}

#[tokio::test]
async fn test_relay_reports_service_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&mock_server)
        .await;

    let relay = ChatRelay::new(&endpoint(&mock_server, None));
    let err = relay.deliver(&question("hi"), None).await.unwrap_err();

    match err {
        RelayError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "slow down");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_relay_rejects_malformed_answer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let relay = ChatRelay::new(&endpoint(&mock_server, None));
    let err = relay.deliver(&question("hi"), None).await.unwrap_err();
    assert!(matches!(err, RelayError::Parse(_)));
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn test_uploader_posts_multipart_and_returns_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"cat.png\""))
        .and(body_string_contains("palaver-test"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "file-42" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cat.png");
    std::fs::write(&file, PNG_MAGIC).unwrap();

    let uploader = HttpUploader::new(&endpoint(&mock_server, Some("app-secret")));
    let (progress, seen) = recorder();
    let id = uploader.upload(&file, progress).await.unwrap();

    assert_eq!(id, "file-42");
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|p| *p <= 99));
}

#[tokio::test]
async fn test_uploader_surfaces_rejection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .respond_with(ResponseTemplate::new(413).set_body_string("too large"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("big.png");
    std::fs::write(&file, PNG_MAGIC).unwrap();

    let uploader = HttpUploader::new(&endpoint(&mock_server, None));
    let (progress, _) = recorder();
    let err = uploader.upload(&file, progress).await.unwrap_err();
    assert!(matches!(err, UploadError::Api { status: 413, .. }));
}

#[tokio::test]
async fn test_uploader_refuses_non_images_before_sending() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.png");
    std::fs::write(&file, "plain text").unwrap();

    let uploader = HttpUploader::new(&endpoint(&mock_server, None));
    let (progress, _) = recorder();
    let err = uploader.upload(&file, progress).await.unwrap_err();
    assert!(matches!(err, UploadError::NotAnImage(_)));
}

// ============================================================================
// Image probes
// ============================================================================

#[tokio::test]
async fn test_image_loader_accepts_real_images_only() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bg.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_MAGIC))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page.png"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let loader = ImageLoader::new(None);
    let base = mock_server.uri();
    assert!(loader.is_loadable(&format!("{base}/bg.png")).await);
    assert!(!loader.is_loadable(&format!("{base}/page.png")).await);
    assert!(!loader.is_loadable(&format!("{base}/missing.png")).await);
}

#[tokio::test]
async fn test_image_loader_resolves_rooted_paths_against_asset_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("avatars")).unwrap();
    std::fs::write(dir.path().join("avatars/me.png"), PNG_MAGIC).unwrap();

    let loader = ImageLoader::new(Some(dir.path().to_path_buf()));
    assert!(loader.is_loadable("/avatars/me.png").await);
    assert!(!loader.is_loadable("/avatars/you.png").await);
    assert!(!loader.is_loadable("avatars/me.png").await);
}
