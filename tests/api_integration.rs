//! HTTP API tests
//!
//! Exercises the axum router in-process with `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use docbuddy::{
    cli::Config,
    server::{build_router, AppState},
    service::DocumentAnalyzer,
    store::{Database, FileStore},
    synthesis::{SynthesisError, SynthesisRequest, Synthesizer, SynthesizerHandle},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "docbuddy-test-boundary";

struct Fixed;

#[async_trait]
impl Synthesizer for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn synthesize(&self, _request: &SynthesisRequest) -> Result<String, SynthesisError> {
        Ok("The office closes at noon.".to_string())
    }
}

fn app(dir: &TempDir, synthesizer: SynthesizerHandle) -> Router {
    let analyzer = DocumentAnalyzer::new(
        Arc::new(Database::open_in_memory().unwrap()),
        FileStore::new(dir.path().join("documents")),
        &Config::default(),
        synthesizer,
    )
    .unwrap();
    build_router(AppState::new(Arc::new(analyzer)), 1024 * 1024)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn ask(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/ask")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

const MEMO: &[u8] = b"From: hr@example.com\r\n\
To: all@example.com\r\n\
Subject: Friday hours\r\n\
Content-Type: text/plain\r\n\
\r\n\
The office closes at noon on Friday.\r\n";

#[tokio::test]
async fn test_health_reports_synthesizer_state() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, SynthesizerHandle::Unavailable("refused".to_string()));

    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["synthesizer_ready"], false);
}

#[tokio::test]
async fn test_ask_rejections() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, SynthesizerHandle::Unavailable("refused".to_string()));

    let (status, body) = send(&app, ask(json!({ "question": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question is required");

    let (status, body) = send(&app, ask(json!({ "question": "hi", "conversation_id": 7 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Conversation 7 not found");

    let (status, body) = send(&app, ask(json!({ "question": "hi" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("upload documents first"));

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/ask")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_ask_returns_503_when_ollama_is_down() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, SynthesizerHandle::Unavailable("refused".to_string()));

    let (status, _) = send(&app, upload("file", "memo.eml", MEMO)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, ask(json!({ "question": "When does the office close?" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("Ollama"));

    let (_, conversations) = send(&app, get("/api/conversations")).await;
    assert_eq!(conversations["conversations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_upload_ask_and_browse() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, SynthesizerHandle::ready(Fixed));

    let (status, body) = send(&app, upload("file", "memo.eml", MEMO)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["created"], true);
    assert_eq!(body["file_type"], "email");
    let document_id = body["document_id"].as_i64().unwrap();

    let (status, body) = send(&app, upload("file", "memo.eml", MEMO)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], false);
    assert_eq!(body["message"], "File already exists");

    let (status, answer) = send(&app, ask(json!({ "question": "When does the office close?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["answer"], "The office closes at noon.");
    assert_eq!(answer["source_chunks"][0]["document_name"], "memo.eml");
    let conversation_id = answer["conversation_id"].as_i64().unwrap();

    let (status, body) = send(&app, get(&format!("/api/documents/{document_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document"]["filename"], "memo.eml");
    assert!(!body["chunks"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, get(&format!("/api/conversations/{conversation_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qa_pairs"][0]["question"], "When does the office close?");

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/documents/{document_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "memo.eml");

    let (status, _) = send(&app, get(&format!("/api/documents/{document_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejections() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, SynthesizerHandle::Unavailable("refused".to_string()));

    let (status, body) = send(&app, upload("file", "script.sh", b"echo hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported file type: .sh");

    let (status, body) = send(&app, upload("attachment", "memo.eml", MEMO)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");

    let (_, documents) = send(&app, get("/api/documents")).await;
    assert_eq!(documents["documents"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_bad_and_unknown_ids() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, SynthesizerHandle::Unavailable("refused".to_string()));

    let (status, body) = send(&app, get("/api/documents/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document 42 not found");

    let (status, _) = send(&app, get("/api/documents/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/conversations/5")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ask_accepts_null_optional_fields() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, SynthesizerHandle::ready(Fixed));

    let (status, _) = send(&app, upload("file", "memo.eml", MEMO)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, answer) = send(
        &app,
        ask(json!({
            "question": "When does the office close?",
            "conversation_id": null,
            "document_ids": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["answer"], "The office closes at noon.");
    assert_eq!(answer["source_chunks"][0]["document_name"], "memo.eml");

    let (status, body) = send(&app, ask(json!({ "question": null }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question is required");
}
