use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceExt;

use llm_doc_translator::OpenAICompatible;
use llm_doc_translator::extract::extract_docx_text;
use llm_doc_translator::reencode::{self, OutputFormat};
use llm_doc_translator::server::{ServerState, router};
use llm_doc_translator::settings::{ExportSettings, Settings};
use llm_doc_translator::store::{JsonlStore, NoopStore, RecordStore};

const BOUNDARY: &str = "----llm-doc-translator-test";

type Calls = Arc<Mutex<Vec<Value>>>;

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    body: Value,
    calls: Calls,
}

async fn completions(State(upstream): State<Upstream>, Json(request): Json<Value>) -> (StatusCode, Json<Value>) {
    upstream.calls.lock().unwrap().push(request);
    (upstream.status, Json(upstream.body.clone()))
}

async fn spawn_upstream(status: StatusCode, body: Value) -> (String, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(Upstream {
            status,
            body,
            calls: calls.clone(),
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1", addr), calls)
}

fn completion(content: &str) -> Value {
    json!({
        "model": "fake-model",
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
    })
}

fn app(base_url: &str, store: Arc<dyn RecordStore>, spool: &Path) -> Router {
    let mut settings = Settings::default();
    settings.server.tmp_dir = Some(spool.display().to_string());
    let provider = OpenAICompatible::new(Some("test-key".to_string()))
        .with_base_url(base_url)
        .with_model("fake-model");
    let state = ServerState::new(settings, provider, store).unwrap();
    router(Arc::new(state))
}

struct FilePart<'a> {
    field: &'a str,
    file_name: Option<&'a str>,
    mime: Option<&'a str>,
    bytes: &'a [u8],
}

fn multipart_body(files: &[FilePart<'_>], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match part.file_name {
            Some(name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.field),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(mime) = part.mime {
            body.extend_from_slice(format!("Content-Type: {}\r\n", mime).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value).as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/translate")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn text_file<'a>(name: &'a str, bytes: &'a [u8]) -> FilePart<'a> {
    FilePart {
        field: "file",
        file_name: Some(name),
        mime: Some("text/plain"),
        bytes,
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn spool_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn hello_txt_is_translated_to_chinese() {
    let (base_url, calls) = spawn_upstream(StatusCode::OK, completion("你好，世界")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(&[text_file("hello.txt", b"Hello world")], &[("targetLang", "zh")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({ "translation": "你好，世界" }));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let request = &calls[0];
    assert_eq!(request["model"], "fake-model");
    assert_eq!(request["messages"][0]["role"], "system");
    assert!(request["messages"][0]["content"].as_str().unwrap().contains("Chinese"));
    assert_eq!(request["messages"][1]["role"], "user");
    assert_eq!(request["messages"][1]["content"], "Hello world");
    assert!(request.get("temperature").is_some());

    let translation = value["translation"].as_str().unwrap();
    let encoded = reencode::reencode(
        translation,
        OutputFormat::Txt,
        Some("hello.txt"),
        &ExportSettings::default(),
    )
    .unwrap();
    assert_eq!(encoded.bytes, translation.as_bytes());
    assert_eq!(encoded.file_name, "translated_hello.txt");
    assert!(spool_is_empty(spool.path()));
}

#[tokio::test]
async fn missing_language_defaults_to_english() {
    let (base_url, calls) = spawn_upstream(StatusCode::OK, completion("Hello")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(&[text_file("hola.txt", b"Hola")], &[]);
    let (status, _) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    let calls = calls.lock().unwrap();
    assert!(calls[0]["messages"][0]["content"].as_str().unwrap().contains("English (en)"));
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let (base_url, calls) = spawn_upstream(StatusCode::OK, completion("x")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(&[], &[("targetLang", "zh")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value, json!({ "error": "No file uploaded" }));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_unnamed_file_part_counts_as_missing() {
    let (base_url, _calls) = spawn_upstream(StatusCode::OK, completion("x")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let part = FilePart {
        field: "file",
        file_name: None,
        mime: None,
        bytes: b"",
    };
    let (status, value) = send_json(app, upload_request(multipart_body(&[part], &[]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "No file uploaded");
}

#[tokio::test]
async fn whitespace_only_file_never_reaches_the_service() {
    let (base_url, calls) = spawn_upstream(StatusCode::OK, completion("x")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(&[text_file("blank.txt", b"  \n\t \r\n")], &[("targetLang", "fr")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "No text content found in file");
    assert!(calls.lock().unwrap().is_empty());
    assert!(spool_is_empty(spool.path()));
}

#[tokio::test]
async fn executable_is_an_unsupported_file_type() {
    let (base_url, calls) = spawn_upstream(StatusCode::OK, completion("x")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let part = FilePart {
        field: "file",
        file_name: Some("setup.exe"),
        mime: Some("application/x-msdownload"),
        bytes: &[0x4d, 0x5a, 0x90, 0x00, 0x03],
    };
    let (status, value) = send_json(app, upload_request(multipart_body(&[part], &[]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Unsupported file type");
    assert!(calls.lock().unwrap().is_empty());
    assert!(spool_is_empty(spool.path()));
}

#[tokio::test]
async fn corrupt_pdf_is_an_extraction_failure() {
    let (base_url, _calls) = spawn_upstream(StatusCode::OK, completion("x")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let part = FilePart {
        field: "file",
        file_name: Some("broken.pdf"),
        mime: Some("application/pdf"),
        bytes: b"%PDF-1.4 this is not really a pdf",
    };
    let (status, value) = send_json(app, upload_request(multipart_body(&[part], &[]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Failed to extract text from file");
    assert!(value["details"].is_string());
    assert!(spool_is_empty(spool.path()));
}

#[tokio::test]
async fn unknown_target_language_is_rejected() {
    let (base_url, calls) = spawn_upstream(StatusCode::OK, completion("x")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(&[text_file("hello.txt", b"Hello")], &[("targetLang", "xx")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Unsupported target language: xx");
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn second_file_is_rejected() {
    let (base_url, _calls) = spawn_upstream(StatusCode::OK, completion("x")).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(
        &[text_file("a.txt", b"one"), text_file("b.txt", b"two")],
        &[("targetLang", "de")],
    );
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Only one file can be uploaded at a time");
}

#[tokio::test]
async fn upstream_failure_is_a_server_error() {
    let (base_url, _calls) = spawn_upstream(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "model overloaded", "type": "server_error" } }),
    )
    .await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(&[text_file("hello.txt", b"Hello world")], &[("targetLang", "zh")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["error"], "Translation service error");
    let details = value["details"].as_str().unwrap();
    assert!(details.contains("500"));
    assert!(details.contains("model overloaded"));
    assert!(value.get("translation").is_none());
}

#[tokio::test]
async fn missing_completion_content_is_an_invalid_response() {
    let (base_url, _calls) = spawn_upstream(StatusCode::OK, json!({ "choices": [] })).await;
    let spool = tempfile::tempdir().unwrap();
    let app = app(&base_url, Arc::new(NoopStore), spool.path());

    let body = multipart_body(&[text_file("hello.txt", b"Hello world")], &[("targetLang", "ja")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["error"], "Invalid response from translation service");
}

#[tokio::test]
async fn missing_api_key_reports_not_configured() {
    let spool = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.server.tmp_dir = Some(spool.path().display().to_string());
    let provider = OpenAICompatible::new(None).with_base_url("http://127.0.0.1:9/v1");
    let state = ServerState::new(settings, provider, Arc::new(NoopStore)).unwrap();
    let app = router(Arc::new(state));

    let body = multipart_body(&[text_file("hello.txt", b"Hello world")], &[]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["error"], "Translation service not configured");
}

#[tokio::test]
async fn oversized_upload_is_rejected_without_spooling() {
    let (base_url, calls) = spawn_upstream(StatusCode::OK, completion("unused")).await;
    let spool = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.server.tmp_dir = Some(spool.path().display().to_string());
    settings.server.max_upload_mb = 1;
    let provider = OpenAICompatible::new(Some("test-key".to_string()))
        .with_base_url(&base_url)
        .with_model("fake-model");
    let state = ServerState::new(settings, provider, Arc::new(NoopStore)).unwrap();
    let app = router(Arc::new(state));

    let large = vec![b'a'; 2 * 1024 * 1024];
    let body = multipart_body(&[text_file("large.txt", &large)], &[("targetLang", "zh")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(value["error"], "Uploaded file is too large");
    assert!(spool_is_empty(spool.path()));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn successful_translation_is_recorded() {
    let (base_url, _calls) = spawn_upstream(StatusCode::OK, completion("你好，世界")).await;
    let spool = tempfile::tempdir().unwrap();
    let records = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(records.path().join("translations.jsonl"));
    let path = store.path().to_path_buf();
    let app = app(&base_url, Arc::new(store), spool.path());

    let body = multipart_body(&[text_file("hello.txt", b"Hello world")], &[("target_lang", "zh")]);
    let (status, _) = send_json(app, upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);

    let content = std::fs::read_to_string(path).unwrap();
    let lines: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["original_text"], "Hello world");
    assert_eq!(lines[0]["translated_text"], "你好，世界");
    assert_eq!(lines[0]["target_language"], "zh");
    assert_eq!(lines[0]["file_name"], "hello.txt");
    assert!(lines[0]["created_at"].is_string());
}

#[tokio::test]
async fn store_failure_does_not_fail_the_request() {
    let (base_url, _calls) = spawn_upstream(StatusCode::OK, completion("Bonjour")).await;
    let spool = tempfile::tempdir().unwrap();
    let records = tempfile::tempdir().unwrap();
    // a directory cannot be appended to
    let store = JsonlStore::new(records.path());
    let app = app(&base_url, Arc::new(store), spool.path());

    let body = multipart_body(&[text_file("hello.txt", b"Hello")], &[("lang", "fr")]);
    let (status, value) = send_json(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["translation"], "Bonjour");
}

#[tokio::test]
async fn export_returns_attachment() {
    let spool = tempfile::tempdir().unwrap();
    let app = app("http://127.0.0.1:9/v1", Arc::new(NoopStore), spool.path());

    let request = Request::builder()
        .method("POST")
        .uri("/api/export")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "text": "Hola\nMundo", "format": "docx", "fileName": "hello.txt" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"translated_hello.docx\""
    );
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(extract_docx_text(&bytes).unwrap(), "Hola\nMundo");
}

#[tokio::test]
async fn export_rejects_unknown_format() {
    let spool = tempfile::tempdir().unwrap();
    let app = app("http://127.0.0.1:9/v1", Arc::new(NoopStore), spool.path());

    let request = Request::builder()
        .method("POST")
        .uri("/api/export")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "text": "x", "format": "odt" }).to_string()))
        .unwrap();
    let (status, value) = send_json(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Unsupported export format");
}

#[tokio::test]
async fn health_index_and_preflight() {
    let spool = tempfile::tempdir().unwrap();
    let app = app("http://127.0.0.1:9/v1", Arc::new(NoopStore), spool.path());

    let (status, value) = send_json(
        app.clone(),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({ "status": "ok" }));

    let (status, page) = send(app.clone(), Request::builder().uri("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(page).unwrap().contains("/api/translate"));

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/translate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
