//! End-to-end tests for the HTTP surface with mocked collaborator backends.
//!
//! A single mock server stands in for the OpenAI-compatible LLM and
//! transcription endpoints. Environment configuration is established once;
//! tests that touch the credential serialize behind a lock because the key is
//! read live on every call.

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docqa::{api::create_router, config, qa::QaService};
use httpmock::{Method::POST, MockServer};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tower::ServiceExt;

static INIT: OnceCell<()> = OnceCell::const_new();
static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

const BOUNDARY: &str = "grounded-api-boundary";

fn set_env(key: &str, value: &str) {
    // SAFETY: tests hold ENV_LOCK while mutating or depending on the
    // environment, and configuration is established before any reads.
    unsafe { std::env::set_var(key, value) }
}

fn remove_env(key: &str) {
    // SAFETY: see set_env.
    unsafe { std::env::remove_var(key) }
}

async fn harness() -> (MutexGuard<'static, ()>, Arc<QaService>) {
    let guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    INIT.get_or_init(|| async {
        let server = Box::leak(Box::new(MockServer::start_async().await));
        set_env("LLM_BASE_URL", &server.base_url());
        set_env("TRANSCRIPTION_BASE_URL", &server.base_url());
        set_env("LLM_MODEL", "test-model");
        config::init_config();
        MOCK_SERVER.set(server).ok();
    })
    .await;
    set_env(config::LLM_API_KEY_VAR, "sk-test");
    (guard, Arc::new(QaService::from_config()))
}

fn mock_server() -> &'static MockServer {
    MOCK_SERVER.get().expect("mock server initialized")
}

/// Two-page PDF whose first page draws `text` and whose second page has no
/// content stream, so its extraction contributes an empty string.
fn two_page_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));
    let first_page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let second_page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![first_page_id.into(), second_page_id.into()],
        "Count" => 2,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize PDF");
    bytes
}

fn pdf_upload_request(filename: &str, pdf: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(pdf);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn json_request(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn pdf_upload_then_grounded_chat_round_trip() {
    let (_guard, service) = harness().await;
    let question = "what is on page one?";

    let completion = mock_server()
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test")
                .body_contains("MUST answer using ONLY")
                .body_contains("pages.pdf")
                .body_contains("Page one")
                .body_contains(question);
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "42" } }]
            }));
        })
        .await;

    let response = create_router(service.clone())
        .oneshot(pdf_upload_request("pages.pdf", &two_page_pdf("Page one")))
        .await
        .expect("upload response");
    assert_eq!(response.status(), StatusCode::OK);
    let upload = response_json(response).await;
    assert_eq!(upload["filename"], "pages.pdf");
    // The broken second page contributes an empty string; after joining and
    // trimming only the first page's text remains.
    assert_eq!(upload["text"], "Page one");
    let doc_id = upload["id"].as_str().expect("id string").to_string();

    let response = create_router(service)
        .oneshot(json_request(
            "/api/chat",
            json!({ "doc_id": doc_id, "question": question }),
        ))
        .await
        .expect("chat response");
    assert_eq!(response.status(), StatusCode::OK);
    let chat = response_json(response).await;
    assert_eq!(chat["answer"], "42");
    completion.assert();
}

#[tokio::test]
async fn unsupported_upload_is_rejected_and_nothing_is_stored() {
    let (_guard, service) = harness().await;

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nplain words\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request");

    let response = create_router(service.clone())
        .oneshot(request)
        .await
        .expect("upload response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"], "Unsupported file type");
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn chat_without_id_is_a_client_error_and_skips_the_llm() {
    let (_guard, service) = harness().await;

    let sentinel = mock_server()
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("question with no document");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "should not happen" } }]
            }));
        })
        .await;

    let response = create_router(service)
        .oneshot(json_request(
            "/api/chat",
            json!({ "question": "question with no document" }),
        ))
        .await
        .expect("chat response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(
        json["error"]
            .as_str()
            .expect("error string")
            .contains("No document text available")
    );
    sentinel.assert_hits(0);
}

#[tokio::test]
async fn llm_server_fault_maps_to_internal_error() {
    let (_guard, service) = harness().await;
    let question = "question that breaks the backend";

    mock_server()
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains(question);
            then.status(500).body("provider exploded");
        })
        .await;

    let id = service.store().put("doc.pdf".into(), "some text".into());
    let response = create_router(service)
        .oneshot(json_request(
            "/api/chat",
            json!({ "doc_id": id, "question": question }),
        ))
        .await
        .expect("chat response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert!(
        json["error"]
            .as_str()
            .expect("error string")
            .contains("LLM request failed")
    );
}

#[tokio::test]
async fn summarize_wraps_text_in_the_bullet_instruction() {
    let (_guard, service) = harness().await;

    let completion = mock_server()
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("3 bullet points")
                .body_contains("quarterly results were flat");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "- flat" } }]
            }));
        })
        .await;

    let response = create_router(service)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/summarize")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("text=quarterly%20results%20were%20flat"))
                .expect("request"),
        )
        .await
        .expect("summarize response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["summary"], "- flat");
    completion.assert();
}

#[tokio::test]
async fn health_tracks_credential_changes_between_calls() {
    let (_guard, service) = harness().await;

    remove_env(config::LLM_API_KEY_VAR);
    let response = create_router(service.clone())
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("health response");
    let json = response_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["llm_configured"], false);

    set_env(config::LLM_API_KEY_VAR, "sk-test");
    let response = create_router(service)
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("health response");
    let json = response_json(response).await;
    assert_eq!(json["llm_configured"], true);
}
