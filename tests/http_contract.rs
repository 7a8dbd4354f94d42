//! End-to-end checks of the wire contract against a local axum stub of the
//! prompt-tools API.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use docsum::{
    summarize_to_file, ApiConfig, DocumentInput, HttpMethod, Phase, SummarizeConfig,
    SummarizeError, Summarizer,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SUMMARY: &str = "• Revenue outlook for Q3\n• Hiring plan for the platform team";

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Value>,
}

/// Records every request; replies from `overrides` (keyed by `"METHOD path"`)
/// or with the happy-path defaults.
#[derive(Clone, Default)]
struct StubApi {
    seen: Arc<Mutex<Vec<Seen>>>,
    overrides: Arc<HashMap<String, (StatusCode, String)>>,
}

impl StubApi {
    fn with(overrides: &[(&str, StatusCode, &str)]) -> Self {
        let map = overrides
            .iter()
            .map(|(k, s, b)| (k.to_string(), (*s, b.to_string())))
            .collect();
        Self {
            seen: Arc::default(),
            overrides: Arc::new(map),
        }
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn record(
    State(stub): State<StubApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let parsed = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&body).unwrap_or(Value::Null))
    };
    stub.seen.lock().unwrap().push(Seen {
        method: method.clone(),
        path: path.clone(),
        headers,
        body: parsed,
    });

    let key = format!("{method} {path}");
    if let Some((status, body)) = stub.overrides.get(&key) {
        return (*status, body.clone()).into_response();
    }

    match (method.as_str(), path.as_str()) {
        ("GET", p) if p.starts_with("/api_tools/return_data/") => {
            let name = p.trim_start_matches("/api_tools/return_data/");
            axum::Json(json!({"object_name": name, "text_value": SUMMARY})).into_response()
        }
        ("DELETE", _) => StatusCode::NO_CONTENT.into_response(),
        _ => axum::Json(json!({"status": "ok"})).into_response(),
    }
}

async fn serve(stub: StubApi) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("read local addr");
    let app = Router::new().fallback(record).with_state(stub);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    format!("http://{addr}/api_tools")
}

fn api(base: &str) -> ApiConfig {
    ApiConfig::builder()
        .base_url(base)
        .token("test-token")
        .app_id("app-123")
        .timeout_secs(5)
        .build()
        .unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn summarizer(stub: &StubApi) -> Summarizer {
    init_tracing();
    let base = serve(stub.clone()).await;
    Summarizer::connect(api(&base), SummarizeConfig::default()).unwrap()
}

#[tokio::test]
async fn full_run_sends_exact_bodies_and_headers() {
    let stub = StubApi::default();
    let s = summarizer(&stub).await;
    s.select(DocumentInput::from_bytes("minutes.txt", "Board minutes: revenue, hiring."))
        .unwrap();

    let out = s.start().await.unwrap();
    assert_eq!(out.summary, SUMMARY);
    assert_eq!(out.bullets().len(), 2);
    assert_eq!(out.raw["object_name"], "document_summary");

    let seen = stub.seen();
    assert_eq!(seen.len(), 3);

    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].path, "/api_tools/input_data");
    assert_eq!(
        seen[0].body,
        Some(json!({
            "created_object_name": "uploaded_document",
            "data_type": "strings",
            "input_data": ["Board minutes: revenue, hiring."],
        }))
    );

    assert_eq!(seen[1].path, "/api_tools/apply_prompt");
    assert_eq!(
        seen[1].body,
        Some(json!({
            "created_object_names": ["document_summary"],
            "prompt_string": docsum::prompts::summary_prompt("uploaded_document"),
            "inputs": [{"input_object_name": "uploaded_document", "mode": "combine_events"}],
        }))
    );

    assert_eq!(seen[2].method, Method::GET);
    assert_eq!(seen[2].path, "/api_tools/return_data/document_summary");
    assert_eq!(seen[2].body, None);

    for req in &seen {
        assert_eq!(req.headers["content-type"], "application/json");
        assert_eq!(req.headers["authorization"], "Bearer test-token");
        assert_eq!(req.headers["x-generated-app-id"], "app-123");
    }
}

#[tokio::test]
async fn log_records_urls_statuses_and_empty_bodies() {
    let stub = StubApi::default();
    let s = summarizer(&stub).await;
    s.select(DocumentInput::from_bytes("a.csv", "x,y\n1,2")).unwrap();
    s.start().await.unwrap();
    let report = s.cleanup().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.deleted, ["uploaded_document", "document_summary"]);

    let log = s.call_log().list();
    assert_eq!(log.len(), 5);
    assert!(log[0].url.ends_with("/api_tools/input_data"));
    assert_eq!(log[3].method, HttpMethod::Delete);
    assert!(log[3].url.ends_with("/api_tools/objects/uploaded_document"));
    assert_eq!(log[3].status, Some(204));
    assert_eq!(log[3].response, Value::Null);
    assert!(log.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[tokio::test]
async fn server_error_message_surfaces_and_stops_the_run() {
    let stub = StubApi::with(&[(
        "POST /api_tools/apply_prompt",
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"message": "model overloaded"}"#,
    )]);
    let s = summarizer(&stub).await;
    s.select(DocumentInput::from_bytes("notes.txt", "hello")).unwrap();

    let err = s.start().await.unwrap_err();
    assert!(matches!(err, SummarizeError::Transform { .. }));
    assert_eq!(err.to_string(), "Failed to generate summary: model overloaded");
    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(s.ledger(), ["uploaded_document"]);
    // No fetch after a failed transform.
    assert_eq!(stub.seen().len(), 2);

    let log = s.call_log().list();
    assert_eq!(log[1].status, Some(500));
    assert_eq!(log[1].response, json!({"message": "model overloaded"}));
}

#[tokio::test]
async fn non_json_error_body_is_logged_as_string() {
    let stub = StubApi::with(&[(
        "DELETE /api_tools/objects/document_summary",
        StatusCode::BAD_GATEWAY,
        "upstream unavailable",
    )]);
    let s = summarizer(&stub).await;
    s.select(DocumentInput::from_bytes("notes.txt", "hello")).unwrap();
    s.start().await.unwrap();

    let report = s.cleanup().await.unwrap();
    assert_eq!(report.deleted, ["uploaded_document"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].object, "document_summary");
    assert_eq!(report.failures[0].message, "Unknown error");
    assert_eq!(s.snapshot().error.as_deref(), Some("Failed to delete 1 of 2 objects"));
    assert!(s.ledger().is_empty());

    let last = s.call_log().list().pop().unwrap();
    assert_eq!(last.status, Some(502));
    assert_eq!(last.response, json!("upstream unavailable"));
}

#[tokio::test]
async fn missing_text_value_is_a_read_failure() {
    let stub = StubApi::with(&[(
        "GET /api_tools/return_data/document_summary",
        StatusCode::OK,
        r#"{"status": "pending"}"#,
    )]);
    let s = summarizer(&stub).await;
    s.select(DocumentInput::from_bytes("notes.txt", "hello")).unwrap();

    let err = s.start().await.unwrap_err();
    assert!(matches!(err, SummarizeError::RemoteRead { .. }));
    assert_eq!(s.ledger(), ["uploaded_document", "document_summary"]);
}

#[tokio::test]
async fn summarize_to_file_writes_summary() {
    init_tracing();
    let stub = StubApi::default();
    let base = serve(stub.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.txt");
    std::fs::write(&input, "Quarterly report body").unwrap();
    let out = dir.path().join("out/summary.md");

    let stats = summarize_to_file(&input, &out, &api(&base), &SummarizeConfig::default())
        .await
        .unwrap();
    assert_eq!(stats.remote_calls, 3);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), format!("{SUMMARY}\n"));
    assert_eq!(
        stub.seen()[0].body.as_ref().unwrap()["input_data"],
        json!(["Quarterly report body"])
    );
}
