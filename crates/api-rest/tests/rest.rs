use api_rest::{router, AppState, SharedRepository};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mediq_core::collaborators::{
    AudioPayload, CollaboratorError, DirectoryUploader, InsightGenerator, NoteInsights,
    Transcriber,
};
use mediq_core::{CoreConfig, KeyValueStore, MemoryStore, Repository, StatusTransitions};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app_with(store: Arc<dyn KeyValueStore>, cfg: CoreConfig) -> Router {
    let repo: SharedRepository = Repository::new(Arc::new(cfg), store);
    router(AppState::new(repo))
}

fn memory_state() -> AppState {
    let cfg = CoreConfig::new(PathBuf::from("unused"), "mediq").expect("valid namespace");
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    AppState::new(Repository::new(Arc::new(cfg), store))
}

fn app() -> Router {
    let cfg = CoreConfig::new(PathBuf::from("unused"), "mediq").expect("valid namespace");
    app_with(Arc::new(MemoryStore::new()), cfg)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = send_raw(app, method, uri, body.map(|b| b.to_string())).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

async fn send_bytes(
    app: &Router,
    uri: &str,
    content_type: &str,
    bytes: &[u8],
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(bytes.to_vec()))
        .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}

struct EchoTranscriber;

impl Transcriber for EchoTranscriber {
    fn transcribe(&self, audio: &AudioPayload) -> Result<String, CollaboratorError> {
        match audio.bytes.len() {
            0 => Ok(String::new()),
            n => Ok(format!("{} bytes of {}", n, audio.content_type)),
        }
    }
}

struct TriageInsights;

impl InsightGenerator for TriageInsights {
    fn analyse(&self, content: &str) -> Result<NoteInsights, CollaboratorError> {
        Ok(NoteInsights {
            insights: vec![format!("Reviewed: {}", content)],
            actions: vec!["Book follow-up".into()],
        })
    }
}

fn ada() -> Value {
    json!({ "name": "Ada Lovelace", "age": 30, "sex": "F", "phone": "555-0100" })
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn patient_lifecycle() {
    let app = app();

    let (status, patient) = send(&app, "POST", "/patients", Some(ada())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(patient["id"], json!("001"));
    assert_eq!(patient["status"], json!("new"));
    assert!(patient["mrn"].as_str().unwrap().starts_with("MRN-"));

    let (status, fetched) = send(&app, "GET", "/patients/001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, patient);

    let (status, updated) = send(
        &app,
        "PATCH",
        "/patients/001",
        Some(json!({ "status": "stable", "city": "London" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], json!("stable"));
    assert_eq!(updated["city"], json!("London"));
    assert_eq!(updated["mrn"], patient["mrn"]);

    let (status, _) = send(&app, "DELETE", "/patients/001", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/patients/001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Patient with ID 001 not found"));
}

#[tokio::test]
async fn invalid_patient_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/patients",
        Some(json!({ "name": "A", "age": 30, "sex": "F" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid input"));

    let (_, list) = send(&app, "GET", "/patients", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn notes_and_cascade() {
    let app = app();
    send(&app, "POST", "/patients", Some(ada())).await;

    let (status, note) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({ "patientId": "001", "type": "text", "content": "BP 120/80" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = note["id"].as_str().unwrap().to_string();
    assert!(note_id.starts_with("note-"));

    let (status, orphan) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({ "patientId": "999", "type": "text", "content": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{orphan}");

    let (_, by_patient) = send(&app, "GET", "/patients/001/notes", None).await;
    assert_eq!(by_patient.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/notes/{note_id}"),
        Some(json!({ "content": "BP 118/78" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], json!("BP 118/78"));
    assert!(updated["updatedAt"].is_string());

    send(&app, "DELETE", "/patients/001", None).await;
    let (_, notes) = send(&app, "GET", "/notes", None).await;
    assert_eq!(notes, json!([]));
}

#[tokio::test]
async fn events_filter_and_transitions() {
    let cfg = CoreConfig::new(PathBuf::from("unused"), "mediq")
        .expect("valid namespace")
        .with_status_transitions(StatusTransitions::Enforced);
    let app = app_with(Arc::new(MemoryStore::new()), cfg);
    send(&app, "POST", "/patients", Some(ada())).await;

    let (status, event) = send(
        &app,
        "POST",
        "/events",
        Some(json!({
            "date": "2030-01-15",
            "time": "09:30",
            "patientId": "001",
            "type": "appointment",
            "title": "Review"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["patientName"], json!("Ada Lovelace"));
    assert_eq!(event["status"], json!("scheduled"));
    let id = event["id"].as_str().unwrap().to_string();

    let (_, on_day) = send(&app, "GET", "/events?date=2030-01-15", None).await;
    assert_eq!(on_day.as_array().unwrap().len(), 1);
    let (_, other_day) = send(&app, "GET", "/events?date=2030-01-16", None).await;
    assert_eq!(other_day, json!([]));

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/events/{id}"),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/events/{id}"),
        Some(json!({ "status": "scheduled" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("invalid status transition from completed to scheduled")
    );

    let (status, _) = send(
        &app,
        "POST",
        "/events",
        Some(json!({ "date": "15/01/2030", "type": "reminder" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vitals_medications_and_prescription() {
    let app = app();
    send(&app, "POST", "/patients", Some(ada())).await;

    let (status, vital) = send(
        &app,
        "POST",
        "/patients/001/vitals",
        Some(json!({ "bp": "120/80", "hr": 72, "temp": 36.8, "weight": 61.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(vital["id"].as_str().unwrap().starts_with("vital-"));

    for (name, status) in [("Lisinopril", "active"), ("Warfarin", "inactive")] {
        let (code, _) = send(
            &app,
            "POST",
            "/patients/001/medications",
            Some(json!({
                "name": name,
                "dosage": "10mg",
                "frequency": "Once daily",
                "startDate": "2025-01-01",
                "status": status
            })),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (_, all) = send(&app, "GET", "/patients/001/medications", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    let (_, active) = send(&app, "GET", "/patients/001/medications/active", None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, doc) = send_raw(
        &app,
        "POST",
        "/patients/001/prescription",
        Some(json!({ "doctorName": "Dr. Rao", "content": "Take with food." }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc.starts_with("# MedIQ Healthcare"));
    assert!(doc.contains("Lisinopril"));
    assert!(!doc.contains("Warfarin"));

    let (status, _) = send(
        &app,
        "POST",
        "/patients/999/vitals",
        Some(json!({ "bp": "120/80", "hr": 72, "temp": 36.8, "weight": 61.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_and_metadata() {
    let app = app();
    send(&app, "POST", "/patients", Some(ada())).await;
    send(
        &app,
        "PATCH",
        "/patients/001",
        Some(json!({ "status": "urgent" })),
    )
    .await;

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["totalPatients"], json!(1));
    assert_eq!(stats["urgentPatients"], json!(1));

    let (_, meta) = send(&app, "GET", "/metadata", None).await;
    assert_eq!(meta["patientCount"], json!(1));
    assert_eq!(meta["version"], json!("1.0.0"));
}

#[tokio::test]
async fn export_then_import_into_file_store() {
    let source = app();
    send(&source, "POST", "/patients", Some(ada())).await;
    send(
        &source,
        "POST",
        "/patients/001/vitals",
        Some(json!({ "bp": "120/80", "hr": 72, "temp": 36.8, "weight": 61.5 })),
    )
    .await;

    let (status, doc) = send_raw(&source, "GET", "/export?scope=full", None).await;
    assert_eq!(status, StatusCode::OK);

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cfg = CoreConfig::new(temp_dir.path().to_path_buf(), "mediq").expect("valid namespace");
    let store = mediq_core::FileStore::open(temp_dir.path()).expect("Failed to open store");
    let target = app_with(Arc::new(store), cfg);

    let (status, summary) = send_raw(&target, "POST", "/import", Some(doc)).await;
    assert_eq!(status, StatusCode::OK, "{summary}");
    let summary: Value = serde_json::from_str(&summary).unwrap();
    assert_eq!(summary["patients"], json!(1));
    assert_eq!(summary["vitalsSlots"], json!(1));

    let (_, vitals) = send(&target, "GET", "/patients/001/vitals", None).await;
    assert_eq!(vitals.as_array().unwrap().len(), 1);

    let (status, _) = send_raw(&target, "GET", "/export?scope=everything", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_import_leaves_store_untouched() {
    let app = app();
    send(&app, "POST", "/patients", Some(ada())).await;

    let (status, body) = send_raw(&app, "POST", "/import", Some("{not json".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid import format"));

    let (_, list) = send(&app, "GET", "/patients", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn quota_exceeded_is_insufficient_storage() {
    let cfg = CoreConfig::new(PathBuf::from("unused"), "mediq").expect("valid namespace");
    let app = app_with(Arc::new(MemoryStore::with_quota(64)), cfg);

    let (status, body) = send(&app, "POST", "/patients", Some(ada())).await;
    assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, doc) = send(&app(), "GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/patients/{id}"].is_object());
}

#[tokio::test]
async fn voice_note_is_transcribed_and_annotated() {
    let state = memory_state()
        .with_transcriber(Arc::new(EchoTranscriber))
        .with_insights(Arc::new(TriageInsights));
    let app = router(state);
    send(&app, "POST", "/patients", Some(ada())).await;

    let (status, note) = send_bytes(&app, "/patients/001/voice-notes", "audio/ogg", b"abcd").await;
    assert_eq!(status, StatusCode::CREATED, "{note}");
    assert_eq!(note["type"], json!("voice"));
    assert_eq!(note["content"], json!("4 bytes of audio/ogg"));
    assert_eq!(note["transcript"], json!("4 bytes of audio/ogg"));
    assert_eq!(note["insights"], json!(["Reviewed: 4 bytes of audio/ogg"]));
    assert_eq!(note["actions"], json!(["Book follow-up"]));

    let (status, _) = send_bytes(&app, "/patients/001/voice-notes", "audio/ogg", b"").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send_bytes(&app, "/patients/404/voice-notes", "audio/ogg", b"abcd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, notes) = send(&app, "GET", "/patients/001/notes", None).await;
    assert_eq!(notes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn typed_note_keeps_supplied_actions() {
    let app = router(memory_state().with_insights(Arc::new(TriageInsights)));
    send(&app, "POST", "/patients", Some(ada())).await;

    let (_, annotated) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({ "patientId": "001", "type": "text", "content": "Cough" })),
    )
    .await;
    assert_eq!(annotated["insights"], json!(["Reviewed: Cough"]));

    let (_, supplied) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({
            "patientId": "001",
            "type": "text",
            "content": "Cough",
            "actions": ["Chest X-ray"]
        })),
    )
    .await;
    assert_eq!(supplied["actions"], json!(["Chest X-ray"]));
    assert!(supplied.get("insights").is_none());
}

#[tokio::test]
async fn documents_need_a_configured_uploader() {
    let app = router(memory_state());
    send(&app, "POST", "/patients", Some(ada())).await;
    let (status, body) =
        send_bytes(&app, "/patients/001/documents", "application/pdf", b"%PDF").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn document_upload_creates_linked_note() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let uploader = Arc::new(DirectoryUploader::new(temp_dir.path()));
    let app = router(memory_state().with_uploader(uploader));
    send(&app, "POST", "/patients", Some(ada())).await;

    let (status, note) = send_bytes(
        &app,
        "/patients/001/documents?description=Chest%20X-ray",
        "application/pdf",
        b"%PDF-1.4",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{note}");
    let content = note["content"].as_str().unwrap();
    let url = content
        .strip_prefix("Chest X-ray\n\nDocument: file://")
        .expect("note links the stored file");
    assert_eq!(std::fs::read(url).unwrap(), b"%PDF-1.4");

    let (status, _) =
        send_bytes(&app, "/patients/404/documents", "application/pdf", b"%PDF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // Nothing is stored for an unknown patient.
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn unreadable_collection_refuses_writes() {
    let app = app();
    let doc = json!({
        "patients": [{
            "id": "001", "mrn": "MRN-2025-001-AB12C", "name": "Imported",
            "age": 40, "sex": "male", "status": "stable"
        }]
    });
    let (status, _) = send_raw(&app, "POST", "/import", Some(doc.to_string())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/patients", Some(ada())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unreadable"));

    let (_, export) = send(&app, "GET", "/export", None).await;
    assert_eq!(export["patients"], json!([]));
    let (status, _) = send_raw(&app, "POST", "/import", Some(json!({}).to_string())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/patients", Some(ada())).await;
    assert_eq!(status, StatusCode::CREATED);
}
