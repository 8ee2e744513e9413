//! # API REST
//!
//! REST API for the MedIQ record store.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! The router is built by [`router`] so that the `mediq-run` binary and the integration tests
//! share it. All record logic lives in `mediq-core`; handlers only translate between HTTP and
//! [`Repository`] calls, running the configured collaborators (transcription, insights, document
//! upload) first where a route needs them.

#![warn(rust_2018_idioms)]

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use mediq_core::records::{
    CalendarEvent, CalendarEventUpdate, ClinicalNote, ClinicalNoteUpdate, CreatePatientRequest,
    EventStatus, EventType, MedicationStatus, NewCalendarEvent, NewClinicalNote,
    NewPatientMedication, NewPatientVital, NoteType, Patient, PatientMedication, PatientStatus,
    PatientUpdate, PatientVital, Sex, StorageMetadata, StorageStats,
};
use mediq_core::collaborators::{
    annotate_note, document_note, transcribe_note, AudioPayload, CollaboratorError,
    DocumentUploader, InsightGenerator, PlaceholderInsights, PlaceholderTranscriber, Transcriber,
};
use mediq_core::{ExportScope, ImportSummary, KeyValueStore, RecordType, Repository, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Repository type served over HTTP. The substrate is chosen at startup.
pub type SharedRepository = Repository<Arc<dyn KeyValueStore>>;

/// Application state shared across REST API handlers.
///
/// Starts with the placeholder transcriber and insight generator and no document uploader;
/// the `with_*` builders swap in real services.
#[derive(Clone)]
pub struct AppState {
    repo: Arc<SharedRepository>,
    transcriber: Arc<dyn Transcriber>,
    insights: Arc<dyn InsightGenerator>,
    uploader: Option<Arc<dyn DocumentUploader>>,
}

impl AppState {
    pub fn new(repo: SharedRepository) -> Self {
        Self {
            repo: Arc::new(repo),
            transcriber: Arc::new(PlaceholderTranscriber),
            insights: Arc::new(PlaceholderInsights),
            uploader: None,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn with_insights(mut self, insights: Arc<dyn InsightGenerator>) -> Self {
        self.insights = insights;
        self
    }

    /// Enables `POST /patients/{id}/documents`.
    pub fn with_uploader(mut self, uploader: Arc<dyn DocumentUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn repo(&self) -> &SharedRepository {
        &self.repo
    }
}

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    /// Exact `YYYY-MM-DD` match on the event date.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `full` to include vitals and medications.
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentQuery {
    /// Text placed above the document link in the note.
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRes {
    pub patients: usize,
    pub clinical_notes: usize,
    pub calendar_events: usize,
    pub vitals_slots: usize,
    pub medication_slots: usize,
}

impl From<ImportSummary> for ImportRes {
    fn from(s: ImportSummary) -> Self {
        Self {
            patients: s.patients,
            clinical_notes: s.clinical_notes,
            calendar_events: s.calendar_events,
            vitals_slots: s.vitals_slots,
            medication_slots: s.medication_slots,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionReq {
    pub doctor_name: String,
    pub content: String,
}

// ============================================================================
// ERRORS
// ============================================================================

/// A failure on its way to becoming an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Collaborator(CollaboratorError),
    /// The route needs a service that was not configured.
    Unavailable(&'static str),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<CollaboratorError> for ApiError {
    fn from(e: CollaboratorError) -> Self {
        Self::Collaborator(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(e) => match e {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::InvalidInput(_)
                | StoreError::InvalidTransition { .. }
                | StoreError::ImportFormat(_)
                | StoreError::Text(_) => StatusCode::BAD_REQUEST,
                StoreError::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
                StoreError::Serialization { .. }
                | StoreError::IdAllocation(_)
                | StoreError::Unreadable { .. }
                | StoreError::Io(_)
                | StoreError::Id(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Collaborator(CollaboratorError::EmptyTranscript) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Store(e) => e.to_string(),
            ApiError::Collaborator(e) => e.to_string(),
            ApiError::Unavailable(service) => format!("{} is not configured", service),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        } else {
            tracing::debug!("request rejected: {}", self.message());
        }
        let body = Json(ErrorRes {
            error: self.message(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn not_found(kind: RecordType, id: &str) -> ApiError {
    ApiError::Store(StoreError::NotFound {
        kind,
        id: id.to_string(),
    })
}

// ============================================================================
// ROUTER
// ============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        create_patient,
        get_patient,
        update_patient,
        delete_patient,
        list_patient_notes,
        list_vitals,
        add_vital,
        list_medications,
        add_medication,
        list_active_medications,
        render_prescription,
        create_voice_note,
        attach_document,
        list_notes,
        create_note,
        get_note,
        update_note,
        delete_note,
        list_events,
        create_event,
        list_today_events,
        get_event,
        update_event,
        delete_event,
        stats,
        metadata,
        export,
        import,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        ImportRes,
        PrescriptionReq,
        Patient,
        CreatePatientRequest,
        PatientUpdate,
        Sex,
        PatientStatus,
        ClinicalNote,
        NewClinicalNote,
        ClinicalNoteUpdate,
        NoteType,
        CalendarEvent,
        NewCalendarEvent,
        CalendarEventUpdate,
        EventType,
        EventStatus,
        PatientVital,
        NewPatientVital,
        PatientMedication,
        NewPatientMedication,
        MedicationStatus,
        StorageMetadata,
        StorageStats,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).patch(update_patient).delete(delete_patient),
        )
        .route("/patients/:id/notes", get(list_patient_notes))
        .route("/patients/:id/vitals", get(list_vitals).post(add_vital))
        .route(
            "/patients/:id/medications",
            get(list_medications).post(add_medication),
        )
        .route(
            "/patients/:id/medications/active",
            get(list_active_medications),
        )
        .route("/patients/:id/prescription", post(render_prescription))
        .route("/patients/:id/voice-notes", post(create_voice_note))
        .route("/patients/:id/documents", post(attach_document))
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/:id",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/events", get(list_events).post(create_event))
        .route("/events/today", get(list_today_events))
        .route(
            "/events/:id",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/stats", get(stats))
        .route("/metadata", get(metadata))
        .route("/export", get(export))
        .route("/import", post(import))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// HEALTH
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "MedIQ REST API is alive".into(),
    })
}

// ============================================================================
// PATIENTS
// ============================================================================

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All patients", body = [Patient])
    )
)]
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<Vec<Patient>> {
    Json(state.repo().list_patients())
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid registration details", body = ErrorRes),
        (status = 507, description = "Storage quota exceeded", body = ErrorRes)
    )
)]
/// Registers a patient. The id, MRN, status and last visit are assigned by the store.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<CreatePatientRequest>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let patient = state.repo().create_patient(req)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    state
        .repo()
        .get_patient(&id)
        .map(Json)
        .ok_or_else(|| not_found(RecordType::Patient, &id))
}

#[utoipa::path(
    patch,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientUpdate,
    responses(
        (status = 200, description = "Updated patient", body = Patient),
        (status = 400, description = "Invalid field value", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Partially updates a patient. The id and MRN cannot be changed.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PatientUpdate>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.repo().update_patient(&id, update)?))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient and dependent records deleted")
    )
)]
/// Deletes a patient along with their notes, events, vitals and medications.
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.repo().delete_patient(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/notes",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Notes for the patient", body = [ClinicalNote])
    )
)]
#[axum::debug_handler]
async fn list_patient_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<ClinicalNote>> {
    Json(state.repo().list_notes_by_patient(&id))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/vitals",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Vital readings", body = [PatientVital])
    )
)]
#[axum::debug_handler]
async fn list_vitals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<PatientVital>> {
    Json(state.repo().list_vitals(&id))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/vitals",
    params(("id" = String, Path, description = "Patient id")),
    request_body = NewPatientVital,
    responses(
        (status = 201, description = "Vital recorded", body = PatientVital),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn add_vital(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(vital): Json<NewPatientVital>,
) -> ApiResult<(StatusCode, Json<PatientVital>)> {
    let vital = state.repo().add_vital(&id, vital)?;
    Ok((StatusCode::CREATED, Json(vital)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/medications",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Medications", body = [PatientMedication])
    )
)]
#[axum::debug_handler]
async fn list_medications(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<PatientMedication>> {
    Json(state.repo().list_medications(&id))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/medications",
    params(("id" = String, Path, description = "Patient id")),
    request_body = NewPatientMedication,
    responses(
        (status = 201, description = "Medication added", body = PatientMedication),
        (status = 400, description = "Invalid medication", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn add_medication(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(medication): Json<NewPatientMedication>,
) -> ApiResult<(StatusCode, Json<PatientMedication>)> {
    let medication = state.repo().add_medication(&id, medication)?;
    Ok((StatusCode::CREATED, Json(medication)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/medications/active",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Active medications", body = [PatientMedication])
    )
)]
#[axum::debug_handler]
async fn list_active_medications(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<PatientMedication>> {
    Json(state.repo().list_active_medications(&id))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/prescription",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PrescriptionReq,
    responses(
        (status = 200, description = "Markdown prescription", content_type = "text/markdown", body = String),
        (status = 400, description = "Blank doctor name or content", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Renders a Markdown prescription listing the patient's active medications.
#[axum::debug_handler]
async fn render_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PrescriptionReq>,
) -> ApiResult<impl IntoResponse> {
    let doc = state
        .repo()
        .prescription_for(&id, &req.doctor_name, &req.content)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        doc.into_inner(),
    ))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/voice-notes",
    params(("id" = String, Path, description = "Patient id")),
    request_body(content = String, description = "Recorded audio", content_type = "audio/webm"),
    responses(
        (status = 201, description = "Voice note created from the transcript", body = ClinicalNote),
        (status = 404, description = "Unknown patient", body = ErrorRes),
        (status = 422, description = "Transcription came back empty", body = ErrorRes),
        (status = 502, description = "Transcription service failed", body = ErrorRes)
    )
)]
/// Transcribes the uploaded audio and stores the transcript as a voice note.
///
/// The request's `Content-Type` is passed to the transcriber; `audio/webm` is assumed when it is
/// missing.
#[axum::debug_handler]
async fn create_voice_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ClinicalNote>)> {
    if state.repo().get_patient(&id).is_none() {
        return Err(not_found(RecordType::Patient, &id));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("audio/webm");
    let audio = AudioPayload {
        content_type: content_type.to_string(),
        bytes: body.to_vec(),
    };

    let note = transcribe_note(state.transcriber.as_ref(), &id, &audio)?;
    let note = annotate_note(state.insights.as_ref(), note);
    let note = state.repo().create_note(note)?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/documents",
    params(("id" = String, Path, description = "Patient id"), DocumentQuery),
    request_body(content = String, description = "Document bytes", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Document stored and referenced from a new note", body = ClinicalNote),
        (status = 404, description = "Unknown patient", body = ErrorRes),
        (status = 502, description = "Upload failed", body = ErrorRes),
        (status = 503, description = "No document store configured", body = ErrorRes)
    )
)]
/// Uploads a document and records a text note that links to it.
#[axum::debug_handler]
async fn attach_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DocumentQuery>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ClinicalNote>)> {
    let uploader = state
        .uploader
        .as_ref()
        .ok_or(ApiError::Unavailable("document storage"))?;
    if state.repo().get_patient(&id).is_none() {
        return Err(not_found(RecordType::Patient, &id));
    }

    let description = query.description.unwrap_or_default();
    let note = document_note(uploader.as_ref(), &id, &description, &body)?;
    let note = state.repo().create_note(note)?;
    Ok((StatusCode::CREATED, Json(note)))
}

// ============================================================================
// NOTES
// ============================================================================

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "All clinical notes", body = [ClinicalNote])
    )
)]
#[axum::debug_handler]
async fn list_notes(State(state): State<AppState>) -> Json<Vec<ClinicalNote>> {
    Json(state.repo().list_notes())
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = NewClinicalNote,
    responses(
        (status = 201, description = "Note created", body = ClinicalNote),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Creates a note. When the body carries neither `insights` nor `actions`, the insight service
/// is asked for them.
#[axum::debug_handler]
async fn create_note(
    State(state): State<AppState>,
    Json(note): Json<NewClinicalNote>,
) -> ApiResult<(StatusCode, Json<ClinicalNote>)> {
    let note = annotate_note(state.insights.as_ref(), note);
    let note = state.repo().create_note(note)?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note", body = ClinicalNote),
        (status = 404, description = "Unknown note", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClinicalNote>> {
    state
        .repo()
        .get_note(&id)
        .map(Json)
        .ok_or_else(|| not_found(RecordType::ClinicalNote, &id))
}

#[utoipa::path(
    patch,
    path = "/notes/{id}",
    params(("id" = String, Path, description = "Note id")),
    request_body = ClinicalNoteUpdate,
    responses(
        (status = 200, description = "Updated note", body = ClinicalNote),
        (status = 404, description = "Unknown note", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ClinicalNoteUpdate>,
) -> ApiResult<Json<ClinicalNote>> {
    Ok(Json(state.repo().update_note(&id, update)?))
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 204, description = "Note deleted (or was already absent)")
    )
)]
#[axum::debug_handler]
async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.repo().delete_note(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// EVENTS
// ============================================================================

#[utoipa::path(
    get,
    path = "/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Calendar events", body = [CalendarEvent])
    )
)]
/// Lists events. Without a date filter, patient names are resolved from the current patient
/// records; with one, events are returned as stored.
#[axum::debug_handler]
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<CalendarEvent>> {
    let events = match query.date {
        Some(date) => state.repo().list_events_by_date(&date),
        None => state.repo().list_events_resolved(),
    };
    Json(events)
}

#[utoipa::path(
    post,
    path = "/events",
    request_body = NewCalendarEvent,
    responses(
        (status = 201, description = "Event created", body = CalendarEvent),
        (status = 400, description = "Malformed date or time", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn create_event(
    State(state): State<AppState>,
    Json(event): Json<NewCalendarEvent>,
) -> ApiResult<(StatusCode, Json<CalendarEvent>)> {
    let event = state.repo().create_event(event)?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path = "/events/today",
    responses(
        (status = 200, description = "Events dated today (UTC)", body = [CalendarEvent])
    )
)]
#[axum::debug_handler]
async fn list_today_events(State(state): State<AppState>) -> Json<Vec<CalendarEvent>> {
    Json(state.repo().list_today_events())
}

#[utoipa::path(
    get,
    path = "/events/{id}",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event", body = CalendarEvent),
        (status = 404, description = "Unknown event", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CalendarEvent>> {
    state
        .repo()
        .get_event(&id)
        .map(Json)
        .ok_or_else(|| not_found(RecordType::CalendarEvent, &id))
}

#[utoipa::path(
    patch,
    path = "/events/{id}",
    params(("id" = String, Path, description = "Event id")),
    request_body = CalendarEventUpdate,
    responses(
        (status = 200, description = "Updated event", body = CalendarEvent),
        (status = 400, description = "Rejected status transition or malformed field", body = ErrorRes),
        (status = 404, description = "Unknown event", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CalendarEventUpdate>,
) -> ApiResult<Json<CalendarEvent>> {
    Ok(Json(state.repo().update_event(&id, update)?))
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 204, description = "Event deleted (or was already absent)")
    )
)]
#[axum::debug_handler]
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.repo().delete_event(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// AGGREGATES AND BACKUP
// ============================================================================

#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = StorageStats)
    )
)]
#[axum::debug_handler]
async fn stats(State(state): State<AppState>) -> Json<StorageStats> {
    Json(state.repo().compute_stats())
}

#[utoipa::path(
    get,
    path = "/metadata",
    responses(
        (status = 200, description = "Storage metadata snapshot", body = StorageMetadata)
    )
)]
#[axum::debug_handler]
async fn metadata(State(state): State<AppState>) -> Json<StorageMetadata> {
    Json(state.repo().metadata())
}

#[utoipa::path(
    get,
    path = "/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Export document", content_type = "application/json", body = String)
    )
)]
/// Exports the store. `?scope=full` adds vitals and medications.
#[axum::debug_handler]
async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let scope = match query.scope.as_deref() {
        None | Some("core") => ExportScope::Core,
        Some("full") => ExportScope::Full,
        Some(other) => {
            return Err(ApiError::Store(StoreError::InvalidInput(format!(
                "unknown export scope '{}' (expected 'core' or 'full')",
                other
            ))))
        }
    };
    let doc = state.repo().export_with(scope)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], doc))
}

#[utoipa::path(
    post,
    path = "/import",
    request_body(content = String, description = "Export document", content_type = "application/json"),
    responses(
        (status = 200, description = "Store replaced", body = ImportRes),
        (status = 400, description = "Malformed document; store untouched", body = ErrorRes)
    )
)]
/// Replaces the store contents with an export document.
///
/// The body is taken as raw text so that malformed JSON is reported as an import format error.
#[axum::debug_handler]
async fn import(State(state): State<AppState>, body: String) -> ApiResult<Json<ImportRes>> {
    let summary = state.repo().import_all(&body)?;
    Ok(Json(summary.into()))
}
