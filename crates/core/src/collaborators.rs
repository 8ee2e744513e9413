//! Interfaces to services outside the record store.
//!
//! Transcription, insight generation and document upload are remote and optional. The store never
//! waits on them: a caller runs the collaborator, then hands the finished result to the repository
//! as an ordinary note.
//!
//! Each interface ships with a local implementation so the binaries work without any service
//! configured: [`PlaceholderTranscriber`], [`PlaceholderInsights`] and [`DirectoryUploader`].

use crate::constants::PLACEHOLDER_TRANSCRIPT;
use crate::records::{NewClinicalNote, NoteType};
use crate::store::encode_key;
use chrono::{DateTime, Utc};
use mediq_ids::{RecordId, RecordKind};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("no transcription returned")]
    EmptyTranscript,
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("insight request failed: {0}")]
    Insights(String),
}

/// Recorded audio awaiting transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    /// MIME type, e.g. `audio/webm`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AudioPayload {
    pub fn webm(bytes: Vec<u8>) -> Self {
        Self {
            content_type: "audio/webm".into(),
            bytes,
        }
    }
}

/// Speech-to-text service.
pub trait Transcriber: Send + Sync {
    /// Returns the transcript of `audio`.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError::Transcription` if the service fails, or
    /// `CollaboratorError::EmptyTranscript` if it returns no text.
    fn transcribe(&self, audio: &AudioPayload) -> Result<String, CollaboratorError>;
}

/// Stand-in used when no transcription service is configured. Always returns the same text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTranscriber;

impl Transcriber for PlaceholderTranscriber {
    fn transcribe(&self, _audio: &AudioPayload) -> Result<String, CollaboratorError> {
        tracing::warn!("no transcription service configured, returning placeholder transcript");
        Ok(PLACEHOLDER_TRANSCRIPT.to_string())
    }
}

/// Acknowledgement from a document upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Where the uploaded document can be retrieved.
    pub file_url: String,
}

/// Document storage for a patient's files. The record store keeps only the reference.
pub trait DocumentUploader: Send + Sync {
    fn upload(&self, patient_id: &str, payload: &[u8]) -> Result<UploadReceipt, CollaboratorError>;
}

/// Stores uploads as files under `root`, one directory per patient.
///
/// Patient ids are escaped the same way the file store escapes keys, so every upload lands inside
/// `root`. The receipt carries a `file://` URL.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentUploader for DirectoryUploader {
    fn upload(&self, patient_id: &str, payload: &[u8]) -> Result<UploadReceipt, CollaboratorError> {
        if payload.is_empty() {
            return Err(CollaboratorError::Upload("document is empty".into()));
        }
        let dir_name =
            encode_key(patient_id).map_err(|e| CollaboratorError::Upload(e.to_string()))?;
        let dir = self.root.join(dir_name);
        fs::create_dir_all(&dir).map_err(|e| CollaboratorError::Upload(e.to_string()))?;

        let path = dir.join(RecordId::generate(RecordKind::Document).to_string());
        fs::write(&path, payload).map_err(|e| CollaboratorError::Upload(e.to_string()))?;

        tracing::info!(
            "stored {} byte document for patient {} at {}",
            payload.len(),
            patient_id,
            path.display()
        );
        Ok(UploadReceipt {
            file_url: format!("file://{}", path.display()),
        })
    }
}

/// Findings an insight service attaches to a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteInsights {
    pub insights: Vec<String>,
    pub actions: Vec<String>,
}

/// Clinical insight service: reads note content and suggests findings and follow-up actions.
pub trait InsightGenerator: Send + Sync {
    fn analyse(&self, content: &str) -> Result<NoteInsights, CollaboratorError>;
}

/// Stand-in used when no insight service is configured. Finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderInsights;

impl InsightGenerator for PlaceholderInsights {
    fn analyse(&self, _content: &str) -> Result<NoteInsights, CollaboratorError> {
        tracing::debug!("no insight service configured, note left without insights");
        Ok(NoteInsights::default())
    }
}

/// Fills in `insights` and `actions` from `generator` when the note carries neither.
///
/// Best effort: a failing service is logged and the note is returned unchanged. Empty lists
/// are not attached.
pub fn annotate_note(
    generator: &dyn InsightGenerator,
    mut note: NewClinicalNote,
) -> NewClinicalNote {
    if note.insights.is_some() || note.actions.is_some() {
        return note;
    }
    match generator.analyse(&note.content) {
        Ok(found) => {
            note.insights = Some(found.insights).filter(|list| !list.is_empty());
            note.actions = Some(found.actions).filter(|list| !list.is_empty());
        }
        Err(e) => {
            tracing::warn!("insights unavailable for patient {}: {}", note.patient_id, e);
        }
    }
    note
}

/// Builds a voice note from a finished transcript.
///
/// # Errors
///
/// Returns `CollaboratorError::EmptyTranscript` if the transcript is blank.
pub fn voice_note(
    patient_id: &str,
    transcript: &str,
    date: DateTime<Utc>,
) -> Result<NewClinicalNote, CollaboratorError> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(CollaboratorError::EmptyTranscript);
    }
    Ok(NewClinicalNote {
        patient_id: patient_id.to_string(),
        date,
        note_type: NoteType::Voice,
        content: transcript.to_string(),
        transcript: Some(transcript.to_string()),
        insights: None,
        actions: None,
    })
}

/// Runs `transcriber` over `audio` and wraps the result as a voice note dated now.
pub fn transcribe_note(
    transcriber: &dyn Transcriber,
    patient_id: &str,
    audio: &AudioPayload,
) -> Result<NewClinicalNote, CollaboratorError> {
    let transcript = transcriber.transcribe(audio)?;
    voice_note(patient_id, &transcript, Utc::now())
}

/// Uploads a document and builds a text note referencing it.
pub fn document_note(
    uploader: &dyn DocumentUploader,
    patient_id: &str,
    description: &str,
    payload: &[u8],
) -> Result<NewClinicalNote, CollaboratorError> {
    let receipt = uploader.upload(patient_id, payload)?;
    let description = description.trim();
    let content = if description.is_empty() {
        format!("Document: {}", receipt.file_url)
    } else {
        format!("{}\n\nDocument: {}", description, receipt.file_url)
    };
    Ok(NewClinicalNote::text(patient_id, content))
}
