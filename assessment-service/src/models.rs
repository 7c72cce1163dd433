use assessment_flow::{
    AnalysisState, DiseaseContext, DocumentKind, FileDescriptor, FormField, PatientVitals,
    Prediction, ScoringError, SessionSnapshot, UploadedDocument,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct SetFieldRequest {
    pub field: FormField,
    pub value: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddDocumentsRequest {
    pub files: Vec<FileDescriptor>,
}

/// Catalog entry as the dashboard shows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub size: String,
    pub kind: DocumentKind,
    pub uploaded_at: DateTime<Utc>,
}

impl From<UploadedDocument> for DocumentView {
    fn from(document: UploadedDocument) -> Self {
        Self {
            size: document.size_display(),
            id: document.id,
            name: document.name,
            size_bytes: document.size_bytes,
            kind: document.kind,
            uploaded_at: document.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub status: AnalysisState,
    /// True while the submit button should stay disabled.
    pub analyzing: bool,
    pub vitals: PatientVitals,
    pub disease: DiseaseContext,
    pub prediction: Option<Prediction>,
    pub last_failure: Option<ScoringError>,
    pub documents: Vec<DocumentView>,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            session_id: snapshot.id,
            status: snapshot.analysis_state,
            analyzing: snapshot.analysis_state == AnalysisState::Running,
            vitals: snapshot.vitals,
            disease: snapshot.disease,
            prediction: snapshot.prediction,
            last_failure: snapshot.last_failure,
            documents: snapshot.documents.into_iter().map(DocumentView::from).collect(),
        }
    }
}
