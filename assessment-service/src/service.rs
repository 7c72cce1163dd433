use assessment_flow::{
    AssessmentError, Condition, DurationBucket, EngineConfig, InMemorySessionStore, RiskScorer,
};
use axum::{
    Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::models::{AddDocumentsRequest, DocumentView, SessionResponse, SetFieldRequest};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn not_found_error(message: &str, id: &Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn error_response(session_id: &Uuid, err: AssessmentError) -> ApiError {
    match err {
        AssessmentError::SessionNotFound(id) => not_found_error("Session not found", &id),
        AssessmentError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "Validation failed",
                "session_id": session_id,
                "errors": errors
            })),
        ),
        AssessmentError::AnalysisInProgress => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "An analysis is already running",
                "session_id": session_id
            })),
        ),
        AssessmentError::UnknownOption { field, value } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Unknown option",
                "field": field,
                "value": value
            })),
        ),
        other => {
            error!("Request for session {} failed: {}", session_id, other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Assessment request failed",
                    "details": other.to_string()
                })),
            )
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: InMemorySessionStore,
}

pub fn create_app(scorer: Arc<dyn RiskScorer>, config: EngineConfig) -> Router {
    let app_state = AppState {
        sessions: InMemorySessionStore::new(scorer, config),
    };
    build_router(app_state)
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/conditions", get(list_conditions))
        .route("/assessments", post(create_assessment))
        .route(
            "/assessments/{session_id}",
            get(get_assessment).delete(delete_assessment),
        )
        .route("/assessments/{session_id}/fields", post(set_field))
        .route("/assessments/{session_id}/submit", post(submit_assessment))
        .route("/assessments/{session_id}/acknowledge", post(acknowledge))
        .route("/assessments/{session_id}/documents", post(add_documents))
        .route(
            "/assessments/{session_id}/documents/{document_id}",
            axum::routing::delete(remove_document),
        )
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Tags every request with a correlation id and runs it inside a span.
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Clinical Risk Assessment Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Vitals intake, single-flight risk scoring and supporting document catalog",
        "endpoints": {
            "GET /conditions": "Condition catalog and duration options",
            "POST /assessments": "Open a new assessment session",
            "GET /assessments/{session_id}": "Current form, analysis state, prediction and documents",
            "DELETE /assessments/{session_id}": "Close the session, cancelling any running analysis",
            "POST /assessments/{session_id}/fields": "Set one form field",
            "POST /assessments/{session_id}/submit": "Validate the form and start an analysis",
            "POST /assessments/{session_id}/acknowledge": "Accept a finished analysis",
            "POST /assessments/{session_id}/documents": "Add uploaded files to the catalog",
            "DELETE /assessments/{session_id}/documents/{document_id}": "Remove a file from the catalog",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_conditions() -> Json<Value> {
    Json(json!({
        "conditions": Condition::ALL.iter().map(Condition::label).collect::<Vec<_>>(),
        "durations": DurationBucket::ALL.iter().map(DurationBucket::label).collect::<Vec<_>>()
    }))
}

async fn create_assessment(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(json!({
            "session_id": session_id,
            "status": "idle"
        })),
    )
}

async fn get_assessment(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<SessionResponse> {
    let snapshot = state
        .sessions
        .with_session(&session_id, |session| session.snapshot())
        .map_err(|e| error_response(&session_id, e))?;

    Ok(Json(snapshot.into()))
}

async fn delete_assessment(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found_error("Session not found", &session_id))
    }
}

async fn set_field(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SetFieldRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .with_session(&session_id, |session| {
            session.set_field(request.field, request.value)
        })
        .and_then(|result| result)
        .map_err(|e| error_response(&session_id, e))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn submit_assessment(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    info!("Submitting assessment for session: {}", session_id);

    let handle = state
        .sessions
        .with_session(&session_id, |session| session.submit())
        .and_then(|result| result)
        .map_err(|e| {
            warn!("Submission for session {} refused: {}", session_id, e);
            error_response(&session_id, e)
        })?;

    // The outcome lands in the session; clients poll the session for it.
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "session_id": session_id,
            "status": "running",
            "analysis": handle.generation()
        })),
    ))
}

async fn acknowledge(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Value> {
    let status = state
        .sessions
        .with_session(&session_id, |session| session.acknowledge())
        .map_err(|e| error_response(&session_id, e))?;

    Ok(Json(json!({
        "session_id": session_id,
        "status": status
    })))
}

async fn add_documents(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddDocumentsRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let added = state
        .sessions
        .with_session(&session_id, |session| session.add_files(request.files))
        .map_err(|e| error_response(&session_id, e))?;

    let documents: Vec<DocumentView> = added.into_iter().map(DocumentView::from).collect();
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "session_id": session_id,
            "documents": documents
        })),
    ))
}

async fn remove_document(
    State(state): State<AppState>,
    Path((session_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .with_session(&session_id, |session| session.remove_file(&document_id))
        .map_err(|e| error_response(&session_id, e))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessment_flow::{RiskTier, ScoreReport, ScoreRequest, ScoringError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request as HttpRequest};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tower::ServiceExt;

    struct LowRiskScorer;

    #[async_trait]
    impl RiskScorer for LowRiskScorer {
        async fn score(&self, _request: ScoreRequest) -> Result<ScoreReport, ScoringError> {
            Ok(ScoreReport::standard(RiskTier::Low, 92))
        }
    }

    /// Never answers, so every run stays in flight until cancelled.
    struct HeldScorer {
        gate: Semaphore,
    }

    #[async_trait]
    impl RiskScorer for HeldScorer {
        async fn score(&self, _request: ScoreRequest) -> Result<ScoreReport, ScoringError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ScoringError::Transient(e.to_string()))?;
            Ok(ScoreReport::standard(RiskTier::Low, 92))
        }
    }

    fn app() -> Router {
        create_app(Arc::new(LowRiskScorer), EngineConfig::immediate())
    }

    fn held_app() -> Router {
        let scorer = HeldScorer {
            gate: Semaphore::new(0),
        };
        create_app(Arc::new(scorer), EngineConfig::immediate())
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn open_session(app: &Router) -> String {
        let (status, body) = call(app, Method::POST, "/assessments", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn set(app: &Router, id: &str, field: &str, value: &str) -> StatusCode {
        let uri = format!("/assessments/{id}/fields");
        call(app, Method::POST, &uri, Some(json!({ "field": field, "value": value })))
            .await
            .0
    }

    async fn fill_reference_form(app: &Router, id: &str) {
        for (field, value) in [
            ("age", "35"),
            ("bmi", "24.5"),
            ("bloodPressure", "120/80"),
            ("glucoseLevel", "95"),
            ("selectedCondition", "Diabetes"),
            ("durationBucket", "1-4 weeks"),
        ] {
            assert_eq!(set(app, id, field, value).await, StatusCode::NO_CONTENT);
        }
    }

    #[tokio::test]
    async fn full_assessment_round() {
        let app = app();
        let id = open_session(&app).await;

        fill_reference_form(&app, &id).await;

        let (status, body) = call(&app, Method::POST, &format!("/assessments/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "running");

        let mut session = Value::Null;
        for _ in 0..100 {
            let (_, current) = call(&app, Method::GET, &format!("/assessments/{id}"), None).await;
            if current["status"] == "complete" {
                session = current;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(session["analyzing"], false);
        assert_eq!(session["prediction"]["outcomeLabel"], "Low Risk of Diabetes");
        assert_eq!(session["prediction"]["confidencePercent"], 92);
        assert_eq!(session["prediction"]["riskTier"], "low");

        let (status, body) =
            call(&app, Method::POST, &format!("/assessments/{id}/acknowledge"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
    }

    #[tokio::test]
    async fn running_analysis_conflicts_and_closes_cleanly() {
        let app = held_app();
        let id = open_session(&app).await;
        fill_reference_form(&app, &id).await;

        let submit = format!("/assessments/{id}/submit");
        let (status, body) = call(&app, Method::POST, &submit, None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "running");

        let (status, body) = call(&app, Method::POST, &submit, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "An analysis is already running");
        assert_eq!(body["session_id"], id);

        let (status, session) = call(&app, Method::GET, &format!("/assessments/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["status"], "running");
        assert_eq!(session["analyzing"], true);
        assert_eq!(session["prediction"], Value::Null);

        let (status, _) = call(&app, Method::DELETE, &format!("/assessments/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, Method::GET, &format!("/assessments/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn validation_errors_are_unprocessable() {
        let app = app();
        let id = open_session(&app).await;
        set(&app, &id, "bloodPressure", "120").await;

        let (status, body) = call(&app, Method::POST, &format!("/assessments/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"],
            json!([
                { "kind": "invalid_field", "field": "bloodPressure" },
                { "kind": "missing_condition" }
            ])
        );

        let (_, session) = call(&app, Method::GET, &format!("/assessments/{id}"), None).await;
        assert_eq!(session["status"], "idle");
    }

    #[tokio::test]
    async fn unknown_select_option_is_bad_request() {
        let app = app();
        let id = open_session(&app).await;
        assert_eq!(
            set(&app, &id, "durationBucket", "a fortnight").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn documents_are_listed_with_display_size() {
        let app = app();
        let id = open_session(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/assessments/{id}/documents"),
            Some(json!({
                "files": [
                    { "name": "mri.png", "sizeBytes": 1048576, "mimeType": "image/png" },
                    { "name": "labs.pdf", "sizeBytes": 2048, "mimeType": "application/pdf" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["documents"][0]["size"], "1.00 MB");
        assert_eq!(body["documents"][0]["kind"], "Image");
        assert_eq!(body["documents"][1]["kind"], "PDF");

        let doc_id = body["documents"][0]["id"].as_str().unwrap().to_string();
        for _ in 0..2 {
            let (status, _) = call(
                &app,
                Method::DELETE,
                &format!("/assessments/{id}/documents/{doc_id}"),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (_, session) = call(&app, Method::GET, &format!("/assessments/{id}"), None).await;
        assert_eq!(session["documents"].as_array().unwrap().len(), 1);
        assert_eq!(session["documents"][0]["name"], "labs.pdf");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app();
        let missing = Uuid::new_v4();

        let (status, body) = call(&app, Method::GET, &format!("/assessments/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["session_id"], missing.to_string());

        let (status, _) = call(&app, Method::DELETE, &format!("/assessments/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn closing_session_forgets_it() {
        let app = app();
        let id = open_session(&app).await;

        let (status, _) = call(&app, Method::DELETE, &format!("/assessments/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, Method::GET, &format!("/assessments/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conditions_catalog_lists_other_last() {
        let (status, body) = call(&app(), Method::GET, "/conditions", None).await;
        assert_eq!(status, StatusCode::OK);
        let conditions = body["conditions"].as_array().unwrap();
        assert_eq!(conditions.len(), 13);
        assert_eq!(conditions.last().unwrap(), "Other (Custom)");
        assert_eq!(body["durations"][1], "1-4 weeks");
    }
}
