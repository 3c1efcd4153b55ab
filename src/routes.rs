use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    config::Timeouts,
    models::{GenerateRequest, UserInput, ValidationError},
    orchestrator::{AttemptOutcome, CampaignOrchestrator, GenerationState, Phase},
    pdf::{generate_pdf, ExportError},
    services::{ImageService, StrategyService},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, Arc<CampaignOrchestrator>>>>,
    pub strategy: Arc<dyn StrategyService>,
    pub image: Arc<dyn ImageService>,
    pub timeouts: Timeouts,
}

impl AppState {
    pub fn new(strategy: Arc<dyn StrategyService>, image: Arc<dyn ImageService>, timeouts: Timeouts) -> Self {
        Self { store: Arc::default(), strategy, image, timeouts }
    }

    fn session(&self, id: Uuid) -> Result<Arc<CampaignOrchestrator>, ApiError> {
        self.store.read().get(&id).cloned().ok_or(ApiError::NotFound(id))
    }

    /// Drops sessions untouched for longer than `max_idle`. Sessions with an
    /// attempt in flight are kept. Returns how many were removed.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let cutoff = Utc::now() - max_idle;
        let mut store = self.store.write();
        let before = store.len();
        store.retain(|_, session| {
            let state = session.state();
            state.phase.is_generating() || state.updated_at > cutoff
        });
        before - store.len()
    }
}

/// Periodically drops idle sessions until the process exits.
pub async fn sweep_sessions(state: AppState, max_idle: Duration) {
    let mut ticker = tokio::time::interval(max_idle.min(Duration::from_secs(60)));
    loop {
        ticker.tick().await;
        let removed = state.sweep_idle(max_idle);
        if removed > 0 {
            tracing::info!(removed, "🧹 Dropped idle sessions");
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("campaign is not ready for export (phase: {0:?})")]
    NotReady(Phase),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady(_) => StatusCode::CONFLICT,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub state: GenerationState,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/generate", post(generate_campaign))
        .route("/api/sessions/:id/reset", post(reset_campaign))
        .route("/api/sessions/:id/pdf", get(export_pdf))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let id = Uuid::new_v4();
    let orchestrator = Arc::new(CampaignOrchestrator::new(
        state.strategy.clone(),
        state.image.clone(),
        state.timeouts,
    ));
    let snapshot = orchestrator.state();
    state.store.write().insert(id, orchestrator);
    tracing::info!(%id, "🆕 Session created");
    (StatusCode::CREATED, Json(SessionResponse { id, state: snapshot }))
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<GenerationState>, ApiError> {
    Ok(Json(state.session(id)?.state()))
}

pub async fn delete_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let removed = state.store.write().remove(&id).ok_or(ApiError::NotFound(id))?;
    // Stops late responses of an in-flight attempt from touching the dropped state.
    removed.reset();
    tracing::info!(%id, "🗑️ Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Runs one attempt and answers with the state it left behind.
pub async fn generate_campaign(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerationState>, ApiError> {
    let orchestrator = state.session(id)?;
    let input = UserInput::try_from(body)?;

    tracing::info!(%id, category = %input.category, "🚀 Starting campaign generation");
    let outcome = orchestrator.clone().start_generation(input).await;

    match &outcome {
        AttemptOutcome::Complete { attempt, with_image } => {
            tracing::info!(%id, attempt, with_image, "✅ Campaign generated")
        }
        AttemptOutcome::Failed { attempt, message } => {
            tracing::warn!(%id, attempt, "Campaign generation failed: {}", message)
        }
        AttemptOutcome::Discarded { attempt } => {
            tracing::info!(%id, attempt, "Attempt superseded before it finished")
        }
    }
    Ok(Json(orchestrator.state()))
}

pub async fn reset_campaign(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<GenerationState>, ApiError> {
    let orchestrator = state.session(id)?;
    orchestrator.reset();
    Ok(Json(orchestrator.state()))
}

pub async fn export_pdf(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.session(id)?.state();
    let strategy = match (&snapshot.phase, &snapshot.strategy) {
        (Phase::Complete, Some(strategy)) => strategy.clone(),
        _ => return Err(ApiError::NotReady(snapshot.phase)),
    };

    let pdf_bytes = generate_pdf(&strategy)?;
    tracing::info!(%id, bytes = pdf_bytes.len(), "📄 Production deck exported");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let disposition = format!("attachment; filename=\"adcreative_campaign_{}.pdf\"", id);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((StatusCode::OK, headers, Bytes::from(pdf_bytes)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gemini::GeminiClient;
    use crate::services::ServiceError;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let demo = Arc::new(GeminiClient::new(&Config::default()));
        router(AppState::new(demo.clone(), demo, Timeouts::default()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes)
    }

    async fn new_session(app: &Router) -> String {
        let (status, _, body) = send(app, Method::POST, "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["state"]["phase"], "idle");
        value["id"].as_str().unwrap().to_string()
    }

    fn form() -> Value {
        json!({
            "experience": "My skin cleared up in 3 days",
            "category": "Skincare",
            "productLink": "https://x.com/p",
            "adType": "UGC",
            "ugcStyle": "Problem / Solution"
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, _, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn generate_then_export() {
        let app = app();
        let id = new_session(&app).await;

        let (status, _, body) = send(&app, Method::POST, &format!("/api/sessions/{id}/generate"), Some(form())).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["phase"], "complete");
        assert_eq!(value["strategy"]["storyboard"].as_array().unwrap().len(), 5);
        assert!(value["imageUrl"].as_str().unwrap().starts_with("data:image/"));
        assert!(value["errorMessage"].is_null());

        let (status, headers, body) = send(&app, Method::GET, &format!("/api/sessions/{id}/pdf"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_before_generation() {
        let app = app();
        let id = new_session(&app).await;
        let mut body = form();
        body["ugcStyle"] = Value::Null;

        let (status, _, response) = send(&app, Method::POST, &format!("/api/sessions/{id}/generate"), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value: Value = serde_json::from_slice(&response).unwrap();
        assert!(value["error"].as_str().unwrap().contains("UGC production style"));

        let (_, _, state) = send(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
        let value: Value = serde_json::from_slice(&state).unwrap();
        assert_eq!(value["phase"], "idle");
    }

    #[tokio::test]
    async fn export_requires_a_complete_campaign() {
        let app = app();
        let id = new_session(&app).await;
        let (status, _, _) = send(&app, Method::GET, &format!("/api/sessions/{id}/pdf"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let app = app();
        let id = new_session(&app).await;
        send(&app, Method::POST, &format!("/api/sessions/{id}/generate"), Some(form())).await;

        let (status, _, body) = send(&app, Method::POST, &format!("/api/sessions/{id}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["phase"], "idle");
        assert!(value["strategy"].is_null());
        assert!(value["imageUrl"].is_null());
    }

    struct Crashing;

    #[async_trait::async_trait]
    impl StrategyService for Crashing {
        async fn generate_strategy(&self, _prompt: &str, _schema: &Value) -> Result<String, ServiceError> {
            panic!("strategy backend crashed")
        }
    }

    #[tokio::test]
    async fn crashed_generation_leaves_session_failed() {
        let demo = Arc::new(GeminiClient::new(&Config::default()));
        let app = router(AppState::new(Arc::new(Crashing), demo, Timeouts::default()));
        let id = new_session(&app).await;

        let (status, _, body) = send(&app, Method::POST, &format!("/api/sessions/{id}/generate"), Some(form())).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["phase"], "failed");
        assert!(value["errorMessage"].as_str().unwrap().contains("agency engine"));

        let (_, _, state) = send(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
        let value: Value = serde_json::from_slice(&state).unwrap();
        assert_eq!(value["phase"], "failed");
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_sessions() {
        let demo = Arc::new(GeminiClient::new(&Config::default()));
        let state = AppState::new(demo.clone(), demo, Timeouts::default());
        let app = router(state.clone());
        let id = new_session(&app).await;

        assert_eq!(state.sweep_idle(Duration::from_secs(3600)), 0);
        assert_eq!(state.store.read().len(), 1);

        assert_eq!(state.sweep_idle(Duration::ZERO), 1);
        let (status, _, _) = send(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_and_deleted_sessions_are_not_found() {
        let app = app();
        let (status, _, _) = send(&app, Method::GET, &format!("/api/sessions/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = new_session(&app).await;
        let (status, _, _) = send(&app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = send(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
