use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use chrono::Utc;
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_api_key;
use crate::dto::{
    FeedbackQuery, FeedbackResponse, HealthResponse, MessageResponse, PatientQueueResponse,
    PolicyResponse, PredictRequest, RiskPredictionResponse, UpdatePrioritiesResponse,
    WelcomeResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Vital-sign payloads are small; anything larger is rejected with 413.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// The served application: API routes with trailing slashes trimmed, the
/// documentation UIs, and request tracing plus CORS.
///
/// Swagger UI redirects `/docs` to `/docs/`, so the docs are routed before
/// path normalisation and only unmatched requests fall through to the API.
pub fn app(state: Arc<AppState>) -> Router {
    let api = NormalizePathLayer::trim_trailing_slash().layer(router(state));

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .fallback_service(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// API routes with auth and the body limit applied.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/queue/clear", delete(clear_queue))
        .route("/feedback", post(feedback))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/queue", get(get_queue))
        .route("/queue/update-priorities", post(update_priorities))
        .route("/queue/next", get(next_patient))
        .route("/policy", get(policy))
        .route("/health", get(health))
        .merge(protected)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome message", body = WelcomeResponse),
    ),
    tag = "system"
)]
pub async fn root() -> impl IntoResponse {
    axum::Json(WelcomeResponse {
        message: "Welcome to the Triage risk predictor with priority scheduling".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Patient assessed and admitted", body = RiskPredictionResponse),
        (status = 422, description = "Invalid vital signs", body = crate::dto::ErrorResponse),
    ),
    tag = "prediction"
)]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<axum::Json<PredictRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let axum::Json(body) = body?;
    let vitals = body.into_vitals()?;

    let entry = state.desk.admit(vitals).await?;

    Ok(axum::Json(RiskPredictionResponse::from(entry)))
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/queue",
    responses(
        (status = 200, description = "Patients ordered by priority", body = [PatientQueueResponse]),
    ),
    tag = "queue"
)]
pub async fn get_queue(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let queue: Vec<PatientQueueResponse> = state
        .desk
        .queue()
        .await
        .into_iter()
        .map(PatientQueueResponse::from)
        .collect();

    axum::Json(queue)
}

#[utoipa::path(
    post,
    path = "/queue/update-priorities",
    responses(
        (status = 200, description = "Priorities recomputed", body = UpdatePrioritiesResponse),
    ),
    tag = "queue"
)]
pub async fn update_priorities(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let counts = state.desk.refresh_priorities().await;
    axum::Json(UpdatePrioritiesResponse::from(counts))
}

#[utoipa::path(
    delete,
    path = "/queue/clear",
    responses(
        (status = 200, description = "Queue cleared", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "queue"
)]
pub async fn clear_queue(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let removed = state.desk.clear().await;
    axum::Json(MessageResponse {
        message: format!("Cleared {removed} patients from queue"),
    })
}

#[utoipa::path(
    get,
    path = "/queue/next",
    responses(
        (status = 200, description = "Next patient to be seen, removed from the queue", body = PatientQueueResponse),
        (status = 404, description = "Queue is empty", body = crate::dto::ErrorResponse),
    ),
    tag = "queue"
)]
pub async fn next_patient(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state.desk.next_patient().await?;
    Ok(axum::Json(PatientQueueResponse::from(entry)))
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/feedback",
    params(FeedbackQuery),
    responses(
        (status = 200, description = "Feedback recorded", body = FeedbackResponse),
        (status = 422, description = "Invalid feedback", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "scheduling"
)]
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeedbackQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let outcome = query.outcome(Utc::now());

    let receipt = state
        .desk
        .record_feedback(&query.patient_id, outcome.clone())
        .await?;

    let message = if receipt.learned {
        "Feedback received and scheduling policy updated"
    } else {
        "Feedback received"
    };

    Ok(axum::Json(FeedbackResponse {
        message: message.to_string(),
        patient_id: receipt.patient_id,
        outcome: outcome.into(),
        learned: receipt.learned,
        reward: receipt.reward,
    }))
}

#[utoipa::path(
    get,
    path = "/policy",
    responses(
        (status = 200, description = "Scheduling policy statistics", body = PolicyResponse),
    ),
    tag = "scheduling"
)]
pub async fn policy(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(PolicyResponse::from(state.desk.policy_stats().await))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        model: state.desk.model_name().to_string(),
        queue_length: state.desk.len().await,
    };

    (StatusCode::OK, axum::Json(response))
}
