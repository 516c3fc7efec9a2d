//! HTTP surface: `POST /enqueue` and `GET /health`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pollq_core::{EnqueueBatchRequest, Enqueuer, PollqError};
use serde::Serialize;
use serde_json::json;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub enqueuer: Arc<Enqueuer>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/enqueue", post(enqueue))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueResponse {
    status: &'static str,
    count: usize,
    task_ids: Vec<String>,
}

async fn enqueue(
    State(state): State<AppState>,
    Json(request): Json<EnqueueBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.enqueuer.enqueue_batch(&request).await?;
    let body = EnqueueResponse {
        status: "queued",
        count: tasks.len(),
        task_ids: tasks.iter().map(|t| t.id().to_string()).collect(),
    };
    Ok((StatusCode::ACCEPTED, Json(body)))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Maps core errors onto HTTP status codes.
pub struct ApiError(PollqError);

impl From<PollqError> for ApiError {
    fn from(err: PollqError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "enqueue failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
