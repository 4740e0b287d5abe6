use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lore_domain::Passage;
use lore_engine::{Error as EngineError, SearchRequest, SearchResponse};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/index/upsert", post(upsert))
		.route("/v1/index/delete", post(delete))
		.with_state(state)
}

/// Loopback-only surface; bulk permission invalidation must not be callable
/// from outside the host.
pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/invalidate", post(invalidate)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.engine.search(payload).await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct UpsertRequest {
	passages: Vec<Passage>,
}

#[derive(Debug, Serialize)]
struct UpsertResponse {
	upserted: usize,
}

async fn upsert(
	State(state): State<AppState>,
	Json(payload): Json<UpsertRequest>,
) -> Json<UpsertResponse> {
	let upserted = state.engine.corpus().upsert(payload.passages);

	Json(UpsertResponse { upserted })
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
	passage_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
	deleted: usize,
}

async fn delete(
	State(state): State<AppState>,
	Json(payload): Json<DeleteRequest>,
) -> Json<DeleteResponse> {
	let deleted = state.engine.corpus().delete(&payload.passage_ids);

	Json(DeleteResponse { deleted })
}

#[derive(Debug, Deserialize)]
struct InvalidateRequest {
	identity: String,
}

#[derive(Debug, Serialize)]
struct InvalidateResponse {
	invalidated: usize,
}

async fn invalidate(
	State(state): State<AppState>,
	Json(payload): Json<InvalidateRequest>,
) -> Json<InvalidateResponse> {
	let invalidated = state.engine.permissions().invalidate(&payload.identity);

	Json(InvalidateResponse { invalidated })
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl From<EngineError> for ApiError {
	fn from(err: EngineError) -> Self {
		let (status, error_code) = match &err {
			EngineError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			EngineError::RetrievalUnavailable { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "retrieval_unavailable"),
			EngineError::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
		};

		Self { status, error_code: error_code.to_string(), message: err.to_string() }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
