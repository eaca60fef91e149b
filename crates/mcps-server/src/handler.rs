use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mcps_records::{RecordError, RecordId, RecordResult};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Envelope for every record endpoint.
///
/// `state: false` carries a human-readable error in `response`; the HTTP
/// status stays 200.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub state: bool,
    pub response: Value,
}

impl ApiResponse {
    pub fn success(response: impl Serialize) -> ServerResult<Self> {
        let response =
            serde_json::to_value(response).map_err(|e| ServerError::Internal(e.to_string()))?;
        Ok(Self { state: true, response })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { state: false, response: Value::String(message.into()) }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn respond<T: Serialize>(operation: &str, result: RecordResult<T>) -> ServerResult<Json<ApiResponse>> {
    match result {
        Ok(value) => Ok(Json(ApiResponse::success(value)?)),
        Err(err @ RecordError::Serialization(_)) => Err(err.into()),
        Err(err) => {
            tracing::warn!(operation, error = %err, "record operation failed");
            Ok(Json(ApiResponse::failure(err.to_string())))
        }
    }
}

fn parse_record_id(raw: &str) -> Result<RecordId, Json<ApiResponse>> {
    RecordId::parse(raw).map_err(|e| Json(ApiResponse::failure(e.to_string())))
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn create_handler(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ServerResult<Json<ApiResponse>> {
    let result = state.records().create(payload).await;
    respond("create", result.map(|published| published.address))
}

pub async fn modify_handler(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ServerResult<Json<ApiResponse>> {
    let result = state.records().update(payload).await;
    respond("modify", result.map(|published| published.address))
}

pub async fn list_handler(State(state): State<AppState>) -> ServerResult<Json<ApiResponse>> {
    respond("list", state.records().list().await)
}

pub async fn record_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<ApiResponse>> {
    let record = match parse_record_id(&id) {
        Ok(record) => record,
        Err(failure) => return Ok(failure),
    };
    respond("get", state.records().get(&record).await)
}

pub async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<ApiResponse>> {
    let record = match parse_record_id(&id) {
        Ok(record) => record,
        Err(failure) => return Ok(failure),
    };
    respond("history", state.records().history(&record).await)
}
