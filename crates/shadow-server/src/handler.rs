use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shadow_entry::{EntryManager, EntryResult};

use crate::error::ApiError;
use crate::state::AppState;

/// Status body shared by every non-data response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub message: String,
}

impl ApiResponse {
    pub fn success() -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: "Success".to_string(),
        }
    }
}

/// Query parameters. Which ones are required depends on the route.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    pub entry: Option<String>,
    /// Section name.
    pub name: Option<String>,
    pub id: Option<String>,
}

fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(ApiError::bad_request)
}

/// Run an entry operation on the blocking pool.
async fn blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&EntryManager) -> EntryResult<T> + Send + 'static,
{
    let entries = Arc::clone(&state.entries);
    tokio::task::spawn_blocking(move || op(&entries))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn json_bytes(bytes: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], bytes).into_response()
}

/// `GET /api/v1/removeEntry?entry=`
pub async fn remove_entry(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<ApiResponse>, ApiError> {
    let entry = required(params.entry)?;
    blocking(&state, move |entries| entries.remove_entry(&entry)).await?;
    Ok(Json(ApiResponse::success()))
}

/// `POST /api/v1/addItem?entry=&name=` with the item as the body.
pub async fn add_item(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    body: Bytes,
) -> Result<Json<ApiResponse>, ApiError> {
    let entry = required(params.entry)?;
    let section = required(params.name)?;
    blocking(&state, move |entries| entries.add_item(&entry, &section, &body)).await?;
    Ok(Json(ApiResponse::success()))
}

/// `GET /api/v1/removeItem?entry=&name=[&id=]`; no `id` drops the section.
pub async fn remove_item(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<ApiResponse>, ApiError> {
    let entry = required(params.entry)?;
    let section = required(params.name)?;
    let id = params.id.unwrap_or_default();
    blocking(&state, move |entries| entries.remove_item(&entry, &section, &id)).await?;
    Ok(Json(ApiResponse::success()))
}

/// `GET /api/v1/getIndexes`
pub async fn get_indexes(State(state): State<AppState>) -> Result<Response, ApiError> {
    let bytes = blocking(&state, |entries| entries.index_to_json()).await?;
    Ok(json_bytes(bytes))
}

/// `GET /api/v1/getEntry?entry=`
pub async fn get_entry(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Response, ApiError> {
    let entry = required(params.entry)?;
    let bytes = blocking(&state, move |entries| entries.to_json(&entry)).await?;
    Ok(json_bytes(bytes))
}

/// `GET /api/v1/health`
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let count = blocking(&state, |entries| entries.len()).await?;
    Ok(Json(json!({ "status": "ok", "entries": count })))
}

/// Fallback for unknown routes and methods.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": 404, "error": "404, page not exists!" })),
    )
}
