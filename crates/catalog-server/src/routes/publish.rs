//! Publish endpoint.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::Serialize;

use catalog_core::EntryDetail;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for a successful publish.
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub message: String,
    pub id: String,
}

/// Publish a new version of an entry.
/// POST /v0/publish
pub async fn publish_server(
    State(state): State<AppState>,
    body: Result<Json<EntryDetail>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PublishResponse>)> {
    let Json(entry) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let ctx = state.request_context();
    let stored = state.catalog().publish(&ctx, entry).await?;

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            message: "Server publication successful".to_string(),
            id: stored.id().to_string(),
        }),
    ))
}
