//! Entry listing and lookup endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use catalog_core::{Entry, EntryDetail};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for listing entries.
#[derive(Debug, Serialize)]
pub struct ListServersResponse {
    pub servers: Vec<Entry>,
    pub metadata: ListMetadata,
}

#[derive(Debug, Serialize)]
pub struct ListMetadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_cursor: String,
    pub count: usize,
}

/// List latest entries.
/// GET /v0/servers?cursor=&limit=&name=&version=
///
/// Every query parameter other than `cursor` and `limit` is treated as a
/// filter key, so unsupported keys are rejected rather than ignored.
pub async fn list_servers(
    State(state): State<AppState>,
    Query(mut params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListServersResponse>> {
    let cursor = params.remove("cursor").unwrap_or_default();
    let limit = match params.remove("limit") {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request(format!("invalid limit '{}'", raw)))?,
        None => 0,
    };

    let ctx = state.request_context();
    let (servers, next_cursor) = state
        .catalog()
        .list(&ctx, &params, &cursor, limit)
        .await?;

    Ok(Json(ListServersResponse {
        metadata: ListMetadata {
            next_cursor,
            count: servers.len(),
        },
        servers,
    }))
}

/// Get one entry with packages and remotes.
/// GET /v0/servers/:id
pub async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<EntryDetail>> {
    let ctx = state.request_context();
    let entry = state.catalog().get_by_id(&ctx, &id).await?;
    Ok(Json(entry))
}
