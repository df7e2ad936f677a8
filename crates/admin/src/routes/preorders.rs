//! Pre-order route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use qyve_core::{PreorderId, PreorderStatus};

use super::optional_text;
use crate::db::{PreorderRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::preorder::Preorder;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreorderListQuery {
    #[serde(default)]
    pub status: Option<PreorderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PreorderUpdateRequest {
    pub status: PreorderStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PreorderListQuery>,
) -> Result<Json<Vec<Preorder>>> {
    let preorders = PreorderRepository::new(state.pool())
        .list(query.status)
        .await?;
    Ok(Json(preorders))
}

#[instrument(skip(state, request), fields(status = %request.status))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PreorderId>,
    ApiJson(request): ApiJson<PreorderUpdateRequest>,
) -> Result<Json<Preorder>> {
    let notes = optional_text(request.notes);
    let preorder = PreorderRepository::new(state.pool())
        .update_status(id, request.status, notes.as_deref())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("pre-order {id}")),
            other => other.into(),
        })?;
    Ok(Json(preorder))
}
