//! Newsletter subscriber listing.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use qyve_core::SubscriptionStatus;

use crate::db::SubscriberRepository;
use crate::error::Result;
use crate::extract::ApiQuery;
use crate::models::subscriber::Subscriber;
use crate::models::{Page, Pagination};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscriberQuery {
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[instrument(skip(state))]
pub async fn subscribers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SubscriberQuery>,
) -> Result<Json<Page<Subscriber>>> {
    let pagination = Pagination {
        page: query.page,
        per_page: query.per_page,
    };
    let page = SubscriberRepository::new(state.pool())
        .list(query.status, pagination)
        .await?;
    Ok(Json(page))
}
