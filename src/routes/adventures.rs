// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Adventure read/write routes.

use crate::error::{AppError, Result};
use crate::models::{
    Adventure, AdventureCreate, AdventureQuery, ListParams, SweepRequest, SweepResponse,
};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use validator::Validate;

/// Adventure routes. Both the bare and trailing-slash paths are served.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/adventures", get(list_adventures).post(upsert_adventure))
        .route("/adventures/", get(list_adventures).post(upsert_adventure))
        .route("/adventures/sweep", post(sweep_adventures))
}

/// Create an adventure, or replace the one with the same `unique_id`.
async fn upsert_adventure(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<AdventureCreate>, AppError>,
) -> Result<Json<Adventure>> {
    payload.validate()?;

    let unique_id = payload.unique_id.clone();
    let stored = state.db.upsert_adventure(payload).await?.ok_or_else(|| {
        AppError::BadRequest("Failed to create or update adventure.".to_string())
    })?;

    tracing::debug!(unique_id = %unique_id, "Adventure upserted");
    Ok(Json(stored))
}

/// List adventures with filtering, sorting and pagination.
async fn list_adventures(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, AppError>,
) -> Result<Json<Vec<Adventure>>> {
    let query = AdventureQuery::from(params);

    tracing::debug!(
        limit = query.limit,
        offset = query.offset,
        sort = ?query.sort,
        activity_type = ?query.activity_type,
        location = ?query.location,
        "Listing adventures"
    );

    let adventures = state.db.list_adventures(&query).await?;
    Ok(Json(adventures))
}

/// Delete a provider's records that no run has re-observed since `seen_before`.
async fn sweep_adventures(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<SweepRequest>, AppError>,
) -> Result<Json<SweepResponse>> {
    let provider_name = request.provider_name.trim();
    if provider_name.is_empty() {
        return Err(AppError::BadRequest(
            "provider_name must not be empty".to_string(),
        ));
    }

    let deleted = state
        .db
        .sweep_stale(provider_name, request.seen_before)
        .await?;

    tracing::info!(
        provider = provider_name,
        seen_before = %request.seen_before,
        deleted,
        "Sweep complete"
    );

    Ok(Json(SweepResponse { deleted }))
}
