//! Per-device progress endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::models::{
    validate_device_id, validate_record, CloudSyncRecord, DeleteResponse, ProgressBody,
    UpsertResponse,
};
use crate::AppState;

/// GET /api/progress/:device_id
/// Returns every row stored for the device
pub async fn get_progress(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<ProgressBody>> {
    validate_device_id(&device_id)?;

    let records = state
        .db
        .get_progress(&device_id)
        .await?
        .into_iter()
        .map(|row| row.into_record())
        .collect();

    Ok(Json(ProgressBody { records }))
}

/// PUT /api/progress/:device_id
/// Upserts a batch of rows
pub async fn put_progress(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(body): Json<ProgressBody>,
) -> Result<Json<UpsertResponse>> {
    validate_device_id(&device_id)?;
    for (&card_id, record) in &body.records {
        validate_record(card_id, record)?;
    }

    let upserted = state.db.upsert_progress(&device_id, &body.records).await?;
    tracing::info!(device_id = %device_id, upserted, "upserted progress batch");

    Ok(Json(UpsertResponse { upserted }))
}

/// PUT /api/progress/:device_id/:card_id
/// Upserts a single row
pub async fn put_card_progress(
    State(state): State<AppState>,
    Path((device_id, card_id)): Path<(String, i64)>,
    Json(record): Json<CloudSyncRecord>,
) -> Result<Json<UpsertResponse>> {
    validate_device_id(&device_id)?;
    validate_record(card_id, &record)?;

    let upserted = state.db.upsert_one(&device_id, card_id, &record).await?;
    tracing::debug!(device_id = %device_id, card_id, "upserted progress row");

    Ok(Json(UpsertResponse { upserted }))
}

/// DELETE /api/progress/:device_id
/// Removes every row for the device
pub async fn delete_progress(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    validate_device_id(&device_id)?;

    let deleted = state.db.delete_progress(&device_id).await?;
    tracing::info!(device_id = %device_id, deleted, "deleted device progress");

    Ok(Json(DeleteResponse { deleted }))
}
