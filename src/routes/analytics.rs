// src/routes/analytics.rs
//
// Read-only reporting endpoints over the aggregation engine. Range ordering
// is checked here, not in the engine: an inverted range is a caller mistake
// at this boundary, but a legal (empty) input to the engine itself.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{bad_request, internal_error};
use crate::analytics;
use crate::models::{DailyProduction, EquipmentUtilization, OperationsSummary, ProductionStats};
use crate::AppState;

#[derive(Deserialize)]
pub struct DateRangeQ {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn check_range(q: &DateRangeQ) -> Result<(), (StatusCode, String)> {
    if q.start_date > q.end_date {
        return Err(bad_request("start_date must not be after end_date"));
    }
    Ok(())
}

pub async fn production_stats(
    State(state): State<AppState>,
    Query(q): Query<DateRangeQ>,
) -> Result<Json<ProductionStats>, (StatusCode, String)> {
    check_range(&q)?;
    let stats = analytics::production_stats(&state.pool, q.start_date, q.end_date)
        .await
        .map_err(internal_error)?;
    Ok(Json(stats))
}

pub async fn daily_production(
    State(state): State<AppState>,
    Query(q): Query<DateRangeQ>,
) -> Result<Json<Vec<DailyProduction>>, (StatusCode, String)> {
    check_range(&q)?;
    let days = analytics::daily_production(&state.pool, q.start_date, q.end_date)
        .await
        .map_err(internal_error)?;
    Ok(Json(days))
}

pub async fn equipment_utilization(
    State(state): State<AppState>,
) -> Result<Json<Vec<EquipmentUtilization>>, (StatusCode, String)> {
    let util = analytics::equipment_utilization(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(util))
}

pub async fn summary(
    State(state): State<AppState>,
) -> Result<Json<OperationsSummary>, (StatusCode, String)> {
    let summary = analytics::operations_summary(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(summary))
}
