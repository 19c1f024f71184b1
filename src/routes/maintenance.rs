// src/routes/maintenance.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{query, query_as, query_scalar, Postgres, QueryBuilder};

use super::{bad_request, ensure_non_empty, ensure_non_negative, internal_error, not_found};
use crate::models::{MaintenanceLog, MaintenanceType, Patch};
use crate::AppState;

const LOG_COLUMNS: &str = "maintenance_log_id, equipment_id, maintenance_type, description, \
     technician_name, labor_hours, parts_cost, total_cost, parts_replaced, is_completed, \
     scheduled_date, completed_date, created_at, updated_at";

#[derive(Deserialize)]
pub struct CreateLogBody {
    pub equipment_id: i64,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub technician_name: Option<String>,
    #[serde(default)]
    pub labor_hours: f64,
    #[serde(default)]
    pub parts_cost: f64,
    #[serde(default)]
    pub total_cost: f64,
    pub parts_replaced: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PatchLogBody {
    pub description: Patch<String>,
    pub technician_name: Patch<String>,
    pub labor_hours: Patch<f64>,
    pub parts_cost: Patch<f64>,
    pub total_cost: Patch<f64>,
    pub parts_replaced: Patch<String>,
    pub is_completed: Patch<bool>,
    pub completed_date: Patch<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ListLogsQ {
    pub equipment_id: Option<i64>,
    pub is_completed: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn create_log(
    State(state): State<AppState>,
    Json(b): Json<CreateLogBody>,
) -> Result<(StatusCode, Json<MaintenanceLog>), (StatusCode, String)> {
    ensure_non_empty("description", &b.description)?;
    ensure_non_negative("labor_hours", b.labor_hours)?;
    ensure_non_negative("parts_cost", b.parts_cost)?;
    ensure_non_negative("total_cost", b.total_cost)?;

    let equipment_exists: bool =
        query_scalar(r#"SELECT EXISTS(SELECT 1 FROM equipment WHERE equipment_id=$1)"#)
            .bind(b.equipment_id)
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;
    if !equipment_exists {
        return Err(bad_request("invalid equipment_id"));
    }

    let row = query_as::<_, MaintenanceLog>(&format!(
        r#"
        INSERT INTO maintenance_logs
            (equipment_id, maintenance_type, description, technician_name, labor_hours,
             parts_cost, total_cost, parts_replaced, scheduled_date)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {LOG_COLUMNS}
        "#
    ))
    .bind(b.equipment_id)
    .bind(b.maintenance_type)
    .bind(b.description)
    .bind(b.technician_name)
    .bind(b.labor_hours)
    .bind(b.parts_cost)
    .bind(b.total_cost)
    .bind(b.parts_replaced)
    .bind(b.scheduled_date)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(q): Query<ListLogsQ>,
) -> Result<Json<Vec<MaintenanceLog>>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(100).clamp(1, 1000);
    let offset = q.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {LOG_COLUMNS} FROM maintenance_logs WHERE TRUE"
    ));
    if let Some(equipment_id) = q.equipment_id {
        qb.push(" AND equipment_id = ").push_bind(equipment_id);
    }
    if let Some(is_completed) = q.is_completed {
        qb.push(" AND is_completed = ").push_bind(is_completed);
    }
    qb.push(" ORDER BY created_at DESC, maintenance_log_id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb
        .build_query_as::<MaintenanceLog>()
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MaintenanceLog>, (StatusCode, String)> {
    let row = query_as::<_, MaintenanceLog>(&format!(
        r#"SELECT {LOG_COLUMNS} FROM maintenance_logs WHERE maintenance_log_id=$1"#
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("maintenance log"))
}

pub async fn patch_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchLogBody>,
) -> Result<Json<MaintenanceLog>, (StatusCode, String)> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE maintenance_logs SET updated_at = now()");

    match b.description.into_nullable() {
        Some(Some(v)) => {
            ensure_non_empty("description", &v)?;
            qb.push(", description = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("description cannot be null")),
        None => {}
    }
    for (field, patch) in [
        ("labor_hours", b.labor_hours),
        ("parts_cost", b.parts_cost),
        ("total_cost", b.total_cost),
    ] {
        match patch.into_nullable() {
            Some(Some(v)) => {
                ensure_non_negative(field, v)?;
                qb.push(format!(", {field} = ")).push_bind(v);
            }
            Some(None) => return Err(bad_request(format!("{field} cannot be null"))),
            None => {}
        }
    }
    match b.is_completed.into_nullable() {
        Some(Some(v)) => {
            qb.push(", is_completed = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("is_completed cannot be null")),
        None => {}
    }
    if let Some(v) = b.technician_name.into_nullable() {
        qb.push(", technician_name = ").push_bind(v);
    }
    if let Some(v) = b.parts_replaced.into_nullable() {
        qb.push(", parts_replaced = ").push_bind(v);
    }
    if let Some(v) = b.completed_date.into_nullable() {
        qb.push(", completed_date = ").push_bind(v);
    }

    qb.push(" WHERE maintenance_log_id = ").push_bind(id);
    qb.push(format!(" RETURNING {LOG_COLUMNS}"));

    let row = qb
        .build_query_as::<MaintenanceLog>()
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("maintenance log"))
}

pub async fn delete_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let res = query(r#"DELETE FROM maintenance_logs WHERE maintenance_log_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    if res.rows_affected() == 0 {
        return Err(not_found("maintenance log"));
    }
    Ok(Json(serde_json::json!({"deleted": true})))
}
