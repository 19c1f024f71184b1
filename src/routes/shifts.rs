// src/routes/shifts.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{query, query_as, Postgres, QueryBuilder};

use super::{bad_request, ensure_non_empty, internal_error, not_found, write_error};
use crate::models::{Patch, Shift, ShiftType};
use crate::AppState;

const SHIFT_COLUMNS: &str = "shift_id, shift_date, shift_type, mine_section, supervisor_id, \
     workers_count, start_time, end_time, notes, created_at, updated_at";

#[derive(Deserialize)]
pub struct CreateShiftBody {
    pub shift_date: NaiveDate,
    pub shift_type: ShiftType,
    pub mine_section: String,
    pub supervisor_id: Option<i64>,
    #[serde(default)]
    pub workers_count: i32,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PatchShiftBody {
    pub shift_type: Patch<ShiftType>,
    pub mine_section: Patch<String>,
    pub workers_count: Patch<i32>,
    pub end_time: Patch<DateTime<Utc>>,
    pub notes: Patch<String>,
}

#[derive(Deserialize)]
pub struct ListShiftsQ {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub mine_section: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn create_shift(
    State(state): State<AppState>,
    Json(b): Json<CreateShiftBody>,
) -> Result<(StatusCode, Json<Shift>), (StatusCode, String)> {
    ensure_non_empty("mine_section", &b.mine_section)?;
    if b.workers_count < 0 {
        return Err(bad_request("workers_count must be >= 0"));
    }

    let row = query_as::<_, Shift>(&format!(
        r#"
        INSERT INTO shifts(shift_date, shift_type, mine_section, supervisor_id, workers_count, start_time, notes)
        VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING {SHIFT_COLUMNS}
        "#
    ))
    .bind(b.shift_date)
    .bind(b.shift_type)
    .bind(b.mine_section)
    .bind(b.supervisor_id)
    .bind(b.workers_count)
    .bind(b.start_time)
    .bind(b.notes)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| write_error(e, "supervisor_id does not reference an existing user"))?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_shifts(
    State(state): State<AppState>,
    Query(q): Query<ListShiftsQ>,
) -> Result<Json<Vec<Shift>>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(100).clamp(1, 1000);
    let offset = q.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE TRUE"));
    if let Some(start) = q.start_date {
        qb.push(" AND shift_date >= ").push_bind(start);
    }
    if let Some(end) = q.end_date {
        qb.push(" AND shift_date <= ").push_bind(end);
    }
    if let Some(section) = q.mine_section {
        qb.push(" AND mine_section = ").push_bind(section);
    }
    qb.push(" ORDER BY shift_date DESC, shift_id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb
        .build_query_as::<Shift>()
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn get_shift(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Shift>, (StatusCode, String)> {
    let row = query_as::<_, Shift>(&format!(r#"SELECT {SHIFT_COLUMNS} FROM shifts WHERE shift_id=$1"#))
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("shift"))
}

pub async fn patch_shift(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchShiftBody>,
) -> Result<Json<Shift>, (StatusCode, String)> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE shifts SET updated_at = now()");

    match b.shift_type.into_nullable() {
        Some(Some(v)) => {
            qb.push(", shift_type = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("shift_type cannot be null")),
        None => {}
    }
    match b.mine_section.into_nullable() {
        Some(Some(v)) => {
            ensure_non_empty("mine_section", &v)?;
            qb.push(", mine_section = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("mine_section cannot be null")),
        None => {}
    }
    match b.workers_count.into_nullable() {
        Some(Some(v)) => {
            if v < 0 {
                return Err(bad_request("workers_count must be >= 0"));
            }
            qb.push(", workers_count = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("workers_count cannot be null")),
        None => {}
    }
    // Nullable columns: explicit null clears the value.
    if let Some(v) = b.end_time.into_nullable() {
        qb.push(", end_time = ").push_bind(v);
    }
    if let Some(v) = b.notes.into_nullable() {
        qb.push(", notes = ").push_bind(v);
    }

    qb.push(" WHERE shift_id = ").push_bind(id);
    qb.push(format!(" RETURNING {SHIFT_COLUMNS}"));

    let row = qb
        .build_query_as::<Shift>()
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("shift"))
}

pub async fn delete_shift(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let res = query(r#"DELETE FROM shifts WHERE shift_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| write_error(e, "shift has dependent production records"))?;
    if res.rows_affected() == 0 {
        return Err(not_found("shift"));
    }
    Ok(Json(serde_json::json!({"deleted": true})))
}
