// src/routes/equipment.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{query, query_as, query_scalar, Postgres, QueryBuilder};

use super::{
    bad_request, conflict, ensure_non_empty, ensure_non_negative, internal_error, not_found,
    write_error,
};
use crate::models::{Equipment, EquipmentStatus, Patch};
use crate::AppState;

const EQUIPMENT_COLUMNS: &str = "equipment_id, equipment_code, name, equipment_type, manufacturer, \
     model, year_manufactured, status, capacity_tonnes, fuel_type, operating_hours, \
     current_location, assigned_section, commissioned_date, last_maintenance_date, \
     next_maintenance_date, created_at, updated_at";

#[derive(Deserialize)]
pub struct CreateEquipmentBody {
    pub equipment_code: String,
    pub name: String,
    pub equipment_type: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub year_manufactured: Option<i32>,
    pub status: Option<EquipmentStatus>,
    pub capacity_tonnes: Option<f64>,
    pub fuel_type: Option<String>,
    pub current_location: Option<String>,
    pub assigned_section: Option<String>,
    pub commissioned_date: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PatchEquipmentBody {
    pub name: Patch<String>,
    pub status: Patch<EquipmentStatus>,
    pub current_location: Patch<String>,
    pub assigned_section: Patch<String>,
    pub operating_hours: Patch<f64>,
    pub last_maintenance_date: Patch<NaiveDate>,
    pub next_maintenance_date: Patch<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ListEquipmentQ {
    pub status: Option<EquipmentStatus>,
    pub equipment_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn create_equipment(
    State(state): State<AppState>,
    Json(b): Json<CreateEquipmentBody>,
) -> Result<(StatusCode, Json<Equipment>), (StatusCode, String)> {
    ensure_non_empty("equipment_code", &b.equipment_code)?;
    ensure_non_empty("name", &b.name)?;
    ensure_non_empty("equipment_type", &b.equipment_type)?;
    if let Some(year) = b.year_manufactured {
        if !(1900..=2100).contains(&year) {
            return Err(bad_request("year_manufactured must be between 1900 and 2100"));
        }
    }
    if let Some(capacity) = b.capacity_tonnes {
        ensure_non_negative("capacity_tonnes", capacity)?;
    }

    let taken: bool =
        query_scalar(r#"SELECT EXISTS(SELECT 1 FROM equipment WHERE equipment_code=$1)"#)
            .bind(&b.equipment_code)
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;
    if taken {
        return Err(conflict("equipment code already exists"));
    }

    let row = query_as::<_, Equipment>(&format!(
        r#"
        INSERT INTO equipment
            (equipment_code, name, equipment_type, manufacturer, model, year_manufactured,
             status, capacity_tonnes, fuel_type, current_location, assigned_section, commissioned_date)
        VALUES ($1,$2,$3,$4,$5,$6,COALESCE($7, 'operational'),$8,$9,$10,$11,$12)
        RETURNING {EQUIPMENT_COLUMNS}
        "#
    ))
    .bind(b.equipment_code)
    .bind(b.name)
    .bind(b.equipment_type)
    .bind(b.manufacturer)
    .bind(b.model)
    .bind(b.year_manufactured)
    .bind(b.status)
    .bind(b.capacity_tonnes)
    .bind(b.fuel_type)
    .bind(b.current_location)
    .bind(b.assigned_section)
    .bind(b.commissioned_date)
    .fetch_one(&state.pool)
    .await
    // The pre-check races with concurrent creates; the unique index settles it.
    .map_err(|e| write_error(e, "equipment code already exists"))?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_equipment(
    State(state): State<AppState>,
    Query(q): Query<ListEquipmentQ>,
) -> Result<Json<Vec<Equipment>>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(100).clamp(1, 1000);
    let offset = q.offset.unwrap_or(0).max(0);

    let mut qb =
        QueryBuilder::<Postgres>::new(format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE TRUE"));
    if let Some(status) = q.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(equipment_type) = q.equipment_type {
        qb.push(" AND equipment_type = ").push_bind(equipment_type);
    }
    qb.push(" ORDER BY equipment_code LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb
        .build_query_as::<Equipment>()
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Equipment>, (StatusCode, String)> {
    let row = query_as::<_, Equipment>(&format!(
        r#"SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE equipment_id=$1"#
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("equipment"))
}

pub async fn patch_equipment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchEquipmentBody>,
) -> Result<Json<Equipment>, (StatusCode, String)> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE equipment SET updated_at = now()");

    match b.name.into_nullable() {
        Some(Some(v)) => {
            ensure_non_empty("name", &v)?;
            qb.push(", name = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("name cannot be null")),
        None => {}
    }
    match b.status.into_nullable() {
        Some(Some(v)) => {
            qb.push(", status = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("status cannot be null")),
        None => {}
    }
    match b.operating_hours.into_nullable() {
        Some(Some(v)) => {
            ensure_non_negative("operating_hours", v)?;
            qb.push(", operating_hours = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("operating_hours cannot be null")),
        None => {}
    }
    if let Some(v) = b.current_location.into_nullable() {
        qb.push(", current_location = ").push_bind(v);
    }
    if let Some(v) = b.assigned_section.into_nullable() {
        qb.push(", assigned_section = ").push_bind(v);
    }
    if let Some(v) = b.last_maintenance_date.into_nullable() {
        qb.push(", last_maintenance_date = ").push_bind(v);
    }
    if let Some(v) = b.next_maintenance_date.into_nullable() {
        qb.push(", next_maintenance_date = ").push_bind(v);
    }

    qb.push(" WHERE equipment_id = ").push_bind(id);
    qb.push(format!(" RETURNING {EQUIPMENT_COLUMNS}"));

    let row = qb
        .build_query_as::<Equipment>()
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("equipment"))
}

pub async fn delete_equipment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let res = query(r#"DELETE FROM equipment WHERE equipment_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| write_error(e, "equipment has dependent production records or maintenance logs"))?;
    if res.rows_affected() == 0 {
        return Err(not_found("equipment"));
    }
    Ok(Json(serde_json::json!({"deleted": true})))
}
