// src/routes/production.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::{query, query_as, query_scalar, Postgres, QueryBuilder};

use super::{bad_request, ensure_non_negative, ensure_percentage, internal_error, not_found};
use crate::models::{Patch, ProductionRecord};
use crate::AppState;

const RECORD_COLUMNS: &str = "production_record_id, shift_id, equipment_id, ore_extracted_tonnes, \
     waste_removed_tonnes, ore_grade_percentage, depth_meters, mining_level, stope_number, \
     contamination_level, moisture_content, recorded_at, created_at, updated_at";

#[derive(Deserialize)]
pub struct CreateRecordBody {
    pub shift_id: i64,
    pub equipment_id: Option<i64>,
    #[serde(default)]
    pub ore_extracted_tonnes: f64,
    #[serde(default)]
    pub waste_removed_tonnes: f64,
    #[serde(default)]
    pub ore_grade_percentage: f64,
    #[serde(default)]
    pub depth_meters: f64,
    pub mining_level: Option<String>,
    pub stope_number: Option<String>,
    #[serde(default)]
    pub contamination_level: f64,
    #[serde(default)]
    pub moisture_content: f64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PatchRecordBody {
    pub ore_extracted_tonnes: Patch<f64>,
    pub waste_removed_tonnes: Patch<f64>,
    pub ore_grade_percentage: Patch<f64>,
    pub depth_meters: Patch<f64>,
    pub mining_level: Patch<String>,
    pub stope_number: Patch<String>,
}

#[derive(Deserialize)]
pub struct ListRecordsQ {
    pub shift_id: Option<i64>,
    pub equipment_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn validate_metrics(ore: f64, waste: f64, grade: f64, depth: f64) -> Result<(), (StatusCode, String)> {
    ensure_non_negative("ore_extracted_tonnes", ore)?;
    ensure_non_negative("waste_removed_tonnes", waste)?;
    ensure_percentage("ore_grade_percentage", grade)?;
    ensure_non_negative("depth_meters", depth)
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(b): Json<CreateRecordBody>,
) -> Result<(StatusCode, Json<ProductionRecord>), (StatusCode, String)> {
    validate_metrics(
        b.ore_extracted_tonnes,
        b.waste_removed_tonnes,
        b.ore_grade_percentage,
        b.depth_meters,
    )?;
    ensure_percentage("contamination_level", b.contamination_level)?;
    ensure_percentage("moisture_content", b.moisture_content)?;

    // The shift must exist before a record can point at it.
    let shift_exists: bool = query_scalar(r#"SELECT EXISTS(SELECT 1 FROM shifts WHERE shift_id=$1)"#)
        .bind(b.shift_id)
        .fetch_one(&state.pool)
        .await
        .map_err(internal_error)?;
    if !shift_exists {
        return Err(bad_request("invalid shift_id"));
    }

    if let Some(equipment_id) = b.equipment_id {
        let equipment_exists: bool =
            query_scalar(r#"SELECT EXISTS(SELECT 1 FROM equipment WHERE equipment_id=$1)"#)
                .bind(equipment_id)
                .fetch_one(&state.pool)
                .await
                .map_err(internal_error)?;
        if !equipment_exists {
            return Err(bad_request("invalid equipment_id"));
        }
    }

    let row = query_as::<_, ProductionRecord>(&format!(
        r#"
        INSERT INTO production_records
            (shift_id, equipment_id, ore_extracted_tonnes, waste_removed_tonnes, ore_grade_percentage,
             depth_meters, mining_level, stope_number, contamination_level, moisture_content)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {RECORD_COLUMNS}
        "#
    ))
    .bind(b.shift_id)
    .bind(b.equipment_id)
    .bind(b.ore_extracted_tonnes)
    .bind(b.waste_removed_tonnes)
    .bind(b.ore_grade_percentage)
    .bind(b.depth_meters)
    .bind(b.mining_level)
    .bind(b.stope_number)
    .bind(b.contamination_level)
    .bind(b.moisture_content)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_records(
    State(state): State<AppState>,
    Query(q): Query<ListRecordsQ>,
) -> Result<Json<Vec<ProductionRecord>>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(100).clamp(1, 1000);
    let offset = q.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {RECORD_COLUMNS} FROM production_records WHERE TRUE"
    ));
    if let Some(shift_id) = q.shift_id {
        qb.push(" AND shift_id = ").push_bind(shift_id);
    }
    if let Some(equipment_id) = q.equipment_id {
        qb.push(" AND equipment_id = ").push_bind(equipment_id);
    }
    qb.push(" ORDER BY recorded_at DESC, production_record_id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb
        .build_query_as::<ProductionRecord>()
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductionRecord>, (StatusCode, String)> {
    let row = query_as::<_, ProductionRecord>(&format!(
        r#"SELECT {RECORD_COLUMNS} FROM production_records WHERE production_record_id=$1"#
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("production record"))
}

pub async fn patch_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchRecordBody>,
) -> Result<Json<ProductionRecord>, (StatusCode, String)> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE production_records SET updated_at = now()");

    for (field, patch, pct) in [
        ("ore_extracted_tonnes", b.ore_extracted_tonnes, false),
        ("waste_removed_tonnes", b.waste_removed_tonnes, false),
        ("ore_grade_percentage", b.ore_grade_percentage, true),
        ("depth_meters", b.depth_meters, false),
    ] {
        match patch.into_nullable() {
            Some(Some(v)) => {
                if pct {
                    ensure_percentage(field, v)?;
                } else {
                    ensure_non_negative(field, v)?;
                }
                qb.push(format!(", {field} = ")).push_bind(v);
            }
            Some(None) => return Err(bad_request(format!("{field} cannot be null"))),
            None => {}
        }
    }
    if let Some(v) = b.mining_level.into_nullable() {
        qb.push(", mining_level = ").push_bind(v);
    }
    if let Some(v) = b.stope_number.into_nullable() {
        qb.push(", stope_number = ").push_bind(v);
    }

    qb.push(" WHERE production_record_id = ").push_bind(id);
    qb.push(format!(" RETURNING {RECORD_COLUMNS}"));

    let row = qb
        .build_query_as::<ProductionRecord>()
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("production record"))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let res = query(r#"DELETE FROM production_records WHERE production_record_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    if res.rows_affected() == 0 {
        return Err(not_found("production record"));
    }
    Ok(Json(serde_json::json!({"deleted": true})))
}
