// src/routes/users.rs
//
// Plain user records. Credential checking and token issuance live in an
// external authenticator; password_hash is an opaque string here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::{query, query_as};

use super::{bad_request, ensure_non_empty, internal_error, not_found, write_error};
use crate::models::{Patch, User};
use crate::AppState;

const USER_COLUMNS: &str =
    "user_id, email, password_hash, full_name, role, is_active, created_at, updated_at";

const ROLES: [&str; 3] = ["admin", "manager", "operator"];

#[derive(Deserialize)]
pub struct CreateUserBody {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "operator".to_string()
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PatchUserBody {
    pub full_name: Patch<String>,
    pub role: Patch<String>,
    pub password_hash: Patch<String>,
    pub is_active: Patch<bool>,
}

#[derive(Deserialize)]
pub struct ListUsersQ {
    pub role: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn validate_role(role: &str) -> Result<(), (StatusCode, String)> {
    if !ROLES.contains(&role) {
        return Err(bad_request("role must be one of admin, manager, operator"));
    }
    Ok(())
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(b): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    ensure_non_empty("email", &b.email)?;
    ensure_non_empty("full_name", &b.full_name)?;
    validate_role(&b.role)?;

    let row = query_as::<_, User>(&format!(
        r#"
        INSERT INTO users(email, password_hash, full_name, role)
        VALUES ($1,$2,$3,$4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(b.email)
    .bind(b.password_hash)
    .bind(b.full_name)
    .bind(b.role)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| write_error(e, "email already registered"))?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<ListUsersQ>,
) -> Result<Json<Vec<User>>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let rows = if let Some(role) = q.role {
        query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE role=$1 ORDER BY user_id DESC LIMIT $2 OFFSET $3"#
        ))
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?
    } else {
        query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users ORDER BY user_id DESC LIMIT $1 OFFSET $2"#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?
    };
    Ok(Json(rows))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, (StatusCode, String)> {
    let row = query_as::<_, User>(&format!(r#"SELECT {USER_COLUMNS} FROM users WHERE user_id=$1"#))
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("user"))
}

pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchUserBody>,
) -> Result<Json<User>, (StatusCode, String)> {
    let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE users SET updated_at = now()");

    match b.full_name.into_nullable() {
        Some(Some(v)) => {
            ensure_non_empty("full_name", &v)?;
            qb.push(", full_name = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("full_name cannot be null")),
        None => {}
    }
    match b.role.into_nullable() {
        Some(Some(v)) => {
            validate_role(&v)?;
            qb.push(", role = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("role cannot be null")),
        None => {}
    }
    match b.password_hash.into_nullable() {
        Some(Some(v)) => {
            qb.push(", password_hash = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("password_hash cannot be null")),
        None => {}
    }
    match b.is_active.into_nullable() {
        Some(Some(v)) => {
            qb.push(", is_active = ").push_bind(v);
        }
        Some(None) => return Err(bad_request("is_active cannot be null")),
        None => {}
    }

    qb.push(" WHERE user_id = ").push_bind(id);
    qb.push(format!(" RETURNING {USER_COLUMNS}"));

    let row = qb
        .build_query_as::<User>()
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    row.map(Json).ok_or_else(|| not_found("user"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let res = query(r#"DELETE FROM users WHERE user_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| write_error(e, "user still supervises shifts"))?;
    if res.rows_affected() == 0 {
        return Err(not_found("user"));
    }
    Ok(Json(serde_json::json!({"deleted": true})))
}
