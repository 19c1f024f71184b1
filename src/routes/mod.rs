// src/routes/mod.rs

use axum::http::StatusCode;

pub mod analytics;
pub mod equipment;
pub mod health;
pub mod maintenance;
pub mod production;
pub mod shifts;
pub mod users;

// Common error mappers
pub fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("internal error: {e}"))
}

pub fn bad_request(msg: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.into())
}

pub fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

pub fn conflict(msg: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::CONFLICT, msg.into())
}

/// Maps store-level constraint violations on writes to client-facing
/// statuses: unique → 409, foreign key → 409 for deletes / 400 for inserts
/// is decided at the call site; everything else is a 500.
pub fn write_error(e: sqlx::Error, constraint_msg: &str) -> (StatusCode, String) {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            conflict(constraint_msg)
        }
        _ => internal_error(e),
    }
}

// Field-level validators shared by create/patch handlers.
pub fn ensure_non_negative(field: &str, v: f64) -> Result<(), (StatusCode, String)> {
    if v < 0.0 {
        return Err(bad_request(format!("{field} must be >= 0")));
    }
    Ok(())
}

pub fn ensure_percentage(field: &str, v: f64) -> Result<(), (StatusCode, String)> {
    if !(0.0..=100.0).contains(&v) {
        return Err(bad_request(format!("{field} must be between 0 and 100")));
    }
    Ok(())
}

pub fn ensure_non_empty(field: &str, v: &str) -> Result<(), (StatusCode, String)> {
    if v.trim().is_empty() {
        return Err(bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}
