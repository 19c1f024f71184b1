// src/main.rs

use std::env;

use axum::{routing::get, Router};
use sqlx::{Pool, Postgres};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod analytics;
mod db;
mod jobs;
mod models;
mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Initialize DB pool, apply migrations
    let pool = db::connect().await?;
    let state = AppState { pool: pool.clone() };

    // Periodic report/alert jobs run alongside the API on their own timers.
    jobs::spawn(pool);

    // Very permissive CORS for local dev (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Root API router
    let api = Router::new()
        // health
        .route("/health", get(routes::health::health))
        // users
        .route(
            "/api/v1/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/api/v1/users/:id",
            get(routes::users::get_user)
                .patch(routes::users::patch_user)
                .delete(routes::users::delete_user),
        )
        // shifts
        .route(
            "/api/v1/shifts",
            get(routes::shifts::list_shifts).post(routes::shifts::create_shift),
        )
        .route(
            "/api/v1/shifts/:id",
            get(routes::shifts::get_shift)
                .patch(routes::shifts::patch_shift)
                .delete(routes::shifts::delete_shift),
        )
        // production records
        .route(
            "/api/v1/production-records",
            get(routes::production::list_records).post(routes::production::create_record),
        )
        .route(
            "/api/v1/production-records/:id",
            get(routes::production::get_record)
                .patch(routes::production::patch_record)
                .delete(routes::production::delete_record),
        )
        // equipment
        .route(
            "/api/v1/equipment",
            get(routes::equipment::list_equipment).post(routes::equipment::create_equipment),
        )
        .route(
            "/api/v1/equipment/:id",
            get(routes::equipment::get_equipment)
                .patch(routes::equipment::patch_equipment)
                .delete(routes::equipment::delete_equipment),
        )
        // maintenance logs
        .route(
            "/api/v1/maintenance-logs",
            get(routes::maintenance::list_logs).post(routes::maintenance::create_log),
        )
        .route(
            "/api/v1/maintenance-logs/:id",
            get(routes::maintenance::get_log)
                .patch(routes::maintenance::patch_log)
                .delete(routes::maintenance::delete_log),
        )
        // analytics
        .route(
            "/api/v1/analytics/production-stats",
            get(routes::analytics::production_stats),
        )
        .route(
            "/api/v1/analytics/daily-production",
            get(routes::analytics::daily_production),
        )
        .route(
            "/api/v1/analytics/equipment-utilization",
            get(routes::analytics::equipment_utilization),
        )
        .route("/api/v1/analytics/summary", get(routes::analytics::summary))
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("API listening on http://127.0.0.1:{port}");

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
