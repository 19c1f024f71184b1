// src/jobs/mod.rs
//
// Background job computations and the timer shim that drives them. Each
// computation is a pool-taking function so it stays callable (and testable)
// without the scheduler; the spawned loops only invoke, log, and forward.
// Nothing here prevents overlapping invocations of the same job.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{query_as, query_scalar, PgPool};
use std::env;
use uuid::Uuid;

use crate::analytics;
use crate::models::{EquipmentStatus, ProductionStats};

const DEFAULT_RETENTION_DAYS: i64 = 365;

// ─────────────────────────────────────────────────────────────────────────────
// Report shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
pub struct DailyReport {
    pub run_id: Uuid,
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub production: ProductionStats,
    pub production_records: i64,
    pub total_workers: i64,
    pub equipment_used: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct RecentProductionSummary {
    pub run_id: Uuid,
    pub processed_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub records_processed: i64,
    pub total_ore_extracted: f64,
    pub total_waste_removed: f64,
}

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct EquipmentMetrics {
    pub equipment_id: i64,
    pub equipment_code: String,
    pub name: String,
    pub status: EquipmentStatus,
    pub operating_hours: f64,
    pub total_production_records: i64,
    pub total_ore_extracted: f64,
    #[sqlx(default)]
    pub efficiency_tonnes_per_hour: f64,
}

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct MaintenanceDue {
    pub equipment_code: String,
    pub name: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, serde::Serialize)]
pub struct MaintenanceAlerts {
    pub run_id: Uuid,
    pub checked_at: DateTime<Utc>,
    pub upcoming: Vec<MaintenanceDue>,
    pub overdue: Vec<MaintenanceDue>,
    pub pending_maintenance_logs: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct RetentionReport {
    pub run_id: Uuid,
    pub checked_at: DateTime<Utc>,
    pub cutoff_date: NaiveDate,
    pub shifts_eligible: i64,
    pub maintenance_logs_eligible: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Computations
// ─────────────────────────────────────────────────────────────────────────────

/// Yesterday's production report: the period statistics for that single day
/// plus record/worker/equipment counts.
pub async fn generate_daily_report(pool: &PgPool) -> Result<DailyReport, sqlx::Error> {
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    daily_report_for(pool, yesterday).await
}

pub async fn daily_report_for(pool: &PgPool, report_date: NaiveDate) -> Result<DailyReport, sqlx::Error> {
    let production = analytics::production_stats(pool, report_date, report_date).await?;

    let production_records: i64 = query_scalar(
        r#"
        SELECT COUNT(*)
        FROM production_records p
        JOIN shifts s ON p.shift_id = s.shift_id
        WHERE s.shift_date = $1
        "#,
    )
    .bind(report_date)
    .fetch_one(pool)
    .await?;

    let total_workers: i64 =
        query_scalar(r#"SELECT COALESCE(SUM(workers_count), 0) FROM shifts WHERE shift_date = $1"#)
            .bind(report_date)
            .fetch_one(pool)
            .await?;

    let equipment_used: i64 = query_scalar(
        r#"
        SELECT COUNT(DISTINCT p.equipment_id)
        FROM production_records p
        JOIN shifts s ON p.shift_id = s.shift_id
        WHERE s.shift_date = $1
        "#,
    )
    .bind(report_date)
    .fetch_one(pool)
    .await?;

    Ok(DailyReport {
        run_id: Uuid::new_v4(),
        report_date,
        generated_at: Utc::now(),
        production,
        production_records,
        total_workers,
        equipment_used,
    })
}

/// Ad hoc summation over production records inserted in the last hour.
/// Deliberately bypasses the aggregation engine: raw rows only, no joins.
pub async fn summarize_recent_production(pool: &PgPool) -> Result<RecentProductionSummary, sqlx::Error> {
    let window_start = Utc::now() - Duration::hours(1);

    let (records_processed, total_ore, total_waste): (i64, f64, f64) = query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(ore_extracted_tonnes), 0)::float8,
               COALESCE(SUM(waste_removed_tonnes), 0)::float8
        FROM production_records
        WHERE created_at >= $1
        "#,
    )
    .bind(window_start)
    .fetch_one(pool)
    .await?;

    Ok(RecentProductionSummary {
        run_id: Uuid::new_v4(),
        processed_at: Utc::now(),
        window_start,
        records_processed,
        total_ore_extracted: total_ore,
        total_waste_removed: total_waste,
    })
}

/// Per-equipment production totals plus the derived efficiency ratio.
pub async fn calculate_equipment_metrics(pool: &PgPool) -> Result<Vec<EquipmentMetrics>, sqlx::Error> {
    let mut metrics = query_as::<_, EquipmentMetrics>(
        r#"
        SELECT e.equipment_id,
               e.equipment_code,
               e.name,
               e.status,
               e.operating_hours,
               COUNT(p.production_record_id) AS total_production_records,
               COALESCE(SUM(p.ore_extracted_tonnes), 0)::float8 AS total_ore_extracted
        FROM equipment e
        LEFT JOIN production_records p ON p.equipment_id = e.equipment_id
        GROUP BY e.equipment_id
        ORDER BY e.equipment_code
        "#,
    )
    .fetch_all(pool)
    .await?;

    for m in &mut metrics {
        m.efficiency_tonnes_per_hour =
            efficiency_tonnes_per_hour(m.total_ore_extracted, m.operating_hours);
    }

    Ok(metrics)
}

/// Ore extracted per operating hour, rounded to two decimals. Zero when the
/// denominator is zero or nothing was extracted.
fn efficiency_tonnes_per_hour(total_ore: f64, operating_hours: f64) -> f64 {
    if operating_hours > 0.0 && total_ore > 0.0 {
        (total_ore / operating_hours * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// Maintenance due-date sweep over operational equipment: due within the next
/// seven days counts as upcoming, due before today as overdue.
pub async fn check_maintenance_alerts(pool: &PgPool) -> Result<MaintenanceAlerts, sqlx::Error> {
    let today = Utc::now().date_naive();
    let week_ahead = today + Duration::days(7);

    let upcoming = query_as::<_, MaintenanceDue>(
        r#"
        SELECT equipment_code, name, next_maintenance_date AS due_date
        FROM equipment
        WHERE status = $1
          AND next_maintenance_date >= $2
          AND next_maintenance_date <= $3
        ORDER BY next_maintenance_date, equipment_code
        "#,
    )
    .bind(EquipmentStatus::Operational)
    .bind(today)
    .bind(week_ahead)
    .fetch_all(pool)
    .await?;

    let overdue = query_as::<_, MaintenanceDue>(
        r#"
        SELECT equipment_code, name, next_maintenance_date AS due_date
        FROM equipment
        WHERE status = $1
          AND next_maintenance_date < $2
        ORDER BY next_maintenance_date, equipment_code
        "#,
    )
    .bind(EquipmentStatus::Operational)
    .bind(today)
    .fetch_all(pool)
    .await?;

    let pending_maintenance_logs: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM maintenance_logs WHERE NOT is_completed"#)
            .fetch_one(pool)
            .await?;

    Ok(MaintenanceAlerts {
        run_id: Uuid::new_v4(),
        checked_at: Utc::now(),
        upcoming,
        overdue,
        pending_maintenance_logs,
    })
}

/// Counts rows past the retention horizon. This version only reports; nothing
/// is deleted.
pub async fn check_retention(pool: &PgPool, days_to_keep: i64) -> Result<RetentionReport, sqlx::Error> {
    let cutoff_date = Utc::now().date_naive() - Duration::days(days_to_keep);

    let shifts_eligible: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM shifts WHERE shift_date < $1"#)
            .bind(cutoff_date)
            .fetch_one(pool)
            .await?;

    let maintenance_logs_eligible: i64 = query_scalar(
        r#"SELECT COUNT(*) FROM maintenance_logs WHERE is_completed AND completed_date < $1"#,
    )
    .bind(cutoff_date)
    .fetch_one(pool)
    .await?;

    Ok(RetentionReport {
        run_id: Uuid::new_v4(),
        checked_at: Utc::now(),
        cutoff_date,
        shifts_eligible,
        maintenance_logs_eligible,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Timer shim
// ─────────────────────────────────────────────────────────────────────────────

fn retention_days() -> i64 {
    env::var("RETENTION_DAYS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

/// Spawns the periodic jobs. Each loop runs on its own interval; the first
/// (immediate) tick of every interval is consumed so nothing fires at boot.
pub fn spawn(pool: PgPool) {
    let hour = std::time::Duration::from_secs(3600);

    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(24 * hour);
            tick.tick().await;
            loop {
                tick.tick().await;
                match generate_daily_report(&pool).await {
                    Ok(report) => tracing::info!(
                        run_id = %report.run_id,
                        report_date = %report.report_date,
                        total_ore = report.production.total_ore_extracted,
                        records = report.production_records,
                        "daily report generated"
                    ),
                    Err(e) => tracing::error!(error = %e, "daily report failed"),
                }
            }
        });
    }

    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(hour);
            tick.tick().await;
            loop {
                tick.tick().await;
                match summarize_recent_production(&pool).await {
                    Ok(summary) => tracing::info!(
                        run_id = %summary.run_id,
                        records = summary.records_processed,
                        total_ore = summary.total_ore_extracted,
                        "recent production summarized"
                    ),
                    Err(e) => tracing::error!(error = %e, "recent production summary failed"),
                }
            }
        });
    }

    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(4 * hour);
            tick.tick().await;
            loop {
                tick.tick().await;
                match calculate_equipment_metrics(&pool).await {
                    Ok(metrics) => tracing::info!(
                        equipment = metrics.len(),
                        "equipment metrics calculated"
                    ),
                    Err(e) => tracing::error!(error = %e, "equipment metrics failed"),
                }
            }
        });
    }

    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let client = match reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
            {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!(error = %e, "alert webhook client init failed");
                    return;
                }
            };
            let mut tick = tokio::time::interval(24 * hour);
            tick.tick().await;
            loop {
                tick.tick().await;
                match check_maintenance_alerts(&pool).await {
                    Ok(alerts) => {
                        tracing::info!(
                            run_id = %alerts.run_id,
                            upcoming = alerts.upcoming.len(),
                            overdue = alerts.overdue.len(),
                            pending = alerts.pending_maintenance_logs,
                            "maintenance alerts checked"
                        );
                        if let Ok(url) = env::var("ALERT_WEBHOOK_URL") {
                            if let Err(e) = client
                                .post(&url)
                                .json(&alerts)
                                .send()
                                .await
                                .and_then(|r| r.error_for_status())
                            {
                                tracing::error!(error = %e, "alert webhook delivery failed");
                            }
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "maintenance alert check failed"),
                }
            }
        });
    }

    tokio::spawn(async move {
        let mut tick = tokio::time::interval(7 * 24 * hour);
        tick.tick().await;
        loop {
            tick.tick().await;
            match check_retention(&pool, retention_days()).await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    cutoff = %report.cutoff_date,
                    shifts = report.shifts_eligible,
                    maintenance_logs = report.maintenance_logs_eligible,
                    "retention check complete"
                ),
                Err(e) => tracing::error!(error = %e, "retention check failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShiftType;

    #[test]
    fn efficiency_guards_zero_hours() {
        assert_eq!(efficiency_tonnes_per_hour(100.0, 0.0), 0.0);
        assert_eq!(efficiency_tonnes_per_hour(0.0, 50.0), 0.0);
        assert_eq!(efficiency_tonnes_per_hour(0.0, 0.0), 0.0);
    }

    #[test]
    fn efficiency_rounds_to_two_decimals() {
        assert_eq!(efficiency_tonnes_per_hour(100.0, 3.0), 33.33);
        assert_eq!(efficiency_tonnes_per_hour(25.0, 10.0), 2.5);
    }

    async fn seed_shift(pool: &PgPool, date: NaiveDate, workers: i32) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO shifts(shift_date, shift_type, mine_section, workers_count, start_time)
            VALUES ($1, $2, 'Section B', $3, now())
            RETURNING shift_id
            "#,
        )
        .bind(date)
        .bind(ShiftType::Night)
        .bind(workers)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_equipment(
        pool: &PgPool,
        code: &str,
        status: EquipmentStatus,
        operating_hours: f64,
        next_maintenance: Option<NaiveDate>,
    ) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO equipment
                (equipment_code, name, equipment_type, status, operating_hours, next_maintenance_date)
            VALUES ($1, $2, 'haul truck', $3, $4, $5)
            RETURNING equipment_id
            "#,
        )
        .bind(code)
        .bind(format!("Unit {code}"))
        .bind(status)
        .bind(operating_hours)
        .bind(next_maintenance)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_record(pool: &PgPool, shift_id: i64, equipment_id: Option<i64>, ore: f64) {
        sqlx::query(
            r#"
            INSERT INTO production_records(shift_id, equipment_id, ore_extracted_tonnes, waste_removed_tonnes)
            VALUES ($1, $2, $3, 1.0)
            "#,
        )
        .bind(shift_id)
        .bind(equipment_id)
        .bind(ore)
        .execute(pool)
        .await
        .unwrap();
    }

    #[sqlx::test]
    async fn daily_report_composes_day_counts(pool: PgPool) {
        let day = NaiveDate::parse_from_str("2026-02-06", "%Y-%m-%d").unwrap();
        let eq = seed_equipment(&pool, "TRK-1", EquipmentStatus::Operational, 0.0, None).await;
        let s1 = seed_shift(&pool, day, 30).await;
        let s2 = seed_shift(&pool, day, 50).await;
        seed_record(&pool, s1, Some(eq), 10.0).await;
        seed_record(&pool, s1, Some(eq), 5.0).await;
        seed_record(&pool, s2, None, 7.0).await;

        let report = daily_report_for(&pool, day).await.unwrap();

        assert_eq!(report.report_date, day);
        assert_eq!(report.production.total_ore_extracted, 22.0);
        assert_eq!(report.production.total_shifts, 2);
        assert_eq!(report.production_records, 3);
        assert_eq!(report.total_workers, 80);
        assert_eq!(report.equipment_used, 1);
    }

    #[sqlx::test]
    async fn recent_summary_only_counts_last_hour(pool: PgPool) {
        let today = Utc::now().date_naive();
        let shift = seed_shift(&pool, today, 10).await;
        seed_record(&pool, shift, None, 6.0).await;
        seed_record(&pool, shift, None, 4.0).await;
        // An older insert, outside the window.
        sqlx::query(
            r#"
            INSERT INTO production_records(shift_id, ore_extracted_tonnes, created_at)
            VALUES ($1, 100.0, now() - interval '2 hours')
            "#,
        )
        .bind(shift)
        .execute(&pool)
        .await
        .unwrap();

        let summary = summarize_recent_production(&pool).await.unwrap();

        assert_eq!(summary.records_processed, 2);
        assert_eq!(summary.total_ore_extracted, 10.0);
        assert_eq!(summary.total_waste_removed, 2.0);
    }

    #[sqlx::test]
    async fn equipment_metrics_derive_guarded_efficiency(pool: PgPool) {
        let today = Utc::now().date_naive();
        let worked = seed_equipment(&pool, "EX-1", EquipmentStatus::Operational, 10.0, None).await;
        seed_equipment(&pool, "EX-2", EquipmentStatus::Repair, 0.0, None).await;
        let shift = seed_shift(&pool, today, 10).await;
        seed_record(&pool, shift, Some(worked), 25.0).await;

        let metrics = calculate_equipment_metrics(&pool).await.unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].equipment_code, "EX-1");
        assert_eq!(metrics[0].total_production_records, 1);
        assert_eq!(metrics[0].efficiency_tonnes_per_hour, 2.5);
        // Zero operating hours never divides.
        assert_eq!(metrics[1].equipment_code, "EX-2");
        assert_eq!(metrics[1].efficiency_tonnes_per_hour, 0.0);
    }

    #[sqlx::test]
    async fn maintenance_alerts_split_windows(pool: PgPool) {
        let today = Utc::now().date_naive();
        seed_equipment(&pool, "UP-1", EquipmentStatus::Operational, 0.0, Some(today + Duration::days(3))).await;
        seed_equipment(&pool, "UP-2", EquipmentStatus::Operational, 0.0, Some(today)).await;
        let overdue =
            seed_equipment(&pool, "OD-1", EquipmentStatus::Operational, 0.0, Some(today - Duration::days(2))).await;
        // Due but not operational: excluded from both lists.
        seed_equipment(&pool, "MT-1", EquipmentStatus::Maintenance, 0.0, Some(today + Duration::days(1))).await;
        // Too far out.
        seed_equipment(&pool, "FAR-1", EquipmentStatus::Operational, 0.0, Some(today + Duration::days(30))).await;
        sqlx::query(
            r#"
            INSERT INTO maintenance_logs(equipment_id, maintenance_type, description, is_completed)
            VALUES ($1, 'emergency', 'brake failure', FALSE)
            "#,
        )
        .bind(overdue)
        .execute(&pool)
        .await
        .unwrap();

        let alerts = check_maintenance_alerts(&pool).await.unwrap();

        let upcoming: Vec<&str> = alerts.upcoming.iter().map(|a| a.equipment_code.as_str()).collect();
        let overdue: Vec<&str> = alerts.overdue.iter().map(|a| a.equipment_code.as_str()).collect();
        assert_eq!(upcoming, vec!["UP-2", "UP-1"]);
        assert_eq!(overdue, vec!["OD-1"]);
        assert_eq!(alerts.pending_maintenance_logs, 1);
    }

    #[sqlx::test]
    async fn retention_counts_without_deleting(pool: PgPool) {
        let today = Utc::now().date_naive();
        seed_shift(&pool, today - Duration::days(400), 10).await;
        seed_shift(&pool, today, 10).await;
        let eq = seed_equipment(&pool, "OLD-1", EquipmentStatus::Operational, 0.0, None).await;
        sqlx::query(
            r#"
            INSERT INTO maintenance_logs
                (equipment_id, maintenance_type, description, is_completed, completed_date)
            VALUES ($1, 'scheduled', 'ancient service', TRUE, $2),
                   ($1, 'scheduled', 'recent service', TRUE, $3)
            "#,
        )
        .bind(eq)
        .bind(today - Duration::days(400))
        .bind(today)
        .execute(&pool)
        .await
        .unwrap();

        let report = check_retention(&pool, 365).await.unwrap();

        assert_eq!(report.shifts_eligible, 1);
        assert_eq!(report.maintenance_logs_eligible, 1);

        // Report only: both shifts still present.
        let shifts: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM shifts"#)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(shifts, 2);
    }
}
