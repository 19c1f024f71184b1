// src/analytics/mod.rs
//
// Aggregation engine over shifts / production_records / equipment /
// maintenance_logs. Read-only; every function takes the pool explicitly and
// lets store errors propagate untouched. Empty result sets are reported as
// zeros, never as errors.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::{query_as, query_scalar, PgPool};

use crate::models::{DailyProduction, EquipmentUtilization, OperationsSummary, ProductionStats};

/// Production statistics over `[start_date, end_date]`, both ends inclusive.
///
/// Two independent aggregates: the production side joins records to their
/// parent shift and filters on the shift's date; the shift side counts and
/// averages shifts alone. Neither filters the other. An inverted range is not
/// an error here — it simply matches no rows.
pub async fn production_stats(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<ProductionStats, sqlx::Error> {
    let (total_ore, total_waste, avg_grade): (f64, f64, f64) = query_as(
        r#"
        SELECT COALESCE(SUM(p.ore_extracted_tonnes), 0)::float8,
               COALESCE(SUM(p.waste_removed_tonnes), 0)::float8,
               COALESCE(AVG(p.ore_grade_percentage), 0)::float8
        FROM production_records p
        JOIN shifts s ON p.shift_id = s.shift_id
        WHERE s.shift_date >= $1 AND s.shift_date <= $2
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await?;

    let (total_shifts, avg_workers): (i64, f64) = query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(AVG(workers_count), 0)::float8
        FROM shifts
        WHERE shift_date >= $1 AND shift_date <= $2
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await?;

    Ok(ProductionStats {
        total_ore_extracted: total_ore,
        total_waste_removed: total_waste,
        average_ore_grade: avg_grade,
        total_shifts,
        average_workers_per_shift: avg_workers,
        period_start: start_date,
        period_end: end_date,
    })
}

/// Per-day rollup over `[start_date, end_date]`, ascending by date.
///
/// Only dates with at least one production record appear; callers must not
/// assume a contiguous series. `equipment_used` counts distinct non-null
/// equipment ids referenced that day.
pub async fn daily_production(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<DailyProduction>, sqlx::Error> {
    query_as::<_, DailyProduction>(
        r#"
        SELECT s.shift_date AS date,
               COALESCE(SUM(p.ore_extracted_tonnes), 0)::float8 AS total_ore,
               COALESCE(SUM(p.waste_removed_tonnes), 0)::float8 AS total_waste,
               COUNT(DISTINCT s.shift_id) AS shift_count,
               COUNT(DISTINCT p.equipment_id) AS equipment_used
        FROM shifts s
        JOIN production_records p ON p.shift_id = s.shift_id
        WHERE s.shift_date >= $1 AND s.shift_date <= $2
        GROUP BY s.shift_date
        ORDER BY s.shift_date
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_all(pool)
    .await
}

/// Whole-fleet utilization snapshot. Equipment with no production records is
/// included with zero counts. Ordered by extracted ore descending; ties break
/// on equipment_code ascending so the ordering is stable.
pub async fn equipment_utilization(pool: &PgPool) -> Result<Vec<EquipmentUtilization>, sqlx::Error> {
    query_as::<_, EquipmentUtilization>(
        r#"
        SELECT e.equipment_code,
               e.name,
               e.equipment_type,
               e.status,
               COUNT(p.production_record_id) AS total_production_records,
               COALESCE(SUM(p.ore_extracted_tonnes), 0)::float8 AS total_ore_extracted
        FROM equipment e
        LEFT JOIN production_records p ON p.equipment_id = e.equipment_id
        GROUP BY e.equipment_id
        ORDER BY COALESCE(SUM(p.ore_extracted_tonnes), 0) DESC, e.equipment_code
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Quick operations overview: trailing 7-day production stats, top equipment
/// by utilization, and the number of open maintenance logs. Composition only.
pub async fn operations_summary(pool: &PgPool) -> Result<OperationsSummary, sqlx::Error> {
    let today = Utc::now().date_naive();
    let week_ago = today - Duration::days(7);

    let production = production_stats(pool, week_ago, today).await?;
    let utilization = equipment_utilization(pool).await?;

    let pending_maintenance: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM maintenance_logs WHERE NOT is_completed"#)
            .fetch_one(pool)
            .await?;

    let equipment_tracked = utilization.len() as i64;
    let top_equipment = utilization.into_iter().take(5).collect();

    Ok(OperationsSummary {
        period_start: week_ago,
        period_end: today,
        production,
        equipment_tracked,
        top_equipment,
        pending_maintenance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EquipmentStatus, ShiftType};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seed_shift(pool: &PgPool, date: NaiveDate, workers: i32) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO shifts(shift_date, shift_type, mine_section, workers_count, start_time)
            VALUES ($1, $2, 'Section A', $3, now())
            RETURNING shift_id
            "#,
        )
        .bind(date)
        .bind(ShiftType::Morning)
        .bind(workers)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_equipment(pool: &PgPool, code: &str) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO equipment(equipment_code, name, equipment_type, status)
            VALUES ($1, $2, 'excavator', $3)
            RETURNING equipment_id
            "#,
        )
        .bind(code)
        .bind(format!("Unit {code}"))
        .bind(EquipmentStatus::Operational)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_record(
        pool: &PgPool,
        shift_id: i64,
        equipment_id: Option<i64>,
        ore: f64,
        waste: f64,
        grade: f64,
    ) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO production_records
                (shift_id, equipment_id, ore_extracted_tonnes, waste_removed_tonnes, ore_grade_percentage)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING production_record_id
            "#,
        )
        .bind(shift_id)
        .bind(equipment_id)
        .bind(ore)
        .bind(waste)
        .bind(grade)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn empty_range_reports_zeros(pool: PgPool) {
        let stats = production_stats(&pool, d("2026-03-01"), d("2026-03-07"))
            .await
            .unwrap();

        assert_eq!(stats.total_ore_extracted, 0.0);
        assert_eq!(stats.total_waste_removed, 0.0);
        assert_eq!(stats.average_ore_grade, 0.0);
        assert_eq!(stats.total_shifts, 0);
        assert_eq!(stats.average_workers_per_shift, 0.0);
        // Requested bounds are echoed back unchanged.
        assert_eq!(stats.period_start, d("2026-03-01"));
        assert_eq!(stats.period_end, d("2026-03-07"));
    }

    #[sqlx::test]
    async fn single_day_stats_scenario(pool: PgPool) {
        let shift = seed_shift(&pool, d("2026-02-06"), 40).await;
        seed_record(&pool, shift, None, 10.0, 4.0, 2.0).await;
        seed_record(&pool, shift, None, 5.5, 2.0, 3.0).await;

        let stats = production_stats(&pool, d("2026-02-06"), d("2026-02-06"))
            .await
            .unwrap();

        assert_eq!(stats.total_ore_extracted, 15.5);
        assert_eq!(stats.total_waste_removed, 6.0);
        assert_eq!(stats.average_ore_grade, 2.5);
        assert_eq!(stats.total_shifts, 1);
        assert_eq!(stats.average_workers_per_shift, 40.0);
    }

    #[sqlx::test]
    async fn stats_sides_do_not_cross_filter(pool: PgPool) {
        // A shift with no production records still counts on the shift side
        // and contributes nothing to the production side.
        let with_records = seed_shift(&pool, d("2026-02-06"), 30).await;
        seed_record(&pool, with_records, None, 12.0, 1.0, 1.5).await;
        seed_shift(&pool, d("2026-02-07"), 50).await;
        // Outside the range on both sides.
        let outside = seed_shift(&pool, d("2026-02-20"), 10).await;
        seed_record(&pool, outside, None, 99.0, 99.0, 9.0).await;

        let stats = production_stats(&pool, d("2026-02-01"), d("2026-02-07"))
            .await
            .unwrap();

        assert_eq!(stats.total_ore_extracted, 12.0);
        assert_eq!(stats.total_shifts, 2);
        assert_eq!(stats.average_workers_per_shift, 40.0);
    }

    #[sqlx::test]
    async fn inverted_range_is_empty_not_an_error(pool: PgPool) {
        let shift = seed_shift(&pool, d("2026-02-06"), 20).await;
        seed_record(&pool, shift, None, 10.0, 0.0, 2.0).await;

        let stats = production_stats(&pool, d("2026-02-07"), d("2026-02-01"))
            .await
            .unwrap();

        assert_eq!(stats.total_ore_extracted, 0.0);
        assert_eq!(stats.total_shifts, 0);
        assert_eq!(stats.period_start, d("2026-02-07"));
        assert_eq!(stats.period_end, d("2026-02-01"));
    }

    #[sqlx::test]
    async fn daily_rollup_groups_and_orders_by_date(pool: PgPool) {
        let eq = seed_equipment(&pool, "EX-100").await;
        let day1 = seed_shift(&pool, d("2026-02-05"), 25).await;
        let day3 = seed_shift(&pool, d("2026-02-07"), 25).await;
        // Two records on the same day referencing the same equipment: the
        // distinct counts must not double.
        seed_record(&pool, day1, Some(eq), 10.0, 3.0, 2.0).await;
        seed_record(&pool, day1, Some(eq), 7.0, 1.0, 2.4).await;
        seed_record(&pool, day3, None, 10.0, 2.0, 1.8).await;

        let days = daily_production(&pool, d("2026-02-01"), d("2026-02-28"))
            .await
            .unwrap();

        // 2026-02-06 has no rows and must be absent, not zero-filled.
        assert_eq!(days.len(), 2);
        assert!(days.windows(2).all(|w| w[0].date < w[1].date));

        assert_eq!(days[0].date, d("2026-02-05"));
        assert_eq!(days[0].total_ore, 17.0);
        assert_eq!(days[0].total_waste, 4.0);
        assert_eq!(days[0].shift_count, 1);
        assert_eq!(days[0].equipment_used, 1);

        assert_eq!(days[1].date, d("2026-02-07"));
        assert_eq!(days[1].total_ore, 10.0);
        assert_eq!(days[1].shift_count, 1);
        assert_eq!(days[1].equipment_used, 0);
    }

    #[sqlx::test]
    async fn daily_rollup_one_record_per_shift_on_two_days(pool: PgPool) {
        let s1 = seed_shift(&pool, d("2026-02-05"), 20).await;
        let s2 = seed_shift(&pool, d("2026-02-06"), 20).await;
        seed_record(&pool, s1, None, 10.0, 0.0, 2.0).await;
        seed_record(&pool, s2, None, 10.0, 0.0, 2.0).await;

        let days = daily_production(&pool, d("2026-02-01"), d("2026-02-28"))
            .await
            .unwrap();

        assert_eq!(days.len(), 2);
        for day in &days {
            assert_eq!(day.total_ore, 10.0);
            assert_eq!(day.shift_count, 1);
        }
    }

    #[sqlx::test]
    async fn utilization_includes_idle_equipment(pool: PgPool) {
        seed_equipment(&pool, "EQ-1").await;
        let busy = seed_equipment(&pool, "EQ-2").await;
        let shift = seed_shift(&pool, d("2026-02-06"), 20).await;
        seed_record(&pool, shift, Some(busy), 42.0, 5.0, 2.1).await;

        let util = equipment_utilization(&pool).await.unwrap();

        assert_eq!(util.len(), 2);
        assert_eq!(util[0].equipment_code, "EQ-2");
        assert_eq!(util[0].total_production_records, 1);
        assert_eq!(util[0].total_ore_extracted, 42.0);

        let idle = &util[1];
        assert_eq!(idle.equipment_code, "EQ-1");
        assert_eq!(idle.total_production_records, 0);
        assert_eq!(idle.total_ore_extracted, 0.0);
        assert_eq!(idle.status, EquipmentStatus::Operational);
    }

    #[sqlx::test]
    async fn utilization_orders_by_ore_then_code(pool: PgPool) {
        let a = seed_equipment(&pool, "EQ-A").await;
        let b = seed_equipment(&pool, "EQ-B").await;
        seed_equipment(&pool, "EQ-D").await;
        seed_equipment(&pool, "EQ-C").await;
        let shift = seed_shift(&pool, d("2026-02-06"), 20).await;
        seed_record(&pool, shift, Some(b), 30.0, 0.0, 2.0).await;
        seed_record(&pool, shift, Some(a), 12.0, 0.0, 2.0).await;

        let util = equipment_utilization(&pool).await.unwrap();
        let codes: Vec<&str> = util.iter().map(|u| u.equipment_code.as_str()).collect();

        // Non-increasing ore; equal sums (the two idle units) sort by code.
        assert_eq!(codes, vec!["EQ-B", "EQ-A", "EQ-C", "EQ-D"]);
        assert!(util
            .windows(2)
            .all(|w| w[0].total_ore_extracted >= w[1].total_ore_extracted));
    }

    #[sqlx::test]
    async fn aggregations_are_idempotent(pool: PgPool) {
        let eq = seed_equipment(&pool, "EQ-1").await;
        let shift = seed_shift(&pool, d("2026-02-06"), 35).await;
        seed_record(&pool, shift, Some(eq), 10.0, 5.0, 2.0).await;

        let stats1 = production_stats(&pool, d("2026-02-01"), d("2026-02-28")).await.unwrap();
        let stats2 = production_stats(&pool, d("2026-02-01"), d("2026-02-28")).await.unwrap();
        assert_eq!(stats1, stats2);

        let daily1 = daily_production(&pool, d("2026-02-01"), d("2026-02-28")).await.unwrap();
        let daily2 = daily_production(&pool, d("2026-02-01"), d("2026-02-28")).await.unwrap();
        assert_eq!(daily1, daily2);

        let util1 = equipment_utilization(&pool).await.unwrap();
        let util2 = equipment_utilization(&pool).await.unwrap();
        assert_eq!(util1, util2);
    }

    #[sqlx::test]
    async fn summary_composes_week_window_and_counts(pool: PgPool) {
        let today = Utc::now().date_naive();
        let eq = seed_equipment(&pool, "EQ-1").await;
        let shift = seed_shift(&pool, today, 20).await;
        seed_record(&pool, shift, Some(eq), 25.0, 2.0, 3.0).await;
        sqlx::query(
            r#"
            INSERT INTO maintenance_logs(equipment_id, maintenance_type, description, is_completed)
            VALUES ($1, 'corrective', 'hydraulic leak', FALSE),
                   ($1, 'preventive', 'oil change', TRUE)
            "#,
        )
        .bind(eq)
        .execute(&pool)
        .await
        .unwrap();

        let summary = operations_summary(&pool).await.unwrap();

        assert_eq!(summary.period_end, today);
        assert_eq!(summary.period_start, today - Duration::days(7));
        assert_eq!(summary.production.total_ore_extracted, 25.0);
        assert_eq!(summary.equipment_tracked, 1);
        assert_eq!(summary.top_equipment.len(), 1);
        assert_eq!(summary.top_equipment[0].equipment_code, "EQ-1");
        assert_eq!(summary.pending_maintenance, 1);
    }
}
