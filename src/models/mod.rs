// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod patch;
pub use patch::Patch;

// ───────────────────────────────────────
// Enums (native Postgres enum types)
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shift_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    Morning,
    Afternoon,
    Night,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "equipment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EquipmentStatus {
    Operational,
    Maintenance,
    Repair,
    Decommissioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "maintenance_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
    Preventive,
    Corrective,
    Emergency,
    Scheduled,
}

// ───────────────────────────────────────
// Users (simple RBAC role string)
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String, // admin | manager | operator
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Operational entities
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Shift {
    pub shift_id: i64,
    pub shift_date: NaiveDate,
    pub shift_type: ShiftType,
    pub mine_section: String,
    pub supervisor_id: Option<i64>, // FK → users
    pub workers_count: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>, // null until the shift closes
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ProductionRecord {
    pub production_record_id: i64,
    pub shift_id: i64,            // FK → shifts
    pub equipment_id: Option<i64>, // FK → equipment
    pub ore_extracted_tonnes: f64,
    pub waste_removed_tonnes: f64,
    pub ore_grade_percentage: f64,
    pub depth_meters: f64,
    pub mining_level: Option<String>,
    pub stope_number: Option<String>,
    pub contamination_level: f64,
    pub moisture_content: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub equipment_id: i64,
    pub equipment_code: String, // unique business key
    pub name: String,
    pub equipment_type: String, // excavator, truck, drill, ...
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub year_manufactured: Option<i32>,
    pub status: EquipmentStatus,
    pub capacity_tonnes: Option<f64>,
    pub fuel_type: Option<String>,
    pub operating_hours: f64,
    pub current_location: Option<String>,
    pub assigned_section: Option<String>,
    pub commissioned_date: Option<NaiveDate>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MaintenanceLog {
    pub maintenance_log_id: i64,
    pub equipment_id: i64, // FK → equipment
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub technician_name: Option<String>,
    pub labor_hours: f64,
    pub parts_cost: f64,
    pub total_cost: f64,
    pub parts_replaced: Option<String>,
    pub is_completed: bool,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Analytics report shapes
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionStats {
    pub total_ore_extracted: f64,
    pub total_waste_removed: f64,
    pub average_ore_grade: f64,
    pub total_shifts: i64,
    pub average_workers_per_shift: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DailyProduction {
    pub date: NaiveDate,
    pub total_ore: f64,
    pub total_waste: f64,
    pub shift_count: i64,
    pub equipment_used: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct EquipmentUtilization {
    pub equipment_code: String,
    pub name: String,
    pub equipment_type: String,
    pub status: EquipmentStatus,
    pub total_production_records: i64,
    pub total_ore_extracted: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OperationsSummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub production: ProductionStats,
    pub equipment_tracked: i64,
    pub top_equipment: Vec<EquipmentUtilization>,
    pub pending_maintenance: i64,
}
