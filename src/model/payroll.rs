use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PayrollRecord {
    pub id: u64,
    pub employee_id: u64,
    /// First day of the payroll month.
    #[schema(value_type = String, format = "date")]
    pub month: NaiveDate,
    pub working_days: u32,
    pub present_days: u32,
    pub absent_days: u32,
    pub base_salary: f64,
    pub deduction_per_day: f64,
    pub total_deduction: f64,
    pub net_pay: f64,
    #[schema(value_type = String, format = "date-time")]
    pub generated_on: NaiveDateTime,
}
