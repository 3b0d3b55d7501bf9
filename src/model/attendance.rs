use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceLog {
    pub id: u64,
    pub employee_id: u64,
    /// `check_in` or `check_out`.
    pub kind: String,
    /// Event instant in UTC.
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,
    /// The event's calendar day in the deployment time zone.
    #[schema(value_type = String, format = "date")]
    pub day: NaiveDate,
    pub location_id: Option<u64>,
    pub site_id: Option<u64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: Option<f64>,
}
