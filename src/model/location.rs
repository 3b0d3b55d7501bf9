use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Location {
    pub id: u64,
    pub name: String,
    pub address: Option<String>,
    /// Geofence anchor; locations without coordinates never resolve.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_deleted: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}
