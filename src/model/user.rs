use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// 1 = super admin (all locations), 2 = admin (one location).
    pub role_id: u8,
    pub location_id: Option<u64>,
    pub is_active: bool,
    pub is_deleted: bool,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub last_login_at: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
