use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Asha Rao",
        "location_id": 3,
        "location_name": "Head Office",
        "base_salary": 30000.0,
        "deduction_per_day": 1000.0,
        "has_face_encoding": true
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Asha Rao")]
    pub name: String,

    #[schema(example = 3, nullable = true)]
    pub location_id: Option<u64>,

    #[schema(example = "Head Office", nullable = true)]
    pub location_name: Option<String>,

    #[schema(example = 30000.0)]
    pub base_salary: f64,

    #[schema(example = 1000.0)]
    pub deduction_per_day: f64,

    #[schema(example = true)]
    pub has_face_encoding: bool,
}
