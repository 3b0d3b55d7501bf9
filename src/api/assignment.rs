use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;

#[derive(Deserialize, ToSchema)]
pub struct BulkAssignShift {
    pub user_ids: Vec<u64>,
    pub shift_id: u64,
    pub location_id: u64,
}

/// Assign a shift to multiple users at a location
#[utoipa::path(
    post,
    path = "/api/v1/assignment/bulk",
    request_body = BulkAssignShift,
    responses(
        (status = 200, description = "Shift assigned to multiple users"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Assignment"
)]
pub async fn bulk_assign_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkAssignShift>,
) -> actix_web::Result<impl Responder> {
    if let Some(scope) = auth.location_scope() {
        if scope != payload.location_id {
            return Err(actix_web::error::ErrorForbidden(
                "Cannot assign shifts outside your location",
            ));
        }
    }

    for user_id in &payload.user_ids {
        sqlx::query(
            r#"
            INSERT INTO assignments (user_id, location_id, shift_id, created_by)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE shift_id = VALUES(shift_id), created_by = VALUES(created_by)
            "#,
        )
        .bind(user_id)
        .bind(payload.location_id)
        .bind(payload.shift_id)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to assign shift");
            ErrorInternalServerError("Internal Server Error")
        })?;
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "Shift assigned to multiple users"
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct BulkAssignSites {
    pub user_ids: Vec<u64>,
    pub site_ids: Vec<u64>,
}

/// Assign sites to multiple users
#[utoipa::path(
    post,
    path = "/api/v1/assignment/sites/bulk",
    request_body = BulkAssignSites,
    responses(
        (status = 200, description = "Sites assigned to multiple users"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Assignment"
)]
pub async fn bulk_assign_sites(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkAssignSites>,
) -> actix_web::Result<impl Responder> {
    for user_id in &payload.user_ids {
        for site_id in &payload.site_ids {
            sqlx::query(
                r#"
                INSERT INTO user_sites (user_id, site_id, created_by)
                VALUES (?, ?, ?)
                ON DUPLICATE KEY UPDATE created_by = VALUES(created_by)
                "#,
            )
            .bind(user_id)
            .bind(site_id)
            .bind(auth.user_id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, user_id, site_id, "Failed to assign site");
                ErrorInternalServerError("Internal Server Error")
            })?;
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "Sites assigned to multiple users"
    })))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AssignmentRow {
    pub id: u64,
    pub user_id: u64,
    pub user_name: String,
    pub location_id: u64,
    pub shift_id: u64,
    pub shift_name: String,
}

/// List shift assignments
#[utoipa::path(
    get,
    path = "/api/v1/assignment",
    responses(
        (status = 200, description = "Assignment list", body = [AssignmentRow])
    ),
    security(("bearer_auth" = [])),
    tag = "Assignment"
)]
pub async fn list_assignments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows: Vec<AssignmentRow> = match auth.location_scope() {
        Some(location_id) => {
            sqlx::query_as(
                r#"
                SELECT a.id, a.user_id, u.name AS user_name, a.location_id, a.shift_id, s.name AS shift_name
                FROM assignments a
                JOIN users u ON u.id = a.user_id
                JOIN shifts s ON s.id = a.shift_id
                WHERE a.location_id = ?
                ORDER BY a.id
                "#,
            )
            .bind(location_id)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT a.id, a.user_id, u.name AS user_name, a.location_id, a.shift_id, s.name AS shift_name
                FROM assignments a
                JOIN users u ON u.id = a.user_id
                JOIN shifts s ON s.id = a.shift_id
                ORDER BY a.id
                "#,
            )
            .fetch_all(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch assignments");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}
