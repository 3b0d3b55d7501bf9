use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::model::shift::Shift;
use crate::utils::db_utils::{build_update_sql, execute_update};

#[derive(Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = "Morning")]
    pub name: String,
    #[schema(example = "09:30:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "18:00:00", value_type = String)]
    pub end_time: NaiveTime,
}

/// Create Shift
#[utoipa::path(
    post,
    path = "/api/v1/shift",
    request_body = CreateShift,
    responses(
        (status = 201, description = "Shift created"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO shifts (name, start_time, end_time)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.start_time)
    .bind(payload.end_time)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create shift");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Shift created successfully",
        "shift_id": result.last_insert_id(),
    })))
}

/// List Shifts
#[utoipa::path(
    get,
    path = "/api/v1/shift",
    responses(
        (status = 200, description = "Shift list", body = [Shift])
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn list_shifts(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let shifts: Vec<Shift> =
        sqlx::query_as("SELECT id, name, start_time, end_time FROM shifts ORDER BY start_time")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch shifts");
                ErrorInternalServerError("Internal Server Error")
            })?;

    Ok(HttpResponse::Ok().json(shifts))
}

/// Update Shift
#[utoipa::path(
    put,
    path = "/api/v1/shift/{shift_id}",
    params(
        ("shift_id", Path, description = "Shift ID")
    ),
    request_body(content = Object, description = "Any of: name, start_time, end_time"),
    responses(
        (status = 200, description = "Shift updated"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let shift_id = path.into_inner();

    let update = build_update_sql(
        "shifts",
        &body,
        &["name", "start_time", "end_time"],
        "id",
        shift_id,
    )?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Shift not found"));
    }

    Ok(HttpResponse::Ok().body("Shift updated successfully"))
}

/// Delete Shift
#[utoipa::path(
    delete,
    path = "/api/v1/shift/{shift_id}",
    params(
        ("shift_id", Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift deleted"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn delete_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let shift_id = path.into_inner();

    let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
        .bind(shift_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, shift_id, "Failed to delete shift");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Shift not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Shift deleted"
    })))
}
