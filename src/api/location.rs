use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::model::location::Location;
use crate::utils::db_utils::{build_update_sql, execute_update};

#[derive(Deserialize, ToSchema)]
pub struct CreateLocation {
    #[schema(example = "Head Office")]
    pub name: String,
    #[schema(example = "12 MG Road, Bengaluru", nullable = true)]
    pub address: Option<String>,
    #[schema(example = 12.9716, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 77.5946, nullable = true)]
    pub longitude: Option<f64>,
}

/// Create Location
#[utoipa::path(
    post,
    path = "/api/v1/location",
    request_body = CreateLocation,
    responses(
        (status = 201, description = "Location created"),
        (status = 400, description = "Name is required"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn create_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLocation>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Name is required"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO locations (name, address, latitude, longitude)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&payload.address)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create location");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Location created successfully",
        "location_id": result.last_insert_id(),
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationQuery {
    /// Include soft-deleted locations in the listing.
    pub include_deleted: Option<bool>,
}

/// List Locations
#[utoipa::path(
    get,
    path = "/api/v1/location",
    params(
        ("include_deleted" = Option<bool>, Query, description = "Include soft-deleted locations")
    ),
    responses(
        (status = 200, description = "Location list", body = [Location])
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn list_locations(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LocationQuery>,
) -> actix_web::Result<impl Responder> {
    let include_deleted = query.include_deleted.unwrap_or(false);

    let locations: Vec<Location> = match auth.location_scope() {
        Some(location_id) => {
            sqlx::query_as(
                r#"
                SELECT id, name, address, latitude, longitude, is_deleted, created_at, updated_at
                FROM locations
                WHERE id = ? AND (is_deleted = FALSE OR ?)
                "#,
            )
            .bind(location_id)
            .bind(include_deleted)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT id, name, address, latitude, longitude, is_deleted, created_at, updated_at
                FROM locations
                WHERE is_deleted = FALSE OR ?
                ORDER BY id
                "#,
            )
            .bind(include_deleted)
            .fetch_all(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch locations");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(locations))
}

/// Get Location by ID
#[utoipa::path(
    get,
    path = "/api/v1/location/{location_id}",
    params(
        ("location_id", Path, description = "Location ID")
    ),
    responses(
        (status = 200, description = "Location found", body = Location),
        (status = 404, description = "Location not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn get_location(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let location_id = path.into_inner();

    let location: Option<Location> = sqlx::query_as(
        r#"
        SELECT id, name, address, latitude, longitude, is_deleted, created_at, updated_at
        FROM locations
        WHERE id = ?
        "#,
    )
    .bind(location_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, location_id, "Failed to fetch location");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match location {
        Some(l) => Ok(HttpResponse::Ok().json(l)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Location not found"
        }))),
    }
}

/// Update Location
#[utoipa::path(
    put,
    path = "/api/v1/location/{location_id}",
    params(
        ("location_id", Path, description = "Location ID")
    ),
    request_body(content = Object, description = "Any of: name, address, latitude, longitude"),
    responses(
        (status = 200, description = "Location updated"),
        (status = 404, description = "Location not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn update_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let location_id = path.into_inner();

    let update = build_update_sql(
        "locations",
        &body,
        &["name", "address", "latitude", "longitude"],
        "id",
        location_id,
    )?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Location not found"));
    }

    Ok(HttpResponse::Ok().body("Location updated successfully"))
}

/// Delete Location (soft)
#[utoipa::path(
    delete,
    path = "/api/v1/location/{location_id}",
    params(
        ("location_id", Path, description = "Location ID")
    ),
    responses(
        (status = 200, description = "Location deleted"),
        (status = 404, description = "Location not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn delete_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let location_id = path.into_inner();

    // Soft delete: the row stays for history, but geofencing and listings
    // stop seeing it.
    let result = sqlx::query("UPDATE locations SET is_deleted = TRUE WHERE id = ?")
        .bind(location_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, location_id, "Failed to delete location");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Location not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Location deleted"
    })))
}
