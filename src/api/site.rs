use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::model::site::Site;
use crate::utils::db_utils::{build_update_sql, execute_update};

#[derive(Deserialize, ToSchema)]
pub struct CreateSite {
    #[schema(example = 1)]
    pub location_id: u64,
    #[schema(example = "Warehouse Gate 2")]
    pub name: String,
    #[schema(example = 12.9716, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 77.5946, nullable = true)]
    pub longitude: Option<f64>,
}

/// Create Site
#[utoipa::path(
    post,
    path = "/api/v1/site",
    request_body = CreateSite,
    responses(
        (status = 201, description = "Site created"),
        (status = 400, description = "Name is required or unknown location"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Site"
)]
pub async fn create_site(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSite>,
) -> actix_web::Result<impl Responder> {
    if let Some(scope) = auth.location_scope() {
        if scope != payload.location_id {
            return Err(actix_web::error::ErrorForbidden(
                "Cannot create sites outside your location",
            ));
        }
    }

    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Name is required"
        })));
    }

    let parent: Option<(u64,)> =
        sqlx::query_as("SELECT id FROM locations WHERE id = ? AND is_deleted = FALSE")
            .bind(payload.location_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check parent location");
                ErrorInternalServerError("Internal Server Error")
            })?;

    if parent.is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Unknown location"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO sites (location_id, name, latitude, longitude)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(payload.location_id)
    .bind(name)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create site");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Site created successfully",
        "site_id": result.last_insert_id(),
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SiteQuery {
    pub location_id: Option<u64>,
}

/// List Sites
#[utoipa::path(
    get,
    path = "/api/v1/site",
    params(
        ("location_id" = Option<u64>, Query, description = "Filter by location")
    ),
    responses(
        (status = 200, description = "Site list", body = [Site])
    ),
    security(("bearer_auth" = [])),
    tag = "Site"
)]
pub async fn list_sites(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SiteQuery>,
) -> actix_web::Result<impl Responder> {
    let location_filter = auth.location_scope().or(query.location_id);

    let sites: Vec<Site> = match location_filter {
        Some(location_id) => {
            sqlx::query_as(
                r#"
                SELECT id, location_id, name, latitude, longitude, is_deleted, created_at, updated_at
                FROM sites
                WHERE location_id = ? AND is_deleted = FALSE
                ORDER BY id
                "#,
            )
            .bind(location_id)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT id, location_id, name, latitude, longitude, is_deleted, created_at, updated_at
                FROM sites
                WHERE is_deleted = FALSE
                ORDER BY id
                "#,
            )
            .fetch_all(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch sites");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(sites))
}

/// Update Site
#[utoipa::path(
    put,
    path = "/api/v1/site/{site_id}",
    params(
        ("site_id", Path, description = "Site ID")
    ),
    request_body(content = Object, description = "Any of: name, latitude, longitude"),
    responses(
        (status = 200, description = "Site updated"),
        (status = 404, description = "Site not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Site"
)]
pub async fn update_site(
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let site_id = path.into_inner();

    let update = build_update_sql(
        "sites",
        &body,
        &["name", "latitude", "longitude"],
        "id",
        site_id,
    )?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Site not found"));
    }

    Ok(HttpResponse::Ok().body("Site updated successfully"))
}

/// Delete Site (soft)
#[utoipa::path(
    delete,
    path = "/api/v1/site/{site_id}",
    params(
        ("site_id", Path, description = "Site ID")
    ),
    responses(
        (status = 200, description = "Site deleted"),
        (status = 404, description = "Site not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Site"
)]
pub async fn delete_site(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let site_id = path.into_inner();

    let result = sqlx::query("UPDATE sites SET is_deleted = TRUE WHERE id = ?")
        .bind(site_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, site_id, "Failed to delete site");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Site not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Site deleted"
    })))
}
