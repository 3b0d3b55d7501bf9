use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::email_cache;
use crate::utils::email_filter;

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.to_lowercase();

    // Cuckoo filter: fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // Moka cache: fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Ravi Kumar")]
    pub name: String,
    #[schema(example = "ravi@company.com", format = "email")]
    pub email: String,
    pub password: String,
    /// 1 = super admin, 2 = admin
    #[schema(example = 2)]
    pub role_id: u8,
    #[schema(example = 1, nullable = true)]
    pub location_id: Option<u64>,
}

fn validate_role(role_id: u8, location_id: Option<u64>) -> Result<(), &'static str> {
    match Role::from_id(role_id) {
        Some(Role::Admin) if location_id.is_none() => {
            Err("Admin users must be assigned to a location")
        }
        Some(Role::SuperAdmin) if location_id.is_some() => {
            Err("Super admin users cannot be assigned to a location")
        }
        Some(_) => Ok(()),
        None => Err("Unknown role"),
    }
}

/// Create operator user
#[utoipa::path(
    post,
    path = "/api/v1/user",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already exists"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Name, email and password must not be empty"
        })));
    }

    if let Err(msg) = validate_role(payload.role_id, payload.location_id) {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": msg })));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": "Email already taken"
        })));
    }

    let hashed = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return Ok(HttpResponse::InternalServerError().finish());
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password, role_id, location_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&email)
    .bind(&hashed)
    .bind(payload.role_id)
    .bind(payload.location_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            // keep the availability structures in step with the insert
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;

            Ok(HttpResponse::Created().json(json!({
                "message": "User created successfully",
                "user_id": res.last_insert_id(),
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "error": "Email already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to create user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create user"
            })))
        }
    }
}

/// List operator users
#[utoipa::path(
    get,
    path = "/api/v1/user",
    responses(
        (status = 200, description = "User list", body = [User]),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let users: Vec<User> = sqlx::query_as(
        r#"
        SELECT id, name, email, role_id, location_id, is_active, is_deleted, last_login_at, created_at
        FROM users
        WHERE is_deleted = FALSE
        ORDER BY id
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch users");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(users))
}

/// Update operator user
#[utoipa::path(
    put,
    path = "/api/v1/user/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    request_body(content = Object, description = "Any of: name, role_id, location_id, is_active, password"),
    responses(
        (status = 200, description = "User updated"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let user_id = path.into_inner();

    // Password changes go through the hasher, never the generic builder.
    let mut payload = body.into_inner();
    let password = payload
        .as_object_mut()
        .and_then(|o| o.remove("password"))
        .and_then(|v| v.as_str().map(|s| s.to_string()));

    if let Some(password) = password {
        let hashed = hash_password(&password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            ErrorInternalServerError("Internal Server Error")
        })?;

        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(hashed)
            .bind(user_id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to update password");
                ErrorInternalServerError("Internal Server Error")
            })?;
    }

    let has_other_fields = payload.as_object().is_some_and(|o| !o.is_empty());
    if has_other_fields {
        let update = build_update_sql(
            "users",
            &payload,
            &["name", "role_id", "location_id", "is_active"],
            "id",
            user_id,
        )?;

        let affected = execute_update(pool.get_ref(), update)
            .await
            .map_err(actix_web::error::ErrorInternalServerError)?;

        if affected == 0 {
            return Ok(HttpResponse::NotFound().body("User not found"));
        }
    }

    Ok(HttpResponse::Ok().body("User updated successfully"))
}

/// Delete operator user (soft)
#[utoipa::path(
    delete,
    path = "/api/v1/user/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let user_id = path.into_inner();

    let result =
        sqlx::query("UPDATE users SET is_deleted = TRUE, is_active = FALSE WHERE id = ?")
            .bind(user_id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to delete user");
                ErrorInternalServerError("Internal Server Error")
            })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User deleted"
    })))
}
