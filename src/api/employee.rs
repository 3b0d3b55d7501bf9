use actix_multipart::form::{MultipartForm, bytes::Bytes, text::Text};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::encoder::HttpFaceEncoder;
use crate::engine::matching::embedding_to_bytes;
use crate::engine::{AttendanceEngine, FaceEncoder, RegisterOutcome, RegisterRequest, SystemClock};
use crate::model::employee::Employee;
use crate::repo::SqlScanStore;
use crate::utils::db_utils::{build_update_sql, execute_update};

#[derive(Debug, MultipartForm)]
pub struct RegisterUpload {
    pub name: Text<String>,
    #[multipart(limit = "10MB")]
    pub face_image: Bytes,
    #[multipart(limit = "10MB")]
    pub profile_photo: Option<Bytes>,
    pub location_id: Option<Text<String>>,
    pub base_salary: Option<Text<String>>,
    pub deduction_per_day: Option<Text<String>>,
}

fn parse_optional<T: std::str::FromStr>(field: &Option<Text<String>>, name: &str) -> Option<T> {
    let raw = field.as_ref()?.0.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(field = name, value = raw, "ignoring unparsable form field");
            None
        }
    }
}

/// Register Employee (face required)
#[utoipa::path(
    post,
    path = "/api/v1/employee/register",
    request_body(content = Object, content_type = "multipart/form-data",
        description = "Fields: name, face_image (required), profile_photo, location_id, base_salary, deduction_per_day"),
    responses(
        (status = 201, description = "Employee registered", body = Object, example = json!({
            "status": "Employee registered",
            "employee_id": 12,
            "name": "Asha Rao"
        })),
        (status = 400, description = "Missing name or no face detected", body = Object, example = json!({
            "error": "No face detected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn register_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    encoder: web::Data<HttpFaceEncoder>,
    MultipartForm(form): MultipartForm<RegisterUpload>,
) -> actix_web::Result<impl Responder> {
    // A scoped admin registers into their own location regardless of the form.
    let location_id = auth
        .location_scope()
        .or_else(|| parse_optional::<u64>(&form.location_id, "location_id"));

    let store = SqlScanStore::new(pool.get_ref().clone(), auth.location_scope());
    let engine = AttendanceEngine::new(
        encoder.get_ref().clone(),
        store,
        SystemClock,
        config.engine_config(),
    );

    let outcome = engine
        .register(RegisterRequest {
            name: form.name.0.clone(),
            face_image: form.face_image.data.to_vec(),
            photo: form.profile_photo.as_ref().map(|p| p.data.to_vec()),
            location_id,
            base_salary: parse_optional(&form.base_salary, "base_salary").unwrap_or(0.0),
            deduction_per_day: parse_optional(&form.deduction_per_day, "deduction_per_day")
                .unwrap_or(0.0),
        })
        .await
        .map_err(|e| {
            error!(error = %e, "employee registration failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(match outcome {
        RegisterOutcome::Registered { employee_id, name } => {
            HttpResponse::Created().json(json!({
                "status": "Employee registered",
                "employee_id": employee_id,
                "name": name,
            }))
        }
        RegisterOutcome::MissingName => HttpResponse::BadRequest().json(json!({
            "error": "Name is required"
        })),
        RegisterOutcome::NoFaceDetected => HttpResponse::BadRequest().json(json!({
            "error": "No face detected"
        })),
    })
}

#[derive(Debug, MultipartForm)]
pub struct FaceUpload {
    #[multipart(limit = "10MB")]
    pub face_image: Bytes,
}

/// Replace an employee's face template
#[utoipa::path(
    put,
    path = "/api/v1/employee/{employee_id}/face",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(content = Object, content_type = "multipart/form-data",
        description = "Field: face_image (required)"),
    responses(
        (status = 200, description = "Face template replaced"),
        (status = 400, description = "No face detected"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn update_face(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    encoder: web::Data<HttpFaceEncoder>,
    path: web::Path<u64>,
    MultipartForm(form): MultipartForm<FaceUpload>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let embedding = encoder
        .encode(&form.face_image.data)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "face encoding failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(embedding) = embedding else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "No face detected"
        })));
    };

    // Wholesale replacement in a single statement: no scan can observe a
    // partially updated template.
    let result = sqlx::query("UPDATE employees SET face_encoding = ? WHERE id = ?")
        .bind(embedding_to_bytes(&embedding))
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "failed to replace face template");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Face template replaced"
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub location_id: Option<u64>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 5)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/employee",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("location_id" = Option<u64>, Query, description = "Filter by location"),
        ("search" = Option<String>, Query, description = "Search by name")
    ),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // A scoped admin's filter always wins over the query parameter.
    let location_filter = auth.location_scope().or(query.location_id);

    let push_filters = |qb: &mut QueryBuilder<MySql>| {
        if let Some(location_id) = location_filter {
            qb.push(" AND e.location_id = ").push_bind(location_id);
        }
        if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
            qb.push(" AND e.name LIKE ")
                .push_bind(format!("%{}%", search.trim()));
        }
    };

    let mut count_qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM employees e WHERE 1=1");
    push_filters(&mut count_qb);

    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count employees");
            ErrorInternalServerError("Database error")
        })?;

    let mut data_qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT e.id, e.name, e.location_id, l.name AS location_name,
               e.base_salary, e.deduction_per_day,
               (LENGTH(e.face_encoding) > 0) AS has_face_encoding
        FROM employees e
        LEFT JOIN locations l ON l.id = e.location_id
        WHERE 1=1
        "#,
    );
    push_filters(&mut data_qb);
    data_qb.push(" ORDER BY e.id DESC LIMIT ");
    data_qb.push_bind(per_page as i64);
    data_qb.push(" OFFSET ");
    data_qb.push_bind(offset as i64);

    type Row = (u64, String, Option<u64>, Option<String>, f64, f64, i64);
    let rows: Vec<Row> = data_qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees");
            ErrorInternalServerError("Database error")
        })?;

    let data = rows
        .into_iter()
        .map(
            |(id, name, location_id, location_name, base_salary, deduction_per_day, has_face)| {
                Employee {
                    id,
                    name,
                    location_id,
                    location_name,
                    base_salary,
                    deduction_per_day,
                    has_face_encoding: has_face != 0,
                }
            },
        )
        .collect();

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeDetailResponse {
    pub id: u64,
    pub name: String,
    pub location_id: Option<u64>,
    pub location_name: Option<String>,
    pub base_salary: f64,
    pub deduction_per_day: f64,
    pub has_face_encoding: bool,
    /// Profile photo as a base64 data URI, when one is stored.
    pub photo_data: Option<String>,
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/v1/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDetailResponse),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    type Row = (
        u64,
        String,
        Option<u64>,
        Option<String>,
        f64,
        f64,
        i64,
        Option<Vec<u8>>,
    );
    let row: Option<Row> = sqlx::query_as(
        r#"
        SELECT e.id, e.name, e.location_id, l.name AS location_name,
               e.base_salary, e.deduction_per_day,
               (LENGTH(e.face_encoding) > 0) AS has_face_encoding,
               e.photo
        FROM employees e
        LEFT JOIN locations l ON l.id = e.location_id
        WHERE e.id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((id, name, location_id, location_name, base_salary, deduction_per_day, has_face, photo)) =
        row
    else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    Ok(HttpResponse::Ok().json(EmployeeDetailResponse {
        id,
        name,
        location_id,
        location_name,
        base_salary,
        deduction_per_day,
        has_face_encoding: has_face != 0,
        photo_data: photo.map(|p| format!("data:image/jpeg;base64,{}", BASE64.encode(p))),
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/v1/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(content = Object, description = "Any of: name, location_id, base_salary, deduction_per_day"),
    responses(
        (status = 200, description = "Employee updated successfully"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let update = build_update_sql(
        "employees",
        &body,
        &["name", "location_id", "base_salary", "deduction_per_day"],
        "id",
        employee_id,
    )?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Employee not found"));
    }

    Ok(HttpResponse::Ok().body("Employee updated successfully"))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/v1/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Employee not found"
                })));
            }

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        Err(e) => {
            error!(error = %e, employee_id, "Failed to delete employee");

            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
