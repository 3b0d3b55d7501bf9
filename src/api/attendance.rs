use actix_multipart::form::{MultipartForm, bytes::Bytes, text::Text};
use actix_web::{HttpResponse, Responder, web};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::encoder::HttpFaceEncoder;
use crate::engine::state::EventKind;
use crate::engine::{AttendanceEngine, ScanOutcome, SystemClock};
use crate::repo::SqlScanStore;

#[derive(Debug, MultipartForm)]
pub struct ScanUpload {
    #[multipart(limit = "10MB")]
    pub image: Bytes,
    pub latitude: Option<Text<String>>,
    pub longitude: Option<Text<String>>,
}

/// Both coordinates, or nothing. Unparsable values only skip geofencing,
/// they never fail the scan.
fn parse_coords(form: &ScanUpload) -> Option<(f64, f64)> {
    let lat = form.latitude.as_ref().map(|t| t.0.trim().parse::<f64>());
    let lon = form.longitude.as_ref().map(|t| t.0.trim().parse::<f64>());

    match (lat, lon) {
        (Some(Ok(lat)), Some(Ok(lon))) => Some((lat, lon)),
        (None, None) => None,
        _ => {
            warn!("invalid or partial coordinates on scan, geofencing skipped");
            None
        }
    }
}

/// The matched employee's profile photo as a data URI, when one is stored.
async fn photo_data(pool: &MySqlPool, employee_id: u64) -> Option<String> {
    let photo: Option<Option<Vec<u8>>> =
        sqlx::query_scalar("SELECT photo FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(pool)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, employee_id, "failed to load employee photo");
                None
            });

    photo
        .flatten()
        .map(|p| format!("data:image/jpeg;base64,{}", BASE64.encode(p)))
}

/// Face attendance scan endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body(content = Object, content_type = "multipart/form-data",
        description = "Fields: image (required), latitude, longitude"),
    responses(
        (status = 200, description = "Attendance marked or already complete", body = Object, example = json!({
            "status": "Attendance marked",
            "message": "Checked in successfully",
            "employee": "Asha Rao",
            "type": "check_in",
            "confidence": 0.93,
            "timestamp": "2026-02-03 09:31:12"
        })),
        (status = 400, description = "No face detected", body = Object, example = json!({
            "error": "No face detected"
        })),
        (status = 404, description = "Face not recognized or no employees registered", body = Object, example = json!({
            "error": "Face not recognized"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn scan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    encoder: web::Data<HttpFaceEncoder>,
    MultipartForm(form): MultipartForm<ScanUpload>,
) -> actix_web::Result<impl Responder> {
    let coords = parse_coords(&form);

    let store = SqlScanStore::new(pool.get_ref().clone(), auth.location_scope());
    let engine = AttendanceEngine::new(
        encoder.get_ref().clone(),
        store,
        SystemClock,
        config.engine_config(),
    );

    let outcome = engine
        .process_scan(&form.image.data, coords)
        .await
        .map_err(|e| {
            error!(error = %e, "scan processing failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(match outcome {
        ScanOutcome::Recorded {
            employee_id,
            employee,
            kind,
            confidence,
            timestamp,
            geofence,
        } => {
            let message = match kind {
                EventKind::CheckIn => "Checked in successfully",
                EventKind::CheckOut => "Checked out successfully",
            };
            let local = timestamp.with_timezone(&config.time_zone);
            HttpResponse::Ok().json(json!({
                "status": "Attendance marked",
                "message": message,
                "employee": employee,
                "type": kind,
                "confidence": confidence,
                "timestamp": local.format("%Y-%m-%d %H:%M:%S").to_string(),
                "location": geofence,
                "photo": photo_data(pool.get_ref(), employee_id).await,
            }))
        }
        ScanOutcome::AlreadyComplete {
            employee_id,
            employee,
            confidence,
        } => HttpResponse::Ok().json(json!({
            "status": "Attendance already marked",
            "message": "Check-in and check-out already recorded for today",
            "employee": employee,
            "confidence": confidence,
            "photo": photo_data(pool.get_ref(), employee_id).await,
        })),
        ScanOutcome::NoFaceDetected => HttpResponse::BadRequest().json(json!({
            "error": "No face detected"
        })),
        ScanOutcome::NoneRegistered => HttpResponse::NotFound().json(json!({
            "error": "No employees registered"
        })),
        ScanOutcome::NotRecognized => HttpResponse::NotFound().json(json!({
            "error": "Face not recognized"
        })),
    })
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LogQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    /// Local calendar day, `YYYY-MM-DD`.
    #[schema(value_type = String, format = "date")]
    pub day: Option<NaiveDate>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct LogRow {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub kind: String,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: chrono::NaiveDateTime,
    #[schema(value_type = String, format = "date")]
    pub day: NaiveDate,
    pub location_id: Option<u64>,
    pub site_id: Option<u64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct LogListResponse {
    pub data: Vec<LogRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Attendance event listing
#[utoipa::path(
    get,
    path = "/api/v1/attendance/logs",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("employee_id" = Option<u64>, Query, description = "Filter by employee"),
        ("day" = Option<String>, Query, description = "Filter by local day (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Paginated attendance events", body = LogListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_logs(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LogQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let push_filters = |qb: &mut QueryBuilder<MySql>| {
        if let Some(employee_id) = query.employee_id {
            qb.push(" AND a.employee_id = ").push_bind(employee_id);
        }
        if let Some(day) = query.day {
            qb.push(" AND a.day = ").push_bind(day);
        }
        if let Some(scope) = auth.location_scope() {
            qb.push(" AND e.location_id = ").push_bind(scope);
        }
    };

    let mut count_qb = QueryBuilder::<MySql>::new(
        "SELECT COUNT(*) FROM attendance_log a JOIN employees e ON e.id = a.employee_id WHERE 1=1",
    );
    push_filters(&mut count_qb);

    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count attendance logs");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let mut data_qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT a.id, a.employee_id, e.name AS employee_name, a.kind, a.timestamp, a.day,
               a.location_id, a.site_id, a.latitude, a.longitude, a.distance_km
        FROM attendance_log a
        JOIN employees e ON e.id = a.employee_id
        WHERE 1=1
        "#,
    );
    push_filters(&mut data_qb);
    data_qb.push(" ORDER BY a.timestamp DESC LIMIT ");
    data_qb.push_bind(per_page as i64);
    data_qb.push(" OFFSET ");
    data_qb.push_bind(offset as i64);

    let data: Vec<LogRow> = data_qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance logs");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LogListResponse {
        data,
        page,
        per_page,
        total,
    }))
}
