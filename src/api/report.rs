use std::collections::{HashMap, HashSet};

use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::error;
use utoipa::ToSchema;

use crate::api::payroll::{days_in_month, next_month, parse_month};
use crate::auth::auth::AuthUser;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SummaryQuery {
    /// Range start, local day (inclusive).
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    /// Range end, local day (inclusive).
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub location_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryRow {
    pub employee_id: u64,
    pub name: String,
    pub present_days: u32,
    pub absent_days: u32,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub days: u32,
    pub rows: Vec<SummaryRow>,
}

/// Attendance summary over a date range
#[utoipa::path(
    get,
    path = "/api/v1/reports/attendance-summary",
    params(
        ("from" = String, Query, description = "Range start (YYYY-MM-DD)"),
        ("to" = String, Query, description = "Range end (YYYY-MM-DD)"),
        ("location_id" = Option<u64>, Query, description = "Filter by location")
    ),
    responses(
        (status = 200, description = "Per-employee present/absent counts", body = SummaryResponse),
        (status = 400, description = "Invalid range")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    if query.from > query.to {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Range start must not be after range end"
        })));
    }

    let days = (query.to - query.from).num_days() as u32 + 1;
    let location_filter = auth.location_scope().or(query.location_id);

    let mut qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT e.id, e.name, COUNT(DISTINCT a.day)
        FROM employees e
        LEFT JOIN attendance_log a
               ON a.employee_id = e.id
              AND a.kind = 'check_in'
              AND a.day BETWEEN "#,
    );
    qb.push_bind(query.from);
    qb.push(" AND ");
    qb.push_bind(query.to);
    qb.push(" WHERE 1=1");
    if let Some(location_id) = location_filter {
        qb.push(" AND e.location_id = ").push_bind(location_id);
    }
    qb.push(" GROUP BY e.id, e.name ORDER BY e.name");

    let rows: Vec<(u64, String, i64)> = qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to build attendance summary");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let rows = rows
        .into_iter()
        .map(|(employee_id, name, present)| {
            let present_days = (present.max(0) as u32).min(days);
            SummaryRow {
                employee_id,
                name,
                present_days,
                absent_days: days - present_days,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(SummaryResponse {
        from: query.from,
        to: query.to,
        days,
        rows,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthQuery {
    /// Report month, `YYYY-MM`.
    pub month: String,
    pub location_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyStatusRow {
    pub employee_id: u64,
    pub name: String,
    /// One entry per day of the month: `P` (present) or `A` (absent).
    pub statuses: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyStatusResponse {
    pub month: String,
    pub days: u32,
    pub rows: Vec<MonthlyStatusRow>,
}

/// Per-day presence for every employee in a month
#[utoipa::path(
    get,
    path = "/api/v1/reports/monthly-status",
    params(
        ("month" = String, Query, description = "Report month (YYYY-MM)"),
        ("location_id" = Option<u64>, Query, description = "Filter by location")
    ),
    responses(
        (status = 200, description = "Per-employee per-day statuses", body = MonthlyStatusResponse),
        (status = 400, description = "Invalid month")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn monthly_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let Some(month) = parse_month(&query.month) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Month must be formatted as YYYY-MM"
        })));
    };

    let days = days_in_month(month);
    let month_end = next_month(month);
    let location_filter = auth.location_scope().or(query.location_id);

    let mut employees_qb =
        QueryBuilder::<MySql>::new("SELECT id, name FROM employees WHERE 1=1");
    if let Some(location_id) = location_filter {
        employees_qb.push(" AND location_id = ").push_bind(location_id);
    }
    employees_qb.push(" ORDER BY name");

    let employees: Vec<(u64, String)> = employees_qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees for monthly status");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let present: Vec<(u64, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT DISTINCT employee_id, day
        FROM attendance_log
        WHERE kind = 'check_in' AND day >= ? AND day < ?
        "#,
    )
    .bind(month)
    .bind(month_end)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance days");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let mut present_by_employee: HashMap<u64, HashSet<u32>> = HashMap::new();
    for (employee_id, day) in present {
        present_by_employee
            .entry(employee_id)
            .or_default()
            .insert(day.day());
    }

    let rows = employees
        .into_iter()
        .map(|(employee_id, name)| {
            let days_present = present_by_employee.get(&employee_id);
            let statuses = (1..=days)
                .map(|d| {
                    if days_present.is_some_and(|s| s.contains(&d)) {
                        "P".to_string()
                    } else {
                        "A".to_string()
                    }
                })
                .collect();
            MonthlyStatusRow {
                employee_id,
                name,
                statuses,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(MonthlyStatusResponse {
        month: query.month.clone(),
        days,
        rows,
    }))
}
