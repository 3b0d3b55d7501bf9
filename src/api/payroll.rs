use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;

/// Parse a `YYYY-MM` month string into its first day.
pub(crate) fn parse_month(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()
}

/// First day of the following month.
pub(crate) fn next_month(month: NaiveDate) -> NaiveDate {
    let (year, next) = if month.month() == 12 {
        (month.year() + 1, 1)
    } else {
        (month.year(), month.month() + 1)
    };
    // The first of a month always exists.
    NaiveDate::from_ymd_opt(year, next, 1).unwrap_or(month)
}

pub(crate) fn days_in_month(month: NaiveDate) -> u32 {
    (next_month(month) - month).num_days() as u32
}

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    /// Payroll month, `YYYY-MM`.
    #[schema(example = "2026-01")]
    pub month: String,
}

/// Generate payroll for all employees in scope
#[utoipa::path(
    post,
    path = "/api/v1/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 200, description = "Payroll generated", body = Object, example = json!({
            "status": "Payroll generated",
            "month": "2026-01",
            "employees": 14
        })),
        (status = 400, description = "Invalid month"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<GeneratePayroll>,
) -> actix_web::Result<impl Responder> {
    let Some(month) = parse_month(&payload.month) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Month must be formatted as YYYY-MM"
        })));
    };

    let working_days = days_in_month(month);
    let month_end = next_month(month);

    // Present = any local day in the month with a check-in. The day column
    // was written in the deployment zone, so no timestamp conversion here.
    let mut qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT e.id, e.base_salary, e.deduction_per_day, COUNT(DISTINCT a.day)
        FROM employees e
        LEFT JOIN attendance_log a
               ON a.employee_id = e.id
              AND a.kind = 'check_in'
              AND a.day >= "#,
    );
    qb.push_bind(month);
    qb.push(" AND a.day < ");
    qb.push_bind(month_end);
    qb.push(" WHERE 1=1");
    if let Some(scope) = auth.location_scope() {
        qb.push(" AND e.location_id = ").push_bind(scope);
    }
    qb.push(" GROUP BY e.id, e.base_salary, e.deduction_per_day");

    let rows: Vec<(u64, f64, f64, i64)> = qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to aggregate attendance for payroll");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let mut generated = 0usize;

    for (employee_id, base_salary, deduction_per_day, present) in rows {
        let present_days = (present.max(0) as u32).min(working_days);
        let absent_days = working_days - present_days;
        let total_deduction = absent_days as f64 * deduction_per_day;
        let net_pay = (base_salary - total_deduction).max(0.0);

        sqlx::query(
            r#"
            INSERT INTO payroll_records
            (employee_id, month, working_days, present_days, absent_days,
             base_salary, deduction_per_day, total_deduction, net_pay)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                working_days = VALUES(working_days),
                present_days = VALUES(present_days),
                absent_days = VALUES(absent_days),
                base_salary = VALUES(base_salary),
                deduction_per_day = VALUES(deduction_per_day),
                total_deduction = VALUES(total_deduction),
                net_pay = VALUES(net_pay),
                generated_on = NOW()
            "#,
        )
        .bind(employee_id)
        .bind(month)
        .bind(present_days + absent_days)
        .bind(present_days)
        .bind(absent_days)
        .bind(base_salary)
        .bind(deduction_per_day)
        .bind(total_deduction)
        .bind(net_pay)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to store payroll record");
            ErrorInternalServerError("Internal Server Error")
        })?;

        generated += 1;
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "Payroll generated",
        "month": payload.month,
        "employees": generated,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayrollQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    /// Filter by month, `YYYY-MM`.
    pub month: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct PayrollRow {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    #[schema(value_type = String, format = "date")]
    pub month: NaiveDate,
    pub working_days: u32,
    pub present_days: u32,
    pub absent_days: u32,
    pub base_salary: f64,
    pub deduction_per_day: f64,
    pub total_deduction: f64,
    pub net_pay: f64,
    #[schema(value_type = String, format = "date-time")]
    pub generated_on: chrono::NaiveDateTime,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<PayrollRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// List payroll records
#[utoipa::path(
    get,
    path = "/api/v1/payroll",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("employee_id" = Option<u64>, Query, description = "Filter by employee"),
        ("month" = Option<String>, Query, description = "Filter by month (YYYY-MM)")
    ),
    responses(
        (status = 200, description = "Paginated payroll records", body = PaginatedPayrollResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let month = match query.month.as_deref() {
        Some(raw) => match parse_month(raw) {
            Some(m) => Some(m),
            None => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "error": "Month must be formatted as YYYY-MM"
                })));
            }
        },
        None => None,
    };

    let push_filters = |qb: &mut QueryBuilder<MySql>| {
        if let Some(employee_id) = query.employee_id {
            qb.push(" AND p.employee_id = ").push_bind(employee_id);
        }
        if let Some(month) = month {
            qb.push(" AND p.month = ").push_bind(month);
        }
        if let Some(scope) = auth.location_scope() {
            qb.push(" AND e.location_id = ").push_bind(scope);
        }
    };

    let mut count_qb = QueryBuilder::<MySql>::new(
        "SELECT COUNT(*) FROM payroll_records p JOIN employees e ON e.id = p.employee_id WHERE 1=1",
    );
    push_filters(&mut count_qb);

    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count payrolls");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let mut data_qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT p.id, p.employee_id, e.name AS employee_name, p.month,
               p.working_days, p.present_days, p.absent_days,
               p.base_salary, p.deduction_per_day, p.total_deduction, p.net_pay,
               p.generated_on
        FROM payroll_records p
        JOIN employees e ON e.id = p.employee_id
        WHERE 1=1
        "#,
    );
    push_filters(&mut data_qb);
    data_qb.push(" ORDER BY p.month DESC, p.employee_id LIMIT ");
    data_qb.push_bind(per_page as i64);
    data_qb.push(" OFFSET ");
    data_qb.push_bind(offset as i64);

    let data: Vec<PayrollRow> = data_qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch payroll list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_month_strings() {
        assert_eq!(
            parse_month("2026-01"),
            NaiveDate::from_ymd_opt(2026, 1, 1)
        );
        assert_eq!(parse_month(" 2025-12 "), NaiveDate::from_ymd_opt(2025, 12, 1));
        assert_eq!(parse_month("2026"), None);
        assert_eq!(parse_month("2026-13"), None);
    }

    #[test]
    fn month_lengths_follow_the_calendar() {
        let feb_leap = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let dec = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();

        assert_eq!(days_in_month(feb_leap), 29);
        assert_eq!(days_in_month(feb), 28);
        assert_eq!(days_in_month(dec), 31);
        assert_eq!(next_month(dec), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }
}
