use crate::api::assignment::{AssignmentRow, BulkAssignShift, BulkAssignSites};
use crate::api::attendance::{LogListResponse, LogQuery, LogRow};
use crate::api::employee::{EmployeeDetailResponse, EmployeeListResponse, EmployeeQuery};
use crate::api::location::{CreateLocation, LocationQuery};
use crate::api::payroll::{GeneratePayroll, PaginatedPayrollResponse, PayrollQuery, PayrollRow};
use crate::api::report::{
    MonthQuery, MonthlyStatusResponse, MonthlyStatusRow, SummaryQuery, SummaryResponse, SummaryRow,
};
use crate::api::shift::CreateShift;
use crate::api::site::{CreateSite, SiteQuery};
use crate::api::user::CreateUser;
use crate::engine::geo::GeofenceHit;
use crate::engine::state::EventKind;
use crate::model::attendance::AttendanceLog;
use crate::model::employee::Employee;
use crate::model::location::Location;
use crate::model::payroll::PayrollRecord;
use crate::model::shift::Shift;
use crate::model::site::Site;
use crate::model::user::User;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Face Attendance API",
        version = "1.0.0",
        description = r#"
## Face-Recognition Attendance & Payroll

This API powers an employee attendance system driven by face recognition.

### 🔹 Key Features
- **Attendance Scanning**
  - Upload a photo, match it against registered employees, and record a
    check-in or check-out for the current local day
  - Optional geofencing: scans carrying coordinates are resolved to the
    nearest registered site within 50 meters
- **Employee Management**
  - Register employees with a face photo, manage profiles and locations
- **Payroll Management**
  - Generate monthly payroll from attendance with per-day deductions
- **Reports**
  - Attendance summaries and per-day monthly status

### 🔐 Security
Endpoints are protected using **JWT Bearer authentication**.
Super admins see all locations; admins are scoped to one.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::scan,
        crate::api::attendance::list_logs,

        crate::api::employee::register_employee,
        crate::api::employee::update_face,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::location::create_location,
        crate::api::location::list_locations,
        crate::api::location::get_location,
        crate::api::location::update_location,
        crate::api::location::delete_location,

        crate::api::site::create_site,
        crate::api::site::list_sites,
        crate::api::site::update_site,
        crate::api::site::delete_site,

        crate::api::shift::create_shift,
        crate::api::shift::list_shifts,
        crate::api::shift::update_shift,
        crate::api::shift::delete_shift,

        crate::api::assignment::bulk_assign_shift,
        crate::api::assignment::bulk_assign_sites,
        crate::api::assignment::list_assignments,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::payroll::generate_payroll,
        crate::api::payroll::list_payrolls,

        crate::api::report::attendance_summary,
        crate::api::report::monthly_status
    ),
    components(
        schemas(
            EventKind,
            GeofenceHit,
            AttendanceLog,
            LogQuery,
            LogRow,
            LogListResponse,
            Employee,
            EmployeeQuery,
            EmployeeListResponse,
            EmployeeDetailResponse,
            Location,
            LocationQuery,
            CreateLocation,
            Site,
            SiteQuery,
            CreateSite,
            Shift,
            CreateShift,
            AssignmentRow,
            BulkAssignShift,
            BulkAssignSites,
            User,
            CreateUser,
            PayrollRecord,
            GeneratePayroll,
            PayrollQuery,
            PayrollRow,
            PaginatedPayrollResponse,
            SummaryQuery,
            SummaryRow,
            SummaryResponse,
            MonthQuery,
            MonthlyStatusRow,
            MonthlyStatusResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Face attendance scanning and event logs"),
        (name = "Employee", description = "Employee registration and management"),
        (name = "Location", description = "Location management"),
        (name = "Site", description = "Site management"),
        (name = "Shift", description = "Shift management"),
        (name = "Assignment", description = "Shift and site assignment"),
        (name = "User", description = "Operator user management"),
        (name = "Payroll", description = "Payroll generation and records"),
        (name = "Reports", description = "Attendance reporting"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
