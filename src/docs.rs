use crate::api::attendance::{AttendanceQuery, AttendanceWithName, UploadResponse};
use crate::api::dashboard::{
    DailyAttendanceCount, DashboardStats, PaymentBasisCount, PresentEmployee, TopRateEmployee,
};
use crate::api::employee::{CreateEmployee, EmployeeListResponse};
use crate::api::payout::{
    PayoutPeriodsResponse, PayoutQuery, PayoutWithEmployee, PeriodReport, SavePayout, UpdatePayout,
};
use crate::api::settings::UpdateSettings;
use crate::engine::ingest::SkipStats;
use crate::model::attendance::Attendance;
use crate::model::employee::{Employee, PaymentBasis};
use crate::model::payout::Payout;
use crate::model::settings::SystemSettings;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payday API",
        version = "1.0.0",
        description = r#"
## Payroll & Attendance Administration

Backend for an HR payout dashboard: employee records, attendance device-log
ingestion, payout-period reconciliation and global scheduling settings.

### Key Features
- **Employee Management**
  - Create, update, list, and view employee profiles with daily rates and payment cadences
- **Attendance Ingestion**
  - Upload raw check-in/check-out device logs; windows are derived per employee per day and re-uploads are idempotent
- **Payout Reconciliation**
  - Preview weekly/biweekly/monthly payout periods and persist per-period payouts, preserving paid status and comments across recomputation
- **System Settings**
  - Configurable working days and hours that drive expected-hours calculations

### Security
Endpoints under the API prefix require **JWT Bearer authentication**.

### Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::upload_log,
        crate::api::attendance::list_attendance,
        crate::api::attendance::employee_attendance,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::payout::preview_periods,
        crate::api::payout::save_payout,
        crate::api::payout::list_payouts,
        crate::api::payout::get_payout,
        crate::api::payout::update_payout,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,

        crate::api::dashboard::dashboard_stats
    ),
    components(
        schemas(
            Employee,
            PaymentBasis,
            CreateEmployee,
            EmployeeListResponse,
            Attendance,
            AttendanceQuery,
            AttendanceWithName,
            UploadResponse,
            SkipStats,
            Payout,
            PayoutQuery,
            PayoutWithEmployee,
            PayoutPeriodsResponse,
            PeriodReport,
            SavePayout,
            UpdatePayout,
            SystemSettings,
            UpdateSettings,
            DashboardStats,
            DailyAttendanceCount,
            PresentEmployee,
            PaymentBasisCount,
            TopRateEmployee
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance log ingestion and history APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Payout", description = "Payout period reconciliation APIs"),
        (name = "Settings", description = "Global scheduling settings APIs"),
        (name = "Dashboard", description = "Aggregate statistics APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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
