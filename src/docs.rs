use crate::api::customer_measurement::{
    CreateCustomerMeasurement, MeasurementPage, UpdateCustomerMeasurement,
};
use crate::api::leave::{CreateLeave, UpdateLeave};
use crate::api::task::{CreateTask, UpdateTask};
use crate::api::user::{CreateUser, UpdateUser};
use crate::model::customer_measurement::CustomerMeasurement;
use crate::model::leave::{Leave, LeaveStatus};
use crate::model::role::Role;
use crate::model::task::{Task, TaskPriority, TaskStatus};
use crate::model::user::UserResponse;
use crate::models::{LoginRequest, RegisterRequest, TokenResponse};
use crate::utils::pagination::{PageLinks, PageMeta};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM API",
        version = "1.0.0",
        description = r#"
## Human Resource Management API

REST API for the core HR operations of a tailoring business.

### 🔹 Key Features
- **User Management**
  - Create, update, list and view user accounts with Admin/Manager/Employee roles
- **Task Management**
  - Assign tasks to users, track priority and completion status
- **Leave Management**
  - Apply for leave, track approval status, per-user leave history
- **Customer Measurements**
  - Garment measurement records with soft delete, restore and permanent delete

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication**.
Mutating user and measurement endpoints require the **Admin** or **Manager** role.

### 📦 Response Format
- JSON-based RESTful responses
- Customer measurement listings are paginated as `{data, links, meta}`
- Validation failures return `422` with per-field messages

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::user::list_users,
        crate::api::user::create_user,
        crate::api::user::get_user,
        crate::api::user::profile,
        crate::api::user::find_by_email,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::task::list_tasks,
        crate::api::task::create_task,
        crate::api::task::get_task,
        crate::api::task::update_task,
        crate::api::task::delete_task,

        crate::api::leave::list_leaves,
        crate::api::leave::create_leave,
        crate::api::leave::get_leave,
        crate::api::leave::update_leave,
        crate::api::leave::delete_leave,
        crate::api::leave::find_by_user,
        crate::api::leave::find_pending_by_user,
        crate::api::leave::find_approved_by_user,
        crate::api::leave::find_rejected_by_user,

        crate::api::customer_measurement::list_measurements,
        crate::api::customer_measurement::create_measurement,
        crate::api::customer_measurement::get_measurement,
        crate::api::customer_measurement::update_measurement,
        crate::api::customer_measurement::delete_measurement,
        crate::api::customer_measurement::trashed_measurements,
        crate::api::customer_measurement::restore_measurement,
        crate::api::customer_measurement::force_delete_measurement,
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            TokenResponse,
            Role,
            UserResponse,
            CreateUser,
            UpdateUser,
            Task,
            TaskPriority,
            TaskStatus,
            CreateTask,
            UpdateTask,
            Leave,
            LeaveStatus,
            CreateLeave,
            UpdateLeave,
            CustomerMeasurement,
            CreateCustomerMeasurement,
            UpdateCustomerMeasurement,
            MeasurementPage,
            PageLinks,
            PageMeta,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication APIs"),
        (name = "Users", description = "User management APIs"),
        (name = "Tasks", description = "Task management APIs"),
        (name = "Leaves", description = "Leave management APIs"),
        (name = "Customer Measurements", description = "Customer measurement APIs"),
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
