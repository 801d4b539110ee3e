use crate::model::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Credential row for the login path, password hash included. Deliberately
/// not `Serialize`; anything leaving the API goes through [`UserResponse`].
#[derive(Debug, FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "John Doe",
        "email": "john.doe@company.com",
        "department": "Engineering",
        "designation": "Backend Developer",
        "phone": "03123456789",
        "address": "123 Main Street",
        "role": "Employee",
        "is_active": true,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct UserResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub department: String,
    pub designation: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// Column list matching [`UserResponse`]; keeps the password hash out of
/// every read path by construction.
pub const USER_COLUMNS: &str = "id, name, email, department, designation, phone, address, \
     role, is_active, created_at, updated_at";
