use crate::{
    auth::auth::AuthUser,
    auth::password::hash_password,
    error::{ApiError, Validator},
    model::role::Role,
    model::user::{USER_COLUMNS, UserResponse},
    utils::db_utils::{UpdateBuilder, execute_update},
    utils::email_cache,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub email: String,
    #[schema(example = "secret123")]
    pub password: String,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = "Backend Developer")]
    pub designation: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Admin, Manager or Employee
    #[schema(example = "Employee")]
    pub role: String,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Admin, Manager or Employee
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

async fn fetch_user(pool: &MySqlPool, id: u64) -> Result<Option<UserResponse>, sqlx::Error> {
    sqlx::query_as::<_, UserResponse>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

fn parse_role(value: &str) -> Result<Role, ApiError> {
    Role::from_str(value).map_err(|_| ApiError::field("role", "The selected role is invalid."))
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users, newest first", body = [UserResponse]),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let users = sqlx::query_as::<_, UserResponse>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Create user (Admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.require("name", &payload.name);
    v.max_len("name", &payload.name, 255);
    v.require("email", &payload.email);
    v.email("email", &payload.email);
    v.require("password", &payload.password);
    v.min_len("password", &payload.password, 6);
    v.require("department", &payload.department);
    v.require("designation", &payload.designation);
    if let Some(phone) = &payload.phone {
        v.max_len("phone", phone, 20);
    }
    if let Some(address) = &payload.address {
        v.max_len("address", address, 500);
    }
    v.finish()?;

    let role = parse_role(&payload.role)?;

    if !email_cache::is_email_available(&payload.email, pool.get_ref()).await {
        return Err(ApiError::field("email", "The email has already been taken."));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Database(sqlx::Error::Protocol("password hashing failed".into()))
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password, department, designation, phone, address, role, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.email.to_lowercase())
    .bind(&hashed)
    .bind(&payload.department)
    .bind(&payload.designation)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(role.to_string())
    .bind(payload.is_active.unwrap_or(true))
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::on_unique(e, "email", "The email has already been taken."))?;

    email_cache::mark_taken(&payload.email).await;

    let created = fetch_user(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Created().json(created))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user = fetch_user(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(user))
}

/// The authenticated caller's own record
#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    debug!(email = %auth.email, "Profile requested");

    let user = fetch_user(pool.get_ref(), auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Find user by email
#[utoipa::path(
    get,
    path = "/api/users/email/{email}",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn find_by_email(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = path.into_inner();

    let user = sqlx::query_as::<_, UserResponse>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email.to_lowercase())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Partial update (Admin only). A role change is a single-column write; the
/// old grant disappears with the old value.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let payload = payload.into_inner();

    let existing = fetch_user(pool.get_ref(), user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut v = Validator::new();
    for (field, value) in [
        ("name", &payload.name),
        ("department", &payload.department),
        ("designation", &payload.designation),
    ] {
        if let Some(value) = value {
            v.require(field, value);
            v.max_len(field, value, 255);
        }
    }
    if let Some(email) = &payload.email {
        v.email("email", email);
    }
    if let Some(password) = &payload.password {
        v.min_len("password", password, 6);
    }
    if let Some(phone) = &payload.phone {
        v.max_len("phone", phone, 20);
    }
    if let Some(address) = &payload.address {
        v.max_len("address", address, 500);
    }
    v.finish()?;

    let role = payload.role.as_deref().map(parse_role).transpose()?;

    if let Some(email) = &payload.email {
        if !email_cache::is_email_available_excluding(email, user_id, pool.get_ref()).await {
            return Err(ApiError::field("email", "The email has already been taken."));
        }
    }

    let mut update = UpdateBuilder::new("users");
    update
        .set_opt("name", payload.name.map(|n| n.trim().to_string()))
        .set_opt("email", payload.email.as_ref().map(|e| e.to_lowercase()))
        .set_opt("department", payload.department)
        .set_opt("designation", payload.designation)
        .set_opt("phone", payload.phone)
        .set_opt("address", payload.address)
        .set_opt("role", role.map(|r| r.to_string()))
        .set_opt("is_active", payload.is_active);

    if let Some(password) = &payload.password {
        let hashed = hash_password(password).map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ApiError::Database(sqlx::Error::Protocol("password hashing failed".into()))
        })?;
        update.set("password", hashed);
    }

    // Nothing supplied: the row is already in the requested state.
    if update.is_empty() {
        return Ok(HttpResponse::Ok().json(existing));
    }

    execute_update(pool.get_ref(), update.build("id", user_id)).await?;

    if let Some(email) = payload.email {
        email_cache::mark_taken(&email).await;
    }

    let updated = fetch_user(pool.get_ref(), user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete user (Admin only)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 404, description = "User not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_validate_membership() {
        assert_eq!(parse_role("Admin").unwrap(), Role::Admin);
        assert_eq!(parse_role("Manager").unwrap(), Role::Manager);
        assert!(parse_role("Owner").is_err());
        assert!(parse_role("").is_err());
    }

    #[test]
    fn create_payload_validation_reports_every_field() {
        let mut v = Validator::new();
        v.require("name", "");
        v.email("email", "nope");
        v.min_len("password", "123", 6);
        let ApiError::Validation(errors) = v.finish().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.keys().collect::<Vec<_>>(),
            vec!["email", "name", "password"]
        );
    }
}
