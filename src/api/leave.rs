use crate::{
    auth::auth::AuthUser,
    error::{ApiError, Validator},
    model::leave::{Leave, LeaveStatus},
    utils::db_utils::{UpdateBuilder, execute_update},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family wedding")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    /// Pending, Approved or Rejected
    pub status: Option<String>,
}

fn parse_status(value: &str) -> Result<LeaveStatus, ApiError> {
    LeaveStatus::from_str(value)
        .map_err(|_| ApiError::field("status", "The selected status is invalid."))
}

/// A leave may not end before it starts.
fn check_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if end < start {
        return Err(ApiError::field(
            "end_date",
            "The end date must be a date after or equal to start date.",
        ));
    }
    Ok(())
}

async fn fetch_leave(pool: &MySqlPool, id: u64) -> Result<Option<Leave>, sqlx::Error> {
    sqlx::query_as::<_, Leave>("SELECT * FROM leaves WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List leaves
#[utoipa::path(
    get,
    path = "/api/leaves",
    responses(
        (status = 200, description = "All leave requests, newest first", body = [Leave]),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn list_leaves(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let leaves = sqlx::query_as::<_, Leave>("SELECT * FROM leaves ORDER BY id DESC")
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(leaves))
}

/// Create leave request. The requester is always the authenticated caller
/// and every new request starts Pending.
#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request created", body = Leave),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.require("reason", &payload.reason);
    v.max_len("reason", &payload.reason, 1000);
    v.finish()?;

    check_date_range(payload.start_date, payload.end_date)?;

    let result = sqlx::query(
        r#"
        INSERT INTO leaves (start_date, end_date, reason, status, requested_by)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.reason.trim())
    .bind(LeaveStatus::Pending.to_string())
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    let created = fetch_leave(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Leave not found"))?;

    Ok(HttpResponse::Created().json(created))
}

/// Get leave by ID
#[utoipa::path(
    get,
    path = "/api/leaves/{id}",
    params(("id" = u64, Path, description = "Leave ID")),
    responses(
        (status = 200, description = "Leave found", body = Leave),
        (status = 404, description = "Leave not found"),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn get_leave(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leave = fetch_leave(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Leave not found"))?;

    Ok(HttpResponse::Ok().json(leave))
}

/// Partial update. When only one end of the range is supplied, the stored
/// row provides the other side for the ordering check.
#[utoipa::path(
    put,
    path = "/api/leaves/{id}",
    params(("id" = u64, Path, description = "Leave ID")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Updated leave", body = Leave),
        (status = 404, description = "Leave not found"),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn update_leave(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateLeave>,
) -> Result<HttpResponse, ApiError> {
    let leave_id = path.into_inner();
    let payload = payload.into_inner();

    let existing = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave not found"))?;

    if let Some(reason) = &payload.reason {
        let mut v = Validator::new();
        v.require("reason", reason);
        v.max_len("reason", reason, 1000);
        v.finish()?;
    }

    let status = payload.status.as_deref().map(parse_status).transpose()?;

    let start = payload.start_date.unwrap_or(existing.start_date);
    let end = payload.end_date.unwrap_or(existing.end_date);
    check_date_range(start, end)?;

    let mut update = UpdateBuilder::new("leaves");
    update
        .set_opt("start_date", payload.start_date)
        .set_opt("end_date", payload.end_date)
        .set_opt("reason", payload.reason.map(|r| r.trim().to_string()))
        .set_opt("status", status.map(|s| s.to_string()));

    if update.is_empty() {
        return Ok(HttpResponse::Ok().json(existing));
    }

    execute_update(pool.get_ref(), update.build("id", leave_id)).await?;

    let updated = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave not found"))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete leave
#[utoipa::path(
    delete,
    path = "/api/leaves/{id}",
    params(("id" = u64, Path, description = "Leave ID")),
    responses(
        (status = 200, description = "Leave deleted successfully"),
        (status = 404, description = "Leave not found"),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn delete_leave(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query("DELETE FROM leaves WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Leave not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Leave deleted successfully" })))
}

async fn leaves_for_user(
    pool: &MySqlPool,
    user_id: u64,
    status: Option<LeaveStatus>,
) -> Result<Vec<Leave>, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_as::<_, Leave>(
                "SELECT * FROM leaves WHERE requested_by = ? AND status = ? ORDER BY id DESC",
            )
            .bind(user_id)
            .bind(status.to_string())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Leave>(
                "SELECT * FROM leaves WHERE requested_by = ? ORDER BY id DESC",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await
        }
    }
}

/// All leaves requested by a user
#[utoipa::path(
    get,
    path = "/api/leaves/user/{id}",
    params(("id" = u64, Path, description = "Requesting user ID")),
    responses(
        (status = 200, description = "That user's leave requests", body = [Leave]),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn find_by_user(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leaves = leaves_for_user(pool.get_ref(), path.into_inner(), None).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

/// A user's pending leaves
#[utoipa::path(
    get,
    path = "/api/leaves/user/{id}/pending",
    params(("id" = u64, Path, description = "Requesting user ID")),
    responses((status = 200, body = [Leave])),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn find_pending_by_user(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leaves =
        leaves_for_user(pool.get_ref(), path.into_inner(), Some(LeaveStatus::Pending)).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

/// A user's approved leaves
#[utoipa::path(
    get,
    path = "/api/leaves/user/{id}/approved",
    params(("id" = u64, Path, description = "Requesting user ID")),
    responses((status = 200, body = [Leave])),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn find_approved_by_user(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leaves =
        leaves_for_user(pool.get_ref(), path.into_inner(), Some(LeaveStatus::Approved)).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

/// A user's rejected leaves
#[utoipa::path(
    get,
    path = "/api/leaves/user/{id}/rejected",
    params(("id" = u64, Path, description = "Requesting user ID")),
    responses((status = 200, body = [Leave])),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn find_rejected_by_user(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leaves =
        leaves_for_user(pool.get_ref(), path.into_inner(), Some(LeaveStatus::Rejected)).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = check_date_range(date("2026-01-03"), date("2026-01-01")).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("end_date"));
    }

    #[test]
    fn single_day_leave_is_allowed() {
        assert!(check_date_range(date("2026-01-01"), date("2026-01-01")).is_ok());
        assert!(check_date_range(date("2026-01-01"), date("2026-01-03")).is_ok());
    }

    #[test]
    fn status_membership() {
        assert_eq!(parse_status("Pending").unwrap(), LeaveStatus::Pending);
        assert_eq!(parse_status("Approved").unwrap(), LeaveStatus::Approved);
        assert_eq!(parse_status("Rejected").unwrap(), LeaveStatus::Rejected);
        assert!(parse_status("pending").is_err());
        assert!(parse_status("Cancelled").is_err());
    }
}
