use crate::{
    error::{ApiError, Validator},
    model::task::{Task, TaskPriority, TaskStatus},
    utils::db_utils::{UpdateBuilder, execute_update},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateTask {
    #[schema(example = "Prepare quarterly report")]
    pub title: String,
    pub description: Option<String>,
    /// Low, Medium or High (defaults to Medium)
    #[schema(example = "High")]
    pub priority: Option<String>,
    /// Pending, InProgress or Completed (defaults to Pending)
    #[schema(example = "Pending")]
    pub status: Option<String>,
    /// Assignee user id; must reference an existing user
    #[schema(example = 1)]
    pub assigned_to: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<u64>,
}

fn parse_priority(value: &str) -> Result<TaskPriority, ApiError> {
    TaskPriority::from_str(value)
        .map_err(|_| ApiError::field("priority", "The selected priority is invalid."))
}

fn parse_status(value: &str) -> Result<TaskStatus, ApiError> {
    TaskStatus::from_str(value)
        .map_err(|_| ApiError::field("status", "The selected status is invalid."))
}

async fn user_exists(pool: &MySqlPool, user_id: u64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ? LIMIT 1)")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

async fn fetch_task(pool: &MySqlPool, id: u64) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "All tasks, newest first", body = [Task]),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn list_tasks(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let tasks = sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY id DESC")
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Create task
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn create_task(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTask>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.require("title", &payload.title);
    v.max_len("title", &payload.title, 255);
    v.finish()?;

    let priority = payload
        .priority
        .as_deref()
        .map(parse_priority)
        .transpose()?
        .unwrap_or(TaskPriority::Medium);
    let status = payload
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?
        .unwrap_or(TaskStatus::Pending);

    if !user_exists(pool.get_ref(), payload.assigned_to).await? {
        return Err(ApiError::field(
            "assigned_to",
            "The selected assigned to is invalid.",
        ));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO tasks (title, description, priority, status, assigned_to)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(priority.to_string())
    .bind(status.to_string())
    .bind(payload.assigned_to)
    .execute(pool.get_ref())
    .await?;

    let created = fetch_task(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(HttpResponse::Created().json(created))
}

/// Get task by ID
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = u64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = Task),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn get_task(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let task = fetch_task(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(HttpResponse::Ok().json(task))
}

/// Partial update
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = u64, Path, description = "Task ID")),
    request_body = UpdateTask,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 404, description = "Task not found"),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateTask>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path.into_inner();
    let payload = payload.into_inner();

    let existing = fetch_task(pool.get_ref(), task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    if let Some(title) = &payload.title {
        let mut v = Validator::new();
        v.require("title", title);
        v.max_len("title", title, 255);
        v.finish()?;
    }

    let priority = payload.priority.as_deref().map(parse_priority).transpose()?;
    let status = payload.status.as_deref().map(parse_status).transpose()?;

    if let Some(assigned_to) = payload.assigned_to {
        if !user_exists(pool.get_ref(), assigned_to).await? {
            return Err(ApiError::field(
                "assigned_to",
                "The selected assigned to is invalid.",
            ));
        }
    }

    let mut update = UpdateBuilder::new("tasks");
    update
        .set_opt("title", payload.title.map(|t| t.trim().to_string()))
        .set_opt("description", payload.description)
        .set_opt("priority", priority.map(|p| p.to_string()))
        .set_opt("status", status.map(|s| s.to_string()))
        .set_opt("assigned_to", payload.assigned_to);

    if update.is_empty() {
        return Ok(HttpResponse::Ok().json(existing));
    }

    execute_update(pool.get_ref(), update.build("id", task_id)).await?;

    let updated = fetch_task(pool.get_ref(), task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = u64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted successfully"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn delete_task(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_and_status_membership() {
        assert_eq!(parse_priority("Low").unwrap(), TaskPriority::Low);
        assert_eq!(parse_status("InProgress").unwrap(), TaskStatus::InProgress);
        assert!(parse_priority("Urgent").is_err());
        assert!(parse_status("Done").is_err());
    }
}
