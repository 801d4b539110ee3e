use crate::{
    auth::auth::AuthUser,
    error::{ApiError, Validator},
    model::customer_measurement::CustomerMeasurement,
    utils::db_utils::{UpdateBuilder, execute_update},
    utils::pagination::{PageLinks, PageMeta, PageQuery, paginate},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateCustomerMeasurement {
    #[schema(example = "Faizan")]
    pub name: String,
    #[schema(example = "1122")]
    pub code: String,
    #[schema(example = "03123456789")]
    pub phone: String,
    #[schema(example = "123 Main Street")]
    pub address: Option<String>,
    #[schema(example = "42")]
    pub kameezlength: Option<String>,
    #[schema(example = "24")]
    pub teera: Option<String>,
    #[schema(example = "19")]
    pub baazo: Option<String>,
    #[schema(example = "21")]
    pub chest: Option<String>,
    #[schema(example = "15")]
    pub neck: Option<String>,
    #[schema(example = "23")]
    pub daman: Option<String>,
    #[schema(example = "gol")]
    pub kera: Option<String>,
    #[schema(example = "42")]
    pub shalwar: Option<String>,
    #[schema(example = "12")]
    pub pancha: Option<String>,
    #[schema(example = "2")]
    pub pocket: Option<String>,
    #[schema(example = "Stitching")]
    pub note: Option<String>,
}

/// Paginated measurement listing in the Laravel envelope shape.
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct MeasurementPage {
    pub data: Vec<CustomerMeasurement>,
    pub links: PageLinks,
    pub meta: PageMeta,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCustomerMeasurement {
    pub name: Option<String>,
    pub code: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub kameezlength: Option<String>,
    pub teera: Option<String>,
    pub baazo: Option<String>,
    pub chest: Option<String>,
    pub neck: Option<String>,
    pub daman: Option<String>,
    pub kera: Option<String>,
    pub shalwar: Option<String>,
    pub pancha: Option<String>,
    pub pocket: Option<String>,
    pub note: Option<String>,
}

/// (column, max length) for the free-form garment fields.
const GARMENT_FIELDS: &[(&str, usize)] = &[
    ("kameezlength", 10),
    ("teera", 10),
    ("baazo", 10),
    ("chest", 10),
    ("neck", 10),
    ("daman", 10),
    ("kera", 20),
    ("shalwar", 10),
    ("pancha", 10),
    ("pocket", 10),
];

fn check_garment_fields(v: &mut Validator, fields: &[(&str, &Option<String>)]) {
    for (name, value) in fields {
        let Some(value) = value else { continue };
        if let Some((_, max)) = GARMENT_FIELDS.iter().find(|(n, _)| n == name) {
            v.max_len(name, value, *max);
        }
    }
}

async fn fetch_live(pool: &MySqlPool, id: u64) -> Result<Option<CustomerMeasurement>, sqlx::Error> {
    sqlx::query_as::<_, CustomerMeasurement>(
        "SELECT * FROM customer_measurements WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

async fn fetch_any(pool: &MySqlPool, id: u64) -> Result<Option<CustomerMeasurement>, sqlx::Error> {
    sqlx::query_as::<_, CustomerMeasurement>("SELECT * FROM customer_measurements WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Duplicate codes are only a collision among live rows; trashed rows keep
/// theirs so a restore cannot conflict with itself.
async fn code_taken(
    pool: &MySqlPool,
    code: &str,
    exclude_id: Option<u64>,
) -> Result<bool, sqlx::Error> {
    match exclude_id {
        Some(id) => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM customer_measurements \
                 WHERE code = ? AND deleted_at IS NULL AND id != ? LIMIT 1)",
            )
            .bind(code)
            .bind(id)
            .fetch_one(pool)
            .await
        }
        None => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM customer_measurements \
                 WHERE code = ? AND deleted_at IS NULL LIMIT 1)",
            )
            .bind(code)
            .fetch_one(pool)
            .await
        }
    }
}

/// List customer measurements
#[utoipa::path(
    get,
    path = "/api/customer-measurements",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated list, newest first", body = MeasurementPage),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn list_measurements(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, per_page, offset) = query.resolve();

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE deleted_at IS NULL");
    let mut bindings: Vec<String> = Vec::new();

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        where_sql.push_str(" AND (name LIKE ? OR code LIKE ? OR phone LIKE ?)");
        let like = format!("%{search}%");
        bindings.push(like.clone());
        bindings.push(like.clone());
        bindings.push(like);
    }

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM customer_measurements{where_sql}");
    debug!(sql = %count_sql, "Counting customer measurements");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_q = count_q.bind(b);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM customer_measurements{where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );

    let mut data_q = sqlx::query_as::<_, CustomerMeasurement>(&data_sql);
    for b in &bindings {
        data_q = data_q.bind(b);
    }
    let rows = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    let (links, meta) = paginate(req.path(), page, per_page, total, rows.len());
    Ok(HttpResponse::Ok().json(MeasurementPage {
        data: rows,
        links,
        meta,
    }))
}

/// Create customer measurement
#[utoipa::path(
    post,
    path = "/api/customer-measurements",
    request_body = CreateCustomerMeasurement,
    responses(
        (status = 201, description = "Customer measurement created successfully", body = CustomerMeasurement),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn create_measurement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCustomerMeasurement>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.require("name", &payload.name);
    v.max_len("name", &payload.name, 255);
    v.require("code", &payload.code);
    v.max_len("code", &payload.code, 50);
    v.require("phone", &payload.phone);
    v.max_len("phone", &payload.phone, 20);
    if let Some(address) = &payload.address {
        v.max_len("address", address, 500);
    }
    if let Some(note) = &payload.note {
        v.max_len("note", note, 1000);
    }
    check_garment_fields(
        &mut v,
        &[
            ("kameezlength", &payload.kameezlength),
            ("teera", &payload.teera),
            ("baazo", &payload.baazo),
            ("chest", &payload.chest),
            ("neck", &payload.neck),
            ("daman", &payload.daman),
            ("kera", &payload.kera),
            ("shalwar", &payload.shalwar),
            ("pancha", &payload.pancha),
            ("pocket", &payload.pocket),
        ],
    );
    v.finish()?;

    if code_taken(pool.get_ref(), &payload.code, None).await? {
        return Err(ApiError::field("code", "This customer code already exists."));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO customer_measurements
            (name, code, phone, address, kameezlength, teera, baazo, chest, neck,
             daman, kera, shalwar, pancha, pocket, note, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.code)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.kameezlength)
    .bind(&payload.teera)
    .bind(&payload.baazo)
    .bind(&payload.chest)
    .bind(&payload.neck)
    .bind(&payload.daman)
    .bind(&payload.kera)
    .bind(&payload.shalwar)
    .bind(&payload.pancha)
    .bind(&payload.pocket)
    .bind(&payload.note)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    let created = fetch_any(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Customer measurement not found"))?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Customer measurement created successfully",
        "data": created,
    })))
}

/// Get customer measurement by ID
#[utoipa::path(
    get,
    path = "/api/customer-measurements/{id}",
    params(("id" = u64, Path, description = "Customer measurement ID")),
    responses(
        (status = 200, description = "Customer measurement found", body = CustomerMeasurement),
        (status = 404, description = "Customer measurement not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn get_measurement(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let row = fetch_live(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Customer measurement not found"))?;

    Ok(HttpResponse::Ok().json(json!({ "data": row })))
}

/// Partial update; stamps the updater
#[utoipa::path(
    put,
    path = "/api/customer-measurements/{id}",
    params(("id" = u64, Path, description = "Customer measurement ID")),
    request_body = UpdateCustomerMeasurement,
    responses(
        (status = 200, description = "Customer measurement updated successfully", body = CustomerMeasurement),
        (status = 404, description = "Customer measurement not found"),
        (status = 422, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn update_measurement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateCustomerMeasurement>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let existing = fetch_live(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer measurement not found"))?;

    let mut v = Validator::new();
    if let Some(name) = &payload.name {
        v.require("name", name);
        v.max_len("name", name, 255);
    }
    if let Some(code) = &payload.code {
        v.require("code", code);
        v.max_len("code", code, 50);
    }
    if let Some(phone) = &payload.phone {
        v.require("phone", phone);
        v.max_len("phone", phone, 20);
    }
    if let Some(address) = &payload.address {
        v.max_len("address", address, 500);
    }
    if let Some(note) = &payload.note {
        v.max_len("note", note, 1000);
    }
    check_garment_fields(
        &mut v,
        &[
            ("kameezlength", &payload.kameezlength),
            ("teera", &payload.teera),
            ("baazo", &payload.baazo),
            ("chest", &payload.chest),
            ("neck", &payload.neck),
            ("daman", &payload.daman),
            ("kera", &payload.kera),
            ("shalwar", &payload.shalwar),
            ("pancha", &payload.pancha),
            ("pocket", &payload.pocket),
        ],
    );
    v.finish()?;

    if let Some(code) = &payload.code {
        if code_taken(pool.get_ref(), code, Some(id)).await? {
            return Err(ApiError::field("code", "This customer code already exists."));
        }
    }

    let mut update = UpdateBuilder::new("customer_measurements");
    update
        .set_opt("name", payload.name.map(|n| n.trim().to_string()))
        .set_opt("code", payload.code)
        .set_opt("phone", payload.phone)
        .set_opt("address", payload.address)
        .set_opt("kameezlength", payload.kameezlength)
        .set_opt("teera", payload.teera)
        .set_opt("baazo", payload.baazo)
        .set_opt("chest", payload.chest)
        .set_opt("neck", payload.neck)
        .set_opt("daman", payload.daman)
        .set_opt("kera", payload.kera)
        .set_opt("shalwar", payload.shalwar)
        .set_opt("pancha", payload.pancha)
        .set_opt("pocket", payload.pocket)
        .set_opt("note", payload.note);

    if update.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({
            "message": "Customer measurement updated successfully",
            "data": existing,
        })));
    }

    update.set("updated_by", auth.user_id);
    execute_update(pool.get_ref(), update.build("id", id)).await?;

    let updated = fetch_live(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer measurement not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Customer measurement updated successfully",
        "data": updated,
    })))
}

/// Soft delete
#[utoipa::path(
    delete,
    path = "/api/customer-measurements/{id}",
    params(("id" = u64, Path, description = "Customer measurement ID")),
    responses(
        (status = 200, description = "Customer measurement deleted successfully"),
        (status = 404, description = "Customer measurement not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn delete_measurement(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query(
        "UPDATE customer_measurements SET deleted_at = NOW() WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(path.into_inner())
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Customer measurement not found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Customer measurement deleted successfully"
    })))
}

/// List soft-deleted customer measurements
#[utoipa::path(
    get,
    path = "/api/customer-measurements/trashed",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated trashed rows, most recently deleted first", body = MeasurementPage),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn trashed_measurements(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, per_page, offset) = query.resolve();

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM customer_measurements WHERE deleted_at IS NOT NULL",
    )
    .fetch_one(pool.get_ref())
    .await?;

    let rows = sqlx::query_as::<_, CustomerMeasurement>(
        "SELECT * FROM customer_measurements WHERE deleted_at IS NOT NULL \
         ORDER BY deleted_at DESC LIMIT ? OFFSET ?",
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await?;

    let (links, meta) = paginate(req.path(), page, per_page, total, rows.len());
    Ok(HttpResponse::Ok().json(MeasurementPage {
        data: rows,
        links,
        meta,
    }))
}

/// Restore a soft-deleted customer measurement
#[utoipa::path(
    post,
    path = "/api/customer-measurements/{id}/restore",
    params(("id" = u64, Path, description = "Customer measurement ID")),
    responses(
        (status = 200, description = "Customer measurement restored successfully", body = CustomerMeasurement),
        (status = 404, description = "Customer measurement not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn restore_measurement(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let result = sqlx::query(
        "UPDATE customer_measurements SET deleted_at = NULL WHERE id = ? AND deleted_at IS NOT NULL",
    )
    .bind(id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Customer measurement not found"));
    }

    let restored = fetch_live(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer measurement not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Customer measurement restored successfully",
        "data": restored,
    })))
}

/// Permanently delete an already-trashed customer measurement
#[utoipa::path(
    delete,
    path = "/api/customer-measurements/{id}/force-delete",
    params(("id" = u64, Path, description = "Customer measurement ID")),
    responses(
        (status = 200, description = "Customer measurement permanently deleted"),
        (status = 404, description = "Customer measurement not found"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden - Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Measurements"
)]
pub async fn force_delete_measurement(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query(
        "DELETE FROM customer_measurements WHERE id = ? AND deleted_at IS NOT NULL",
    )
    .bind(path.into_inner())
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Customer measurement not found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Customer measurement permanently deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garment_fields_respect_per_field_limits() {
        let long = "x".repeat(11);
        let mut v = Validator::new();
        check_garment_fields(
            &mut v,
            &[("kameezlength", &Some(long.clone())), ("kera", &Some(long.clone()))],
        );
        let ApiError::Validation(errors) = v.finish().unwrap_err() else {
            panic!("expected validation error");
        };
        // 11 chars overflows kameezlength's 10 but not kera's 20
        assert!(errors.contains_key("kameezlength"));
        assert!(!errors.contains_key("kera"));
    }

    #[test]
    fn every_garment_column_has_a_limit() {
        assert_eq!(GARMENT_FIELDS.len(), 10);
        assert_eq!(
            GARMENT_FIELDS.iter().find(|(n, _)| *n == "kera").unwrap().1,
            20
        );
    }
}
