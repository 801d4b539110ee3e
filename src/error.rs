use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::error;

/// Field-level validation messages, keyed by input field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "The given data was invalid.")]
    Validation(FieldErrors),

    #[display(fmt = "Internal Server Error")]
    Database(sqlx::Error),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    /// Single-field validation failure.
    pub fn field(field: &str, msg: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![msg.to_string()]);
        ApiError::Validation(errors)
    }

    /// Maps a MySQL duplicate-key violation (SQLSTATE 23000) onto a
    /// field-level 422; anything else stays a server error. Covers the race
    /// between the uniqueness probe and the insert.
    pub fn on_unique(e: sqlx::Error, field: &str, msg: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return ApiError::field(field, msg);
            }
        }
        ApiError::Database(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Database(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Unauthorized(msg) => {
                HttpResponse::Unauthorized().json(json!({ "error": msg }))
            }
            ApiError::Forbidden(msg) => HttpResponse::Forbidden().json(json!({ "error": msg })),
            ApiError::NotFound(msg) => HttpResponse::NotFound().json(json!({ "message": msg })),
            ApiError::Validation(errors) => HttpResponse::UnprocessableEntity().json(json!({
                "message": "The given data was invalid.",
                "errors": errors,
            })),
            ApiError::Database(e) => {
                error!(error = %e, "Database error");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Internal Server Error"
                }))
            }
        }
    }
}

/// Accumulates field errors across checks so a response reports them all at
/// once instead of failing on the first.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, msg: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(msg.to_string());
    }

    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, &format!("The {field} field is required."));
        }
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                &format!("The {field} may not be greater than {max} characters."),
            );
        }
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.add(field, &format!("The {field} must be at least {min} characters."));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        let ok = value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
        if !ok {
            self.add(field, &format!("The {field} must be a valid email address."));
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_collects_all_failures() {
        let mut v = Validator::new();
        v.require("name", "");
        v.require("phone", "  ");
        v.email("email", "not-an-email");
        let err = v.finish().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors["name"][0].contains("required"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn validator_passes_clean_input() {
        let mut v = Validator::new();
        v.require("name", "Faizan");
        v.email("email", "faizan@example.com");
        v.max_len("code", "1122", 50);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn email_rules_reject_edge_cases() {
        for bad in ["plain", "@nolocal.com", "user@nodot", "user@.start"] {
            let mut v = Validator::new();
            v.email("email", bad);
            assert!(v.finish().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::field("code", "dup").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
