use std::collections::BTreeMap;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::{debug, error};
use validator::ValidationErrors;

pub type AppResult<T> = Result<T, AppError>;

/// Field name -> messages, rendered under `errors` for 422 responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("The given data was invalid")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Single-field validation failure.
    pub fn field(field: &str, msg: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![msg.into()]);
        Self::Validation(errors)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("The {} field is invalid ({})", field, e.code),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        AppError::Validation(fields)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(e) if is_duplicate_key(e) => StatusCode::CONFLICT,
            AppError::Database(e) if is_missing_reference(e) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(fields) => json!({
                "message": self.to_string(),
                "errors": fields,
            }),
            AppError::Database(sqlx::Error::RowNotFound) => json!({
                "message": "Record not found"
            }),
            AppError::Database(e) if is_duplicate_key(e) => json!({
                "message": "Record already exists"
            }),
            AppError::Database(e) if is_missing_reference(e) => json!({
                "message": "A referenced record does not exist"
            }),
            AppError::Database(e) => {
                error!(target: "database", error = %e, "Database error occurred");
                json!({ "message": "Something went wrong, Contact with system admin" })
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                json!({ "message": "Something went wrong, Contact with system admin" })
            }
            other => json!({ "message": other.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}

/// Unique key violations only. MySQL also files foreign key and NOT NULL
/// failures under SQLSTATE 23000, so the error number decides.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

fn is_missing_reference(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation())
}

/// Field named by a serde message such as "missing field `year`".
fn named_field(message: &str) -> Option<&str> {
    ["missing field `", "unknown field `", "duplicate field `"]
        .iter()
        .find_map(|marker| {
            let start = message.find(marker)? + marker.len();
            let len = message[start..].find('`')?;
            Some(&message[start..start + len])
        })
}

fn undecodable(fallback_field: &str, message: String) -> AppError {
    let field = named_field(&message).unwrap_or(fallback_field).to_string();
    let mut errors = FieldErrors::new();
    errors.insert(field, vec![message]);
    AppError::Validation(errors)
}

/// `JsonConfig` error handler: bodies that do not decode are validation
/// failures, anything else about the payload is a plain 400.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        JsonPayloadError::Deserialize(e) => undecodable("body", e.to_string()),
        JsonPayloadError::ContentType => AppError::bad_request("Request body must be JSON"),
        other => AppError::bad_request(other.to_string()),
    }
    .into()
}

pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        QueryPayloadError::Deserialize(e) => undecodable("query", e.to_string()),
        other => AppError::bad_request(other.to_string()),
    }
    .into()
}

pub fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "Unparseable path parameter");
    AppError::bad_request("Invalid path parameter").into()
}
