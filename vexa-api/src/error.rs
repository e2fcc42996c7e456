/// Error handling for the API server
///
/// All handlers return `ApiResult<T>`; an `ApiError` renders as
/// `{ "message": ... }` (plus `details` for validation failures) with the
/// matching status code.
///
/// Datastore failures are converted at the handler boundary with
/// [`DatastoreContext::during`], which names the action in the message:
///
/// ```
/// use vexa_api::error::{ApiResult, DatastoreContext};
///
/// async fn count(pool: &sqlx::PgPool) -> ApiResult<i64> {
///     sqlx::query_scalar("SELECT COUNT(*) FROM projects")
///         .fetch_one(pool)
///         .await
///         .during("counting projects")
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use vexa_shared::auth::authorization::AuthzError;
use vexa_shared::auth::middleware::AuthError;
use vexa_shared::invites::InviteError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Datastore failure (500); the message names the failed action
    Datastore(String),

    /// Internal server error (500); details are logged, not returned
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Datastore(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Datastore(msg) => write!(f, "Datastore error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, details) = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => (msg, None),
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::Datastore(msg) => {
                tracing::error!("{}", msg);
                (msg, None)
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
        };

        (status, Json(ErrorResponse { message, details })).into_response()
    }
}

/// Attaches the failed action to datastore errors
pub trait DatastoreContext<T> {
    /// Maps a `sqlx::Error` to an [`ApiError`] whose message reads
    /// `Error <action>: <cause>`
    fn during(self, action: &str) -> ApiResult<T>;
}

impl<T> DatastoreContext<T> for Result<T, sqlx::Error> {
    fn during(self, action: &str) -> ApiResult<T> {
        self.map_err(|err| datastore_error(action, err))
    }
}

/// Postgres SQLSTATE codes treated as client errors
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
const CHECK_VIOLATION: &str = "23514";

fn datastore_error(action: &str, err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::RowNotFound => ApiError::NotFound(format!("Error {action}: record not found")),
        sqlx::Error::Database(db_err) => {
            let message = format!("Error {action}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => ApiError::Conflict(message),
                Some(FOREIGN_KEY_VIOLATION | NOT_NULL_VIOLATION | CHECK_VIOLATION) => {
                    ApiError::BadRequest(message)
                }
                _ => ApiError::Datastore(message),
            }
        }
        other => ApiError::Datastore(format!("Error {action}: {other}")),
    }
}

/// Convert sqlx errors without a named action
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        datastore_error("accessing the database", err)
    }
}

/// Convert validator errors to a 422 with per-field details
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

/// Convert authentication errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.message().to_string())
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            AuthzError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AuthzError::NotMember(_) | AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden(err.to_string())
            }
            AuthzError::DatabaseError(err) => datastore_error("checking permissions", err),
        }
    }
}

/// Convert invitation errors to API errors
impl From<InviteError> for ApiError {
    fn from(err: InviteError) -> Self {
        match err {
            InviteError::NotFound | InviteError::InvalidCode => {
                ApiError::BadRequest("Invalid Link - Link Expired!".to_string())
            }
            InviteError::Backend(_) | InviteError::Serialization(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "body".to_string(),
                    message: err.body_text(),
                }])
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
