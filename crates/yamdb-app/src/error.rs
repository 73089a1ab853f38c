use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};
use yamdb_types::ValidationError;

pub type ApiResult<T> = Result<T, ApiError>;

const REQUIRED_FIELD: &str = "This field is required.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Unauthenticated("Authentication credentials were not provided.".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<yamdb_dal::Error> for ApiError {
    fn from(e: yamdb_dal::Error) -> Self {
        match e {
            yamdb_dal::Error::RecordNotFound(entity) => {
                ApiError::NotFound(format!("{entity} not found."))
            }
            yamdb_dal::Error::InvalidOrderByField(field) => {
                ApiError::InvalidQuery(format!("Invalid sort field: {field}"))
            }
            yamdb_dal::Error::InvalidConfirmationCode => {
                ApiError::BadRequest("Invalid confirmation code".to_string())
            }
            yamdb_dal::Error::Validation(errors) => ApiError::Validation(errors),
            other => {
                error!("Storage error: {other}");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<yamdb_auth::Error> for ApiError {
    fn from(e: yamdb_auth::Error) -> Self {
        error!("Token error: {e}");
        ApiError::Internal(e.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Validation(report.into())
    }
}

/// Name of missing field from serde message like "missing field `score` at line 1 column 2"
fn missing_field(message: &str) -> Option<&str> {
    const PREFIX: &str = "missing field `";
    let start = message.find(PREFIX)? + PREFIX.len();
    let len = message[start..].find('`')?;
    Some(&message[start..start + len])
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        debug!("Invalid JSON payload: {message}");
        match rejection {
            JsonRejection::JsonDataError(_) => match missing_field(&message) {
                Some(field) => ApiError::Validation(ValidationError::single(field, REQUIRED_FIELD)),
                None => ApiError::BadRequest(message),
            },
            _ => ApiError::BadRequest(message),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::BadRequest(message) | ApiError::InvalidQuery(message) => {
                (status, Json(json!({ "errors": message }))).into_response()
            }
            ApiError::Unauthenticated(message) | ApiError::NotFound(message) => {
                (status, Json(json!({ "detail": message }))).into_response()
            }
            ApiError::Forbidden => (
                status,
                Json(json!({ "detail": "You do not have permission to perform this action." })),
            )
                .into_response(),
            ApiError::Internal(_) => {
                (status, Json(json!({ "detail": "Internal server error" }))).into_response()
            }
        }
    }
}
