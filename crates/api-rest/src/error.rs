use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use ybocs_core::YbocsError;

/// Unified API error type for all route handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    ResetRequired(String),
    Internal(String),
}

/// JSON body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ResetRequired(msg) => (StatusCode::PRECONDITION_REQUIRED, msg),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<YbocsError> for ApiError {
    fn from(e: YbocsError) -> Self {
        let msg = e.to_string();
        match e {
            YbocsError::InvalidCredentials | YbocsError::NotAuthenticated => {
                ApiError::Unauthorized(msg)
            }
            YbocsError::Forbidden(_) => ApiError::Forbidden(msg),
            YbocsError::PasswordResetRequired => ApiError::ResetRequired(msg),
            YbocsError::DuplicateLogin(_) => ApiError::Conflict(msg),
            YbocsError::UnknownAccount(_) => ApiError::NotFound(msg),
            YbocsError::InvalidInput(_)
            | YbocsError::PasswordMismatch
            | YbocsError::EmptyPassword
            | YbocsError::InvalidSymptomKey { .. }
            | YbocsError::Validation(_) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ybocs_core::TextError> for ApiError {
    fn from(e: ybocs_core::TextError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: YbocsError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status(YbocsError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(YbocsError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status(YbocsError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status(YbocsError::PasswordResetRequired),
            StatusCode::PRECONDITION_REQUIRED
        );
        assert_eq!(status(YbocsError::DuplicateLogin("a".into())), StatusCode::CONFLICT);
        assert_eq!(status(YbocsError::PasswordMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(YbocsError::FileWrite(std::io::Error::other("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
