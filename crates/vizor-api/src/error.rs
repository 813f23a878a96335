//! API error type and its JSON rendering.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors returned by handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// A required provider or backend is not configured.
    ServiceUnavailable(String),
    /// An upstream provider call failed.
    Upstream { error: String, message: String },
    Internal(String),
}

impl From<vizor_core::Error> for ApiError {
    fn from(err: vizor_core::Error) -> Self {
        use vizor_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Config(msg) => ApiError::ServiceUnavailable(msg),
            err @ (Error::Transport(_) | Error::MalformedResponse(_)) => ApiError::Upstream {
                error: "Upstream provider error".to_string(),
                message: err.to_string(),
            },
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::Upstream { error, message } => (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({ "error": error, "message": message }),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        assert!(matches!(
            ApiError::from(vizor_core::Error::NotFound("x".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(vizor_core::Error::InvalidInput("x".into())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(vizor_core::Error::Config("x".into())),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(vizor_core::Error::Transport("down".into())),
            ApiError::Upstream { .. }
        ));
        assert!(matches!(
            ApiError::from(vizor_core::Error::Storage("disk".into())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::BadRequest("b".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (
                ApiError::ServiceUnavailable("s".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Upstream {
                    error: "e".into(),
                    message: "m".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Internal("i".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
