use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use altgate_core::error::CoreError;

/// Shown to the plugin when the key is unknown.
pub const INVALID_LICENSE: &str = "Licença inválida";
/// Shown to the plugin when the monthly quota is used up.
pub const QUOTA_EXCEEDED: &str = "Limite do plano atingido";
/// Returned by admin create when the key already exists.
pub const LICENSE_EXISTS: &str = "Licença já existe";

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    /// Business-rule rejection. The plugin expects these as HTTP 200 with
    /// `success: false`, not as transport errors.
    #[error("rejected: {0}")]
    Rejected(&'static str),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Rejected(message) => {
                return (
                    StatusCode::OK,
                    Json(json!({ "success": false, "message": message })),
                )
                    .into_response();
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.as_str())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized"),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };

        (
            status,
            Json(json!({
                "success": false,
                "message": message,
                "error": {
                    "code": code,
                    "message": message,
                    "field": null
                }
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("JSON body"))
    }

    #[tokio::test]
    async fn rejection_is_http_200_with_message() {
        let (status, body) = render(AppError::Rejected(QUOTA_EXCEEDED)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Limite do plano atingido");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let (status, body) =
            render(AppError::Internal(anyhow::anyhow!("duckdb: disk I/O error"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"]["code"], "internal_error");
    }

    #[tokio::test]
    async fn core_errors_are_client_errors() {
        let (status, body) = render(CoreError::AmbiguousImageSource.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
    }
}
