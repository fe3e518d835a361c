use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use medee_api_types::ErrorResponse;

use crate::application::assets::AssetError;
use crate::application::content::ContentError;
use crate::application::error::ErrorReport;
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::http::api";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Admin API failure rendered as `{"error": message}`. The attached report
/// carries the server-side detail for the logging middleware.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            report: ErrorReport::from_message(SOURCE, status, message.clone()),
            message,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn misconfigured() -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self {
            status,
            message: "Service misconfigured".to_string(),
            report: ErrorReport::from_message(SOURCE, status, "admin.token_secret is not set"),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(error: &dyn std::error::Error) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self {
            status,
            message: INTERNAL_MESSAGE.to_string(),
            report: ErrorReport::from_error(SOURCE, status, error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            err if err.is_not_found() => Self::not_found("Post not found"),
            ContentError::Domain(DomainError::Validation { message }) => Self::bad_request(message),
            other => Self::internal(&other),
        }
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Validation(message) => Self::bad_request(message),
            other => Self::internal(&other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorResponse::new(self.message))).into_response();
        self.report.attach(&mut response);
        response
    }
}
