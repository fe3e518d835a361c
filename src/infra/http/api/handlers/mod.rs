//! Admin API handlers organized by resource.

mod posts;
mod uploads;

pub use posts::*;
pub use uploads::*;

use axum::Json;
use axum::extract::rejection::JsonRejection;

use super::error::ApiError;

/// Unwrap a JSON body, reporting malformed input as a 400 in the API's own
/// error shape.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
