use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    AUTHORIZATION,
};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::state::ApiState;

/// Require `Authorization: Bearer <secret>` before any handler runs.
pub async fn api_auth(State(state): State<ApiState>, request: Request<Body>, next: Next) -> Response {
    let Some(secret) = state.token_secret.as_deref().filter(|secret| !secret.is_empty()) else {
        return ApiError::misconfigured().into_response();
    };

    let authorized = extract_token(request.headers().get(AUTHORIZATION))
        .is_some_and(|token| bool::from(token.as_bytes().ct_eq(secret.as_bytes())));
    if !authorized {
        return ApiError::unauthorized().into_response();
    }

    next.run(request).await
}

/// Answer preflight requests directly and stamp CORS headers on everything
/// else.
pub async fn cors(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

fn extract_token(header: Option<&HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    raw.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_token_requires_bearer_scheme() {
        let bearer = HeaderValue::from_static("Bearer s3cret");
        let basic = HeaderValue::from_static("Basic s3cret");
        assert_eq!(extract_token(Some(&bearer)), Some("s3cret"));
        assert_eq!(extract_token(Some(&basic)), None);
        assert_eq!(extract_token(None), None);
    }
}
