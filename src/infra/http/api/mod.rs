pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

use self::error::ApiError;

/// Admin JSON API. `max_body_bytes` caps every request body, uploads
/// included.
pub fn build_api_router(state: ApiState, max_body_bytes: usize) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/{slug}",
            get(handlers::get_post)
                .put(handlers::upsert_post)
                .delete(handlers::delete_post),
        )
        .route("/posts-full", get(handlers::posts_full))
        .route("/upload-image", post(handlers::upload_image))
        .route("/images", get(handlers::list_images))
        .fallback(api_not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::api_auth,
        ))
        .layer(axum_middleware::from_fn(middleware::cors))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}
