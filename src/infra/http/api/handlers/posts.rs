//! Post handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use medee_api_types::{DeletedResponse, PostKeysResponse, PostsResponse};
use tracing::info;

use crate::domain::posts::{PostDraft, PostPatch};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

use super::json_body;

pub async fn list_posts(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let keys = state.content.list_posts().await?;
    Ok(Json(PostKeysResponse { keys }))
}

pub async fn create_post(
    State(state): State<ApiState>,
    payload: Result<Json<PostDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = json_body(payload)?;
    let post = state.content.create_post(draft).await?;
    info!(
        target = "medee::http::api::posts",
        slug = %post.slug,
        "post created"
    );
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.content.get_post(&slug).await?;
    Ok(Json(post))
}

pub async fn upsert_post(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    payload: Result<Json<PostPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = json_body(payload)?;
    let post = state.content.upsert_post(&slug, patch).await?;
    info!(
        target = "medee::http::api::posts",
        slug = %post.slug,
        "post saved"
    );
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete_post(&slug).await?;
    info!(
        target = "medee::http::api::posts",
        slug = %slug,
        "post deleted"
    );
    Ok(Json(DeletedResponse { deleted: slug }))
}

pub async fn posts_full(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.content.get_all_posts().await?;
    Ok(Json(PostsResponse { posts }))
}
