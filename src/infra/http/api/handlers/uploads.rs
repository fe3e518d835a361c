//! Image upload handlers

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use medee_api_types::{ImageEntry, ImagesResponse, UploadResponse};

use crate::application::assets::AssetUpload;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

const UPLOAD_FIELDS: [&str; 2] = ["image", "file"];

pub async fn upload_image(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        if !field
            .name()
            .is_some_and(|name| UPLOAD_FIELDS.contains(&name))
        {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(err.body_text()))?;

        upload = Some(AssetUpload {
            filename,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("No image file provided"))?;
    let stored = state.assets.upload_image(upload).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            key: stored.key,
            path: stored.path,
            url: stored.url,
        }),
    ))
}

pub async fn list_images(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let images = state
        .assets
        .list_images()
        .await?
        .into_iter()
        .map(|image| ImageEntry {
            key: image.key,
            url: image.url,
            uploaded: image.uploaded,
            size: image.size,
        })
        .collect();

    Ok(Json(ImagesResponse { images }))
}
