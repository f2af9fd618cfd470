//! HTTP handlers for image uploads and product images.
//! Upload bodies are streamed into chunks and downloads are streamed back
//! chunk by chunk, so neither direction buffers a whole payload.

use crate::{
    errors::AppError,
    handlers::guards::RequestUser,
    models::asset::{AssetMetadata, AssetUpload},
    services::{asset_link_service::AssetLinker, asset_service::AssetService},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use std::io;
use tracing::{error, info};

const IMAGE_FIELD: &str = "image";
const STATUS_FIELD: &str = "status";

/// Where an uploaded image ends up.
enum UploadTarget<'a> {
    /// Stored on its own, linked later through an item update.
    Loose(&'a AssetService),
    /// Replaces the image of a product.
    Product(&'a AssetLinker, &'a str),
}

/// `POST /api/uploads`: multipart `image` (plus an optional `status` field
/// sent before it).
pub async fn upload_image(
    State(state): State<AppState>,
    _user: RequestUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let image = store_image(&mut multipart, UploadTarget::Loose(&state.assets)).await?;
    Ok(Json(json!({ "message": "Image Uploaded", "image": image })))
}

/// `GET /api/assets/show/{productId}`: stream the product's image.
pub async fn show_image(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Response, AppError> {
    let (meta, chunks) = state.linker.show(&product_id).await?;
    let asset_id = meta.id;
    let chunks = chunks.inspect_err(move |err| {
        error!(asset = %asset_id, error = %err, "asset stream aborted");
    });

    let mut response = Response::new(Body::from_stream(chunks));
    *response.status_mut() = StatusCode::OK;
    set_asset_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// `PUT /api/assets/update/{productId}`: store a new image, link it and
/// delete the previous one.
pub async fn update_image(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    user: RequestUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let target = UploadTarget::Product(&state.linker, &product_id);
    let image = store_image(&mut multipart, target).await?;
    Ok(Json(json!({ "message": "Image Updated", "image": image })))
}

/// `DELETE /api/assets/delete/{productId}`
pub async fn delete_image(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    user: RequestUser,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let image = state.linker.detach(&product_id).await?;
    Ok(Json(json!({ "message": "Image Deleted", "image": image })))
}

/// `POST /api/assets/sweep`: run the orphan sweep now.
pub async fn sweep_assets(
    State(state): State<AppState>,
    user: RequestUser,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let removed = state.assets.sweep_orphans(state.config.orphan_grace).await?;
    info!(removed, user = %user.id, "manual asset sweep");
    Ok(Json(json!({ "removed": removed })))
}

/// Walk the multipart body until the image field and stream it to `target`.
/// Fields other than `status` and `image` are skipped.
async fn store_image(
    multipart: &mut Multipart,
    target: UploadTarget<'_>,
) -> Result<AssetMetadata, AppError> {
    let mut status = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            STATUS_FIELD => status = Some(field.text().await?),
            IMAGE_FIELD => {
                let upload = AssetUpload {
                    original_name: field.file_name().unwrap_or("upload").to_string(),
                    field_name: name.clone(),
                    status: status.take(),
                    content_type: field.content_type().map(str::to_string),
                };
                let stream = field.map(|chunk| chunk.map_err(io::Error::other));

                let image = match target {
                    UploadTarget::Loose(assets) => assets.store_asset(upload, stream).await?,
                    UploadTarget::Product(linker, product_id) => {
                        linker.replace(product_id, upload, stream).await?
                    }
                };
                return Ok(image);
            }
            _ => {}
        }
    }

    Err(AppError::bad_request(format!(
        "multipart field `{}` is required",
        IMAGE_FIELD
    )))
}

fn set_asset_headers(headers: &mut HeaderMap, meta: &AssetMetadata) {
    let content_type = meta
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.length.max(0)));

    if let Some(md5) = meta.md5.as_ref() {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", md5)) {
            headers.insert(header::ETAG, value);
        }
    }

    let last_modified = meta.created_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
