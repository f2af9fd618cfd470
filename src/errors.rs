use crate::services::{
    asset_link_service::LinkError, asset_service::AssetError, catalog_service::CatalogError,
};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Message returned for store failures; the detail only goes to the log.
const STORE_FAILURE: &str = "Internal server error";

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    /// Log a store failure and hide its detail from the client.
    fn store_failure(err: &dyn std::error::Error) -> Self {
        error!(error = %err, "store failure");
        Self::internal(STORE_FAILURE)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.message }));
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "unexpected failure");
        AppError::internal(STORE_FAILURE)
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownCollection(_) | CatalogError::ItemNotFound { .. } => {
                AppError::not_found(err.to_string())
            }
            CatalogError::DuplicateReview
            | CatalogError::InvalidRating(_)
            | CatalogError::Validation(_) => AppError::bad_request(err.to_string()),
            CatalogError::NoSellerAvailable => AppError::internal(err.to_string()),
            CatalogError::Sqlx(ref e) => AppError::store_failure(e),
        }
    }
}

impl From<AssetError> for AppError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::NotFound(_) => AppError::not_found(err.to_string()),
            AssetError::CorruptAsset { .. } => {
                error!(error = %err, "corrupt asset");
                AppError::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
            AssetError::Upload(ref e) => {
                AppError::new(upload_status(e), format!("upload failed: {}", e))
            }
            AssetError::Sqlx(ref e) => AppError::store_failure(e),
        }
    }
}

/// A read error from a multipart field keeps the status of the multipart
/// error it wraps (413 for an over-limit body); anything else is a 400.
fn upload_status(err: &std::io::Error) -> StatusCode {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .map(MultipartError::status)
        .unwrap_or(StatusCode::BAD_REQUEST)
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Catalog(e) => e.into(),
            LinkError::Asset(e) => e.into(),
            LinkError::NoAsset(_) => AppError::not_found(err.to_string()),
            LinkError::AlreadyLinked(_) => AppError::new(StatusCode::CONFLICT, err.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}
