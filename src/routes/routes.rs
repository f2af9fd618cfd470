//! Defines routes for the catalog and image asset API.
//!
//! ## Structure
//! - **Catalog endpoints** (one set serves every configured collection)
//!   - `GET    /api/catalog/{category}`: filtered, sorted, paged listing
//!   - `POST   /api/catalog/{category}`: create item
//!   - `GET    /api/catalog/{category}/categories`: distinct category labels
//!   - `POST   /api/catalog/{category}/seed`: replace the collection
//!   - `GET    /api/catalog/{category}/{id}`: item detail
//!   - `PUT    /api/catalog/{category}/{id}`: update item, optionally link an image
//!   - `DELETE /api/catalog/{category}/{id}`: delete item and its image
//!   - `POST   /api/catalog/{category}/{id}/reviews`: add review
//!   - `POST   /api/sellers`: register a seller profile
//!
//! - **Asset endpoints**
//!   - `POST   /api/uploads`: multipart image upload
//!   - `GET    /api/assets/show/{productId}`: stream a product's image
//!   - `PUT    /api/assets/update/{productId}`: replace a product's image
//!   - `DELETE /api/assets/delete/{productId}`: remove a product's image
//!   - `POST   /api/assets/sweep`: reclaim orphaned uploads

use crate::{
    handlers::{
        asset_handlers::{delete_image, show_image, sweep_assets, update_image, upload_image},
        catalog_handlers::{
            add_review, create_item, delete_item, get_item, list_categories, list_items,
            register_seller, seed_items, update_item,
        },
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build the full application router with its state and layers applied.
///
/// Request bodies are capped at the configured upload size; every request is
/// traced.
pub fn routes(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // catalog
        .route("/api/sellers", post(register_seller))
        .route("/api/catalog/{category}", get(list_items).post(create_item))
        .route("/api/catalog/{category}/categories", get(list_categories))
        .route("/api/catalog/{category}/seed", post(seed_items))
        .route(
            "/api/catalog/{category}/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/api/catalog/{category}/{id}/reviews", post(add_review))
        // assets
        .route("/api/uploads", post(upload_image))
        .route("/api/assets/show/{product_id}", get(show_image))
        .route("/api/assets/update/{product_id}", put(update_image))
        .route("/api/assets/delete/{product_id}", delete(delete_image))
        .route("/api/assets/sweep", post(sweep_assets))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
