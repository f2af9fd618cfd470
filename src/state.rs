//! Shared handler state: the services plus the configuration they were built
//! from.

use crate::{
    config::AppConfig,
    services::{
        asset_link_service::AssetLinker, asset_service::AssetService,
        catalog_service::CatalogService, review_service::ReviewService,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub reviews: ReviewService,
    pub assets: AssetService,
    pub linker: AssetLinker,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire every service onto one pool.
    pub fn new(db: Arc<SqlitePool>, config: AppConfig) -> Self {
        let catalog = CatalogService::new(db.clone(), &config.categories);
        let reviews = ReviewService::new(db.clone(), catalog.clone());
        let assets = AssetService::new(
            db,
            config.chunk_size,
            config.asset_bucket.clone(),
            config.store_retries,
        );
        let linker = AssetLinker::new(catalog.clone(), assets.clone());

        Self {
            catalog,
            reviews,
            assets,
            linker,
            config: Arc::new(config),
        }
    }
}
