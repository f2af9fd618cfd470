//! AssetLinker: owns the relation between catalog items and their image
//! assets. Every path that drops or replaces an item's asset reference also
//! deletes the asset it released, so uploads are not silently orphaned.

use crate::{
    db::{begin_immediate, is_unique_violation},
    models::{
        asset::{AssetMetadata, AssetUpload},
        item::{CatalogItem, ItemDraft, ItemUpdate},
    },
    services::{
        asset_service::{AssetError, AssetService, AssetStream},
        catalog_service::{CatalogError, CatalogService},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use std::io;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("product `{0}` has no image")]
    NoAsset(String),
    #[error("asset `{0}` is already linked to another product")]
    AlreadyLinked(Uuid),
}

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Clone)]
pub struct AssetLinker {
    catalog: CatalogService,
    assets: AssetService,
}

impl AssetLinker {
    pub fn new(catalog: CatalogService, assets: AssetService) -> Self {
        Self { catalog, assets }
    }

    /// Resolve product → asset metadata → chunk stream.
    pub async fn show(&self, product_id: &str) -> LinkResult<(AssetMetadata, AssetStream)> {
        let item = self.catalog.get_product(product_id).await?;
        let asset_id = item
            .asset_id
            .ok_or_else(|| LinkError::NoAsset(product_id.to_string()))?;
        Ok(self.assets.retrieve_asset(asset_id).await?)
    }

    /// Store a new upload for the product, point the product at it, then
    /// delete the asset it replaced.
    pub async fn replace<S>(
        &self,
        product_id: &str,
        upload: AssetUpload,
        stream: S,
    ) -> LinkResult<AssetMetadata>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let item = self.catalog.get_product(product_id).await?;
        let meta = self.assets.store_asset(upload, stream).await?;

        let previous = match self.swap_reference(item.id, Some(meta.id)).await {
            Ok(previous) => previous,
            Err(err) => {
                warn!(product = %item.id, asset = %meta.id, error = %err, "link failed, discarding new asset");
                self.release(meta.id).await?;
                return Err(err);
            }
        };

        if let Some(old) = previous {
            self.release(old).await?;
        }
        info!(product = %item.id, asset = %meta.id, "product image replaced");
        Ok(meta)
    }

    /// Point `item_id` at an already uploaded asset, deleting the asset it
    /// previously referenced.
    pub async fn link(&self, item_id: Uuid, asset_id: Uuid) -> LinkResult<()> {
        self.assets.get_metadata(asset_id).await?;
        let previous = self.swap_reference(item_id, Some(asset_id)).await?;
        if let Some(old) = previous.filter(|old| *old != asset_id) {
            self.release(old).await?;
        }
        info!(product = %item_id, asset = %asset_id, "asset linked");
        Ok(())
    }

    /// Delete the product's asset and clear its reference.
    pub async fn detach(&self, product_id: &str) -> LinkResult<AssetMetadata> {
        let item = self.catalog.get_product(product_id).await?;
        let asset_id = item
            .asset_id
            .ok_or_else(|| LinkError::NoAsset(product_id.to_string()))?;

        let meta = self.assets.get_metadata(asset_id).await?;
        self.swap_reference(item.id, None).await?;
        self.release(asset_id).await?;
        info!(product = %item.id, asset = %asset_id, "product image removed");
        Ok(meta)
    }

    /// Field update, plus an asset link when the update names one.
    pub async fn update_item(
        &self,
        collection: &str,
        id: &str,
        update: &ItemUpdate,
    ) -> LinkResult<CatalogItem> {
        let item = self.catalog.update_item(collection, id, update).await?;
        match update.asset_id {
            Some(asset_id) if item.asset_id != Some(asset_id) => {
                self.link(item.id, asset_id).await?;
                Ok(self.catalog.get_item(collection, id).await?)
            }
            _ => Ok(item),
        }
    }

    /// Delete an item and the asset it owned.
    pub async fn delete_item(&self, collection: &str, id: &str) -> LinkResult<CatalogItem> {
        let item = self.catalog.delete_item(collection, id).await?;
        if let Some(asset_id) = item.asset_id {
            self.release(asset_id).await?;
        }
        Ok(item)
    }

    /// Seed a collection, deleting the assets of the items it replaced.
    pub async fn seed(&self, collection: &str, drafts: &[ItemDraft]) -> LinkResult<Vec<CatalogItem>> {
        let outcome = self.catalog.seed(collection, drafts).await?;
        for asset_id in outcome.released_assets {
            self.release(asset_id).await?;
        }
        Ok(outcome.created)
    }

    /// Set the item's asset reference and return the previous one.
    async fn swap_reference(&self, item_id: Uuid, asset_id: Option<Uuid>) -> LinkResult<Option<Uuid>> {
        let mut tx = begin_immediate(&self.catalog.db)
            .await
            .map_err(CatalogError::from)?;

        let previous = sqlx::query_scalar::<_, Option<Uuid>>("SELECT asset_id FROM items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(CatalogError::from)?
            .ok_or_else(|| CatalogError::ItemNotFound {
                collection: "product".into(),
                id: item_id.to_string(),
            })?;

        let updated = sqlx::query("UPDATE items SET asset_id = ?, updated_at = ? WHERE id = ?")
            .bind(asset_id)
            .bind(Utc::now())
            .bind(item_id)
            .execute(&mut *tx)
            .await;
        match updated {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(LinkError::AlreadyLinked(asset_id.unwrap_or_default()));
            }
            Err(err) => return Err(CatalogError::from(err).into()),
        }

        tx.commit().await.map_err(CatalogError::from)?;
        Ok(previous)
    }

    /// Delete an asset that no item references any more. Already gone is fine.
    async fn release(&self, asset_id: Uuid) -> LinkResult<()> {
        match self.assets.delete_asset(asset_id).await {
            Ok(_) | Err(AssetError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
