//! src/services/catalog_service.rs
//!
//! CatalogService: one generic service for every product collection.
//! Collections share the `items` table and differ only by their key and page
//! size, both taken from configuration.

use crate::{
    config::CategoryDescriptor,
    db::begin_immediate,
    models::{
        item::{CatalogItem, ItemDraft, ItemRecord, ItemUpdate, Review},
        seller::{Seller, SellerProfile},
    },
    services::catalog_query::{ItemPage, ListParams, push_order_and_window, total_pages},
};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool, sqlite::Sqlite};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog `{0}` not found")]
    UnknownCollection(String),
    #[error("{collection} item `{id}` not found")]
    ItemNotFound { collection: String, id: String },
    #[error("You already submitted a review")]
    DuplicateReview,
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
    #[error("{0}")]
    Validation(String),
    #[error("No seller found. Register a seller first")]
    NoSellerAvailable,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

pub(crate) const ITEM_SELECT: &str = "SELECT i.id, i.collection, i.name, i.seller_id, i.category, \
     i.price, i.brand, i.count_in_stock, i.rating, i.num_reviews, i.description, i.asset_id, \
     i.created_at, i.updated_at, s.name AS seller_name, s.logo AS seller_logo, \
     s.rating AS seller_rating, s.num_reviews AS seller_num_reviews \
     FROM items i LEFT JOIN sellers s ON s.id = i.seller_id";

/// Items created by a seed, plus the assets released by the items it replaced.
#[derive(Debug)]
pub struct SeedOutcome {
    pub created: Vec<CatalogItem>,
    pub released_assets: Vec<Uuid>,
}

/// CatalogService provides the catalog operations shared by all collections:
/// - List items with filters, sort and paging
/// - Distinct category labels
/// - Item detail, create, update, delete
/// - Seller registration and bulk seeding
///
/// Review submission lives in `ReviewService`; anything touching assets goes
/// through `AssetLinker`.
#[derive(Clone)]
pub struct CatalogService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Configured collections by key.
    categories: Arc<HashMap<String, CategoryDescriptor>>,
}

impl CatalogService {
    pub fn new(db: Arc<SqlitePool>, categories: &[CategoryDescriptor]) -> Self {
        let categories = categories
            .iter()
            .map(|c| (c.key.clone(), c.clone()))
            .collect();
        Self {
            db,
            categories: Arc::new(categories),
        }
    }

    /// Resolve a configured collection.
    pub fn collection(&self, key: &str) -> CatalogResult<&CategoryDescriptor> {
        self.categories
            .get(key)
            .ok_or_else(|| CatalogError::UnknownCollection(key.to_string()))
    }

    /// One page of a collection listing plus the total page count.
    ///
    /// Out-of-range pages yield an empty item list, never an error.
    pub async fn list_items(&self, collection: &str, params: &ListParams) -> CatalogResult<ItemPage> {
        let descriptor = self.collection(collection)?;
        debug!(collection, ?params, "listing items");

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM items i");
        params.filter.push_conditions(collection, &mut count_query);
        let count: i64 = count_query.build_query_scalar().fetch_one(&*self.db).await?;

        let mut page_query = QueryBuilder::<Sqlite>::new(ITEM_SELECT);
        params.filter.push_conditions(collection, &mut page_query);
        push_order_and_window(&mut page_query, params.sort, params.page, descriptor.page_size);
        let records: Vec<ItemRecord> = page_query.build_query_as().fetch_all(&*self.db).await?;

        let items = self.attach_reviews(records, false).await?;

        Ok(ItemPage {
            items,
            page: params.page,
            pages: total_pages(count.max(0) as u64, descriptor.page_size),
        })
    }

    /// Unique category labels used within a collection.
    pub async fn distinct_categories(&self, collection: &str) -> CatalogResult<Vec<String>> {
        self.collection(collection)?;
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM items WHERE collection = ? ORDER BY category",
        )
        .bind(collection)
        .fetch_all(&*self.db)
        .await?;
        Ok(categories)
    }

    /// Item detail with the extended seller projection.
    pub async fn get_item(&self, collection: &str, id: &str) -> CatalogResult<CatalogItem> {
        self.collection(collection)?;
        let not_found = || CatalogError::ItemNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let id = Uuid::parse_str(id).map_err(|_| not_found())?;

        let record = self.fetch_record(id).await?.filter(|r| r.collection == collection);
        let record = record.ok_or_else(not_found)?;
        let mut items = self.attach_reviews(vec![record], true).await?;
        items.pop().ok_or_else(not_found)
    }

    /// Item detail regardless of collection, used by the asset endpoints.
    pub async fn get_product(&self, id: &str) -> CatalogResult<CatalogItem> {
        let not_found = || CatalogError::ItemNotFound {
            collection: "product".into(),
            id: id.to_string(),
        };
        let id = Uuid::parse_str(id).map_err(|_| not_found())?;
        let record = self.fetch_record(id).await?.ok_or_else(not_found)?;
        let mut items = self.attach_reviews(vec![record], true).await?;
        items.pop().ok_or_else(not_found)
    }

    /// Create an item owned by `seller_id`, filling gaps with sample values.
    pub async fn create_item(
        &self,
        collection: &str,
        seller_id: &str,
        draft: &ItemDraft,
    ) -> CatalogResult<CatalogItem> {
        self.collection(collection)?;
        validate_numbers(draft.price, draft.count_in_stock)?;

        let mut conn = self.db.acquire().await?;
        let id = insert_item(&mut *conn, collection, seller_id, draft, Utc::now()).await?;
        drop(conn);

        info!(collection, %id, "item created");
        self.get_item(collection, &id.to_string()).await
    }

    /// Apply a field-level update. `asset_id` is ignored here; linking goes
    /// through the asset linker.
    pub async fn update_item(
        &self,
        collection: &str,
        id: &str,
        update: &ItemUpdate,
    ) -> CatalogResult<CatalogItem> {
        let current = self.get_item(collection, id).await?;
        validate_numbers(update.price, update.count_in_stock)?;

        let name = update.name.as_ref().unwrap_or(&current.name);
        sqlx::query(
            "UPDATE items SET name = ?, name_folded = ?, category = ?, price = ?, brand = ?,
                    count_in_stock = ?, description = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(name.to_lowercase())
        .bind(update.category.as_ref().unwrap_or(&current.category))
        .bind(update.price.unwrap_or(current.price))
        .bind(update.brand.as_ref().unwrap_or(&current.brand))
        .bind(update.count_in_stock.unwrap_or(current.count_in_stock))
        .bind(update.description.as_ref().unwrap_or(&current.description))
        .bind(Utc::now())
        .bind(current.id)
        .execute(&*self.db)
        .await?;

        debug!(collection, id = %current.id, "item updated");
        self.get_item(collection, id).await
    }

    /// Remove an item and its reviews. Returns the item as it was, including
    /// its asset reference so the caller can release the asset.
    pub async fn delete_item(&self, collection: &str, id: &str) -> CatalogResult<CatalogItem> {
        let item = self.get_item(collection, id).await?;

        let result = sqlx::query("DELETE FROM items WHERE id = ? AND collection = ?")
            .bind(item.id)
            .bind(collection)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::ItemNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        info!(collection, id = %item.id, "item deleted");
        Ok(item)
    }

    /// Register a seller, replacing any profile with the same id.
    pub async fn register_seller(&self, profile: &SellerProfile) -> CatalogResult<Seller> {
        if profile.id.trim().is_empty() || profile.name.trim().is_empty() {
            return Err(CatalogError::Validation(
                "seller id and name are required".into(),
            ));
        }

        let seller = sqlx::query_as::<_, Seller>(
            r#"
            INSERT INTO sellers (id, name, logo, rating, num_reviews, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                logo = excluded.logo,
                rating = excluded.rating,
                num_reviews = excluded.num_reviews
            RETURNING id, name, logo, rating, num_reviews, created_at
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.name)
        .bind(&profile.logo)
        .bind(profile.rating)
        .bind(profile.num_reviews)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;

        Ok(seller)
    }

    /// The earliest registered seller, if any.
    pub async fn first_seller(&self) -> CatalogResult<Option<Seller>> {
        let seller = sqlx::query_as::<_, Seller>(
            "SELECT id, name, logo, rating, num_reviews, created_at
             FROM sellers ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .fetch_optional(&*self.db)
        .await?;
        Ok(seller)
    }

    /// Replace a collection with `drafts`, all attributed to the first seller.
    ///
    /// Fails with NoSellerAvailable before touching anything when no seller
    /// is registered. Assets of the removed items are returned, not deleted.
    pub async fn seed(&self, collection: &str, drafts: &[ItemDraft]) -> CatalogResult<SeedOutcome> {
        self.collection(collection)?;
        for draft in drafts {
            validate_numbers(draft.price, draft.count_in_stock)?;
        }
        let seller = self
            .first_seller()
            .await?
            .ok_or(CatalogError::NoSellerAvailable)?;

        let mut tx = begin_immediate(&self.db).await?;
        let released_assets = sqlx::query_scalar::<_, Uuid>(
            "SELECT asset_id FROM items WHERE collection = ? AND asset_id IS NOT NULL",
        )
        .bind(collection)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM items WHERE collection = ?")
            .bind(collection)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        for draft in drafts {
            insert_item(&mut *tx, collection, &seller.id, draft, now).await?;
        }
        tx.commit().await?;

        let records = sqlx::query_as::<_, ItemRecord>(&format!(
            "{} WHERE i.collection = ? ORDER BY i.seq ASC",
            ITEM_SELECT
        ))
        .bind(collection)
        .fetch_all(&*self.db)
        .await?;
        let created = self.attach_reviews(records, false).await?;

        info!(collection, count = created.len(), seller = %seller.id, "collection seeded");
        Ok(SeedOutcome {
            created,
            released_assets,
        })
    }

    async fn fetch_record(&self, id: Uuid) -> CatalogResult<Option<ItemRecord>> {
        let record = sqlx::query_as::<_, ItemRecord>(&format!("{} WHERE i.id = ?", ITEM_SELECT))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(record)
    }

    /// Load reviews for all `records` in one query and build API items.
    async fn attach_reviews(
        &self,
        records: Vec<ItemRecord>,
        full_seller: bool,
    ) -> CatalogResult<Vec<CatalogItem>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, item_id, name, rating, comment, created_at FROM reviews WHERE item_id IN (",
        );
        let mut separated = builder.separated(", ");
        for record in &records {
            separated.push_bind(record.id);
        }
        separated.push_unseparated(") ORDER BY seq ASC");
        let reviews: Vec<Review> = builder.build_query_as().fetch_all(&*self.db).await?;

        let mut by_item: HashMap<Uuid, Vec<Review>> = HashMap::new();
        for review in reviews {
            by_item.entry(review.item_id).or_default().push(review);
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let reviews = by_item.remove(&record.id).unwrap_or_default();
                record.into_item(reviews, full_seller)
            })
            .collect())
    }
}

async fn insert_item(
    conn: &mut SqliteConnection,
    collection: &str,
    seller_id: &str,
    draft: &ItemDraft,
    now: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let name = draft
        .name
        .clone()
        .unwrap_or_else(|| format!("sample name {}", now.timestamp_millis()));

    sqlx::query(
        "INSERT INTO items (
            id, collection, name, name_folded, seller_id, category, price, brand,
            count_in_stock, rating, num_reviews, description, asset_id, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, NULL, ?, ?)",
    )
    .bind(id)
    .bind(collection)
    .bind(&name)
    .bind(name.to_lowercase())
    .bind(seller_id)
    .bind(draft.category.as_deref().unwrap_or("sample category"))
    .bind(draft.price.unwrap_or(0.0))
    .bind(draft.brand.as_deref().unwrap_or("sample brand"))
    .bind(draft.count_in_stock.unwrap_or(0))
    .bind(draft.description.as_deref().unwrap_or("sample description"))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

/// Price must be a finite non-negative number and stock non-negative.
fn validate_numbers(price: Option<f64>, stock: Option<i64>) -> CatalogResult<()> {
    if let Some(price) = price {
        if !price.is_finite() || price < 0.0 {
            return Err(CatalogError::Validation(format!(
                "price must be a non-negative number, got {}",
                price
            )));
        }
    }
    if let Some(stock) = stock {
        if stock < 0 {
            return Err(CatalogError::Validation(format!(
                "countInStock must not be negative, got {}",
                stock
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        db::{file_pool, test_pool},
        services::catalog_query::{ItemFilter, ListQuery, PriceRange, SortOrder},
    };

    pub(crate) fn categories() -> Vec<CategoryDescriptor> {
        vec![
            CategoryDescriptor {
                key: "jackets".into(),
                page_size: 4,
            },
            CategoryDescriptor {
                key: "blazers".into(),
                page_size: 5,
            },
        ]
    }

    pub(crate) async fn service() -> CatalogService {
        CatalogService::new(Arc::new(test_pool().await), &categories())
    }

    /// Same as `service`, but on a WAL database file with a multi-connection
    /// pool. Keep the directory alive for the duration of the test.
    pub(crate) async fn file_service() -> (tempfile::TempDir, CatalogService) {
        let (dir, pool) = file_pool().await;
        (dir, CatalogService::new(Arc::new(pool), &categories()))
    }

    pub(crate) fn draft(name: &str, category: &str, price: f64) -> ItemDraft {
        ItemDraft {
            name: Some(name.into()),
            category: Some(category.into()),
            price: Some(price),
            brand: Some("acme".into()),
            count_in_stock: Some(3),
            description: Some("warm".into()),
        }
    }

    async fn set_rating(svc: &CatalogService, id: Uuid, rating: f64) {
        sqlx::query("UPDATE items SET rating = ? WHERE id = ?")
            .bind(rating)
            .bind(id)
            .execute(&*svc.db)
            .await
            .unwrap();
    }

    async fn all(svc: &CatalogService, params: &ListParams) -> Vec<CatalogItem> {
        let mut params = params.clone();
        let mut out = Vec::new();
        loop {
            let page = svc.list_items("jackets", &params).await.unwrap();
            if page.items.is_empty() {
                return out;
            }
            out.extend(page.items);
            params.page += 1;
        }
    }

    #[tokio::test]
    async fn unknown_collection_is_rejected() {
        let svc = service().await;
        let err = svc.list_items("capes", &ListParams::default()).await.unwrap_err();
        assert!(matches!(err, CatalogError::UnknownCollection(key) if key == "capes"));
    }

    #[tokio::test]
    async fn create_fills_sample_defaults() {
        let svc = service().await;
        let item = svc
            .create_item("jackets", "seller-1", &ItemDraft::default())
            .await
            .unwrap();
        assert!(item.name.starts_with("sample name "));
        assert_eq!(item.category, "sample category");
        assert_eq!(item.brand, "sample brand");
        assert_eq!(item.price, 0.0);
        assert_eq!(item.rating, 0.0);
        assert_eq!(item.num_reviews, 0);
        assert!(item.reviews.is_empty());
        assert!(item.seller.is_none());
    }

    #[tokio::test]
    async fn create_rejects_negative_values() {
        let svc = service().await;
        let mut bad = draft("a", "b", -1.0);
        assert!(matches!(
            svc.create_item("jackets", "s", &bad).await,
            Err(CatalogError::Validation(_))
        ));
        bad.price = Some(1.0);
        bad.count_in_stock = Some(-5);
        assert!(matches!(
            svc.create_item("jackets", "s", &bad).await,
            Err(CatalogError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn filters_are_conjunctive_and_absent_filters_never_exclude() {
        let svc = service().await;
        let a = svc.create_item("jackets", "s1", &draft("Wool Coat", "winter", 120.0)).await.unwrap();
        let b = svc.create_item("jackets", "s2", &draft("wool vest", "winter", 40.0)).await.unwrap();
        let c = svc.create_item("jackets", "s1", &draft("Rain shell", "monsoon", 60.0)).await.unwrap();
        svc.create_item("blazers", "s1", &draft("Wool blazer", "formal", 90.0)).await.unwrap();
        set_rating(&svc, a.id, 4.5).await;
        set_rating(&svc, b.id, 2.0).await;
        set_rating(&svc, c.id, 5.0).await;

        let everything = all(&svc, &ListParams::default()).await;
        assert_eq!(everything.len(), 3, "other collections never leak in");

        let wool = ListParams::from_query(&ListQuery {
            name: Some("WOOL".into()),
            ..Default::default()
        });
        let names: Vec<_> = all(&svc, &wool).await.into_iter().map(|i| i.id).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&a.id) && names.contains(&b.id));

        let combined = ListParams {
            filter: ItemFilter {
                name: Some("wool".into()),
                seller: Some("s1".into()),
                category: Some("winter".into()),
                price: Some(PriceRange { min: 100.0, max: 150.0 }),
                min_rating: Some(4.0),
            },
            ..Default::default()
        };
        let hits = all(&svc, &combined).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);

        let rated = ListParams {
            filter: ItemFilter {
                min_rating: Some(4.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let hits = all(&svc, &rated).await;
        assert!(hits.iter().all(|i| i.rating >= 4.0));
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn name_filter_folds_non_ascii_case() {
        let svc = service().await;
        svc.create_item("jackets", "s", &draft("ÉTÉ Jacket", "x", 1.0)).await.unwrap();
        let renamed = svc.create_item("jackets", "s", &draft("plain", "x", 1.0)).await.unwrap();
        svc.create_item("jackets", "s", &draft("winter parka", "x", 1.0)).await.unwrap();

        let by_name = |name: &str| ListParams {
            filter: ItemFilter {
                name: Some(name.into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let hits = all(&svc, &by_name("été")).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "ÉTÉ Jacket");

        let update = ItemUpdate {
            name: Some("Straße Coat".into()),
            ..Default::default()
        };
        svc.update_item("jackets", &renamed.id.to_string(), &update)
            .await
            .unwrap();
        let hits = all(&svc, &by_name("STRAßE")).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, renamed.id);
    }

    #[tokio::test]
    async fn name_filter_is_a_literal_substring() {
        let svc = service().await;
        svc.create_item("jackets", "s", &draft("50% off parka", "x", 1.0)).await.unwrap();
        svc.create_item("jackets", "s", &draft("500 parka", "x", 1.0)).await.unwrap();

        let params = ListParams {
            filter: ItemFilter {
                name: Some("0%".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let hits = all(&svc, &params).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "50% off parka");
    }

    #[tokio::test]
    async fn pagination_math_and_out_of_range_pages() {
        let svc = service().await;
        for n in 0..9 {
            svc.create_item("jackets", "s", &draft(&format!("item {n}"), "c", n as f64))
                .await
                .unwrap();
        }

        let first = svc.list_items("jackets", &ListParams::default()).await.unwrap();
        assert_eq!(first.items.len(), 4);
        assert_eq!(first.page, 1);
        assert_eq!(first.pages, 3);
        assert_eq!(first.items[0].name, "item 8", "newest first by default");

        let last = svc
            .list_items("jackets", &ListParams { page: 3, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);

        let beyond = svc
            .list_items("jackets", &ListParams { page: 7, ..Default::default() })
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.page, 7);
        assert_eq!(beyond.pages, 3);
    }

    #[tokio::test]
    async fn empty_collection_has_zero_pages() {
        let svc = service().await;
        let page = svc.list_items("blazers", &ListParams::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pages, 0);
    }

    #[tokio::test]
    async fn sort_orders_are_monotonic() {
        let svc = service().await;
        for (n, (price, rating)) in [(30.0, 1.0), (10.0, 5.0), (20.0, 3.0), (50.0, 4.0), (40.0, 2.0)]
            .into_iter()
            .enumerate()
        {
            let item = svc
                .create_item("jackets", "s", &draft(&format!("p{n}"), "c", price))
                .await
                .unwrap();
            set_rating(&svc, item.id, rating).await;
        }

        let sorted = |sort| ListParams { sort, ..Default::default() };

        let lowest: Vec<f64> = all(&svc, &sorted(SortOrder::Lowest)).await.iter().map(|i| i.price).collect();
        assert!(lowest.windows(2).all(|w| w[0] <= w[1]), "{lowest:?}");

        let highest: Vec<f64> = all(&svc, &sorted(SortOrder::Highest)).await.iter().map(|i| i.price).collect();
        assert!(highest.windows(2).all(|w| w[0] >= w[1]), "{highest:?}");

        let top: Vec<f64> = all(&svc, &sorted(SortOrder::TopRated)).await.iter().map(|i| i.rating).collect();
        assert!(top.windows(2).all(|w| w[0] >= w[1]), "{top:?}");
        assert_eq!(top.len(), 5);
    }

    #[tokio::test]
    async fn distinct_categories_per_collection() {
        let svc = service().await;
        svc.create_item("jackets", "s", &draft("a", "winter", 1.0)).await.unwrap();
        svc.create_item("jackets", "s", &draft("b", "winter", 1.0)).await.unwrap();
        svc.create_item("jackets", "s", &draft("c", "monsoon", 1.0)).await.unwrap();
        svc.create_item("blazers", "s", &draft("d", "formal", 1.0)).await.unwrap();

        let mut cats = svc.distinct_categories("jackets").await.unwrap();
        cats.sort();
        assert_eq!(cats, vec!["monsoon".to_string(), "winter".to_string()]);
    }

    #[tokio::test]
    async fn detail_resolves_seller_projection() {
        let svc = service().await;
        svc.register_seller(&SellerProfile {
            id: "s1".into(),
            name: "Tailor & Co".into(),
            logo: "/logo.png".into(),
            rating: 4.2,
            num_reviews: 10,
        })
        .await
        .unwrap();
        let item = svc.create_item("jackets", "s1", &draft("a", "c", 1.0)).await.unwrap();

        let detail = svc.get_item("jackets", &item.id.to_string()).await.unwrap();
        let seller = detail.seller.unwrap();
        assert_eq!(seller.name, "Tailor & Co");
        assert_eq!(seller.rating, Some(4.2));
        assert_eq!(seller.num_reviews, Some(10));

        let listed = svc.list_items("jackets", &ListParams::default()).await.unwrap();
        let seller = listed.items[0].seller.clone().unwrap();
        assert_eq!(seller.logo, "/logo.png");
        assert_eq!(seller.rating, None);
    }

    #[tokio::test]
    async fn lookups_respect_collection_and_malformed_ids() {
        let svc = service().await;
        let item = svc.create_item("jackets", "s", &draft("a", "c", 1.0)).await.unwrap();
        let id = item.id.to_string();

        assert!(matches!(
            svc.get_item("blazers", &id).await,
            Err(CatalogError::ItemNotFound { .. })
        ));
        assert!(matches!(
            svc.get_item("jackets", "not-a-uuid").await,
            Err(CatalogError::ItemNotFound { .. })
        ));
        assert_eq!(svc.get_product(&id).await.unwrap().id, item.id);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let svc = service().await;
        let item = svc.create_item("jackets", "s", &draft("a", "c", 10.0)).await.unwrap();
        let updated = svc
            .update_item(
                "jackets",
                &item.id.to_string(),
                &ItemUpdate {
                    price: Some(25.5),
                    brand: Some("other".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, 25.5);
        assert_eq!(updated.brand, "other");
        assert_eq!(updated.name, "a");
        assert_eq!(updated.count_in_stock, 3);
    }

    #[tokio::test]
    async fn delete_removes_item() {
        let svc = service().await;
        let item = svc.create_item("jackets", "s", &draft("a", "c", 10.0)).await.unwrap();
        let id = item.id.to_string();
        svc.delete_item("jackets", &id).await.unwrap();
        assert!(matches!(
            svc.get_item("jackets", &id).await,
            Err(CatalogError::ItemNotFound { .. })
        ));
        assert!(matches!(
            svc.delete_item("jackets", &id).await,
            Err(CatalogError::ItemNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn seed_requires_a_seller_and_leaves_data_untouched() {
        let svc = service().await;
        svc.create_item("jackets", "s", &draft("keep me", "c", 1.0)).await.unwrap();

        let err = svc.seed("jackets", &[draft("x", "c", 1.0)]).await.unwrap_err();
        assert!(matches!(err, CatalogError::NoSellerAvailable));
        let page = svc.list_items("jackets", &ListParams::default()).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn seed_replaces_collection() {
        let svc = service().await;
        svc.register_seller(&SellerProfile {
            id: "s1".into(),
            name: "First".into(),
            logo: String::new(),
            rating: 0.0,
            num_reviews: 0,
        })
        .await
        .unwrap();
        svc.create_item("jackets", "old", &draft("old", "c", 1.0)).await.unwrap();
        svc.create_item("blazers", "old", &draft("other", "c", 1.0)).await.unwrap();

        let outcome = svc
            .seed("jackets", &[draft("x", "c", 1.0), draft("y", "c", 2.0)])
            .await
            .unwrap();
        assert_eq!(outcome.created.len(), 2);
        assert!(outcome.created.iter().all(|i| i.seller_id == "s1"));
        assert!(outcome.released_assets.is_empty());

        let names: Vec<_> = all(&svc, &ListParams::default()).await.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["y".to_string(), "x".to_string()]);
        let blazers = svc.list_items("blazers", &ListParams::default()).await.unwrap();
        assert_eq!(blazers.items.len(), 1);
    }
}
