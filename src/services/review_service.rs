//! Review submission and the derived rating summary on catalog items.

use crate::{
    db::{begin_immediate, is_unique_violation},
    models::item::Review,
    services::catalog_service::{CatalogError, CatalogResult, CatalogService},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Appends reviews and keeps `rating`/`num_reviews` consistent with them.
///
/// One review per reviewer per item is enforced by a unique constraint, and
/// the insert plus the summary refresh share one transaction, so concurrent
/// submissions from the same reviewer cannot both land.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<SqlitePool>,
    catalog: CatalogService,
}

impl ReviewService {
    pub fn new(db: Arc<SqlitePool>, catalog: CatalogService) -> Self {
        Self { db, catalog }
    }

    /// Append a review from `reviewer` and return it.
    pub async fn add_review(
        &self,
        collection: &str,
        item_id: &str,
        reviewer: &str,
        rating: i64,
        comment: &str,
    ) -> CatalogResult<Review> {
        self.catalog.collection(collection)?;
        let not_found = || CatalogError::ItemNotFound {
            collection: collection.to_string(),
            id: item_id.to_string(),
        };
        let item_uuid = Uuid::parse_str(item_id).map_err(|_| not_found())?;

        if !(1..=5).contains(&rating) {
            return Err(CatalogError::InvalidRating(rating));
        }

        let mut tx = begin_immediate(&self.db).await?;

        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE id = ? AND collection = ?",
        )
        .bind(item_uuid)
        .bind(collection)
        .fetch_one(&mut *tx)
        .await?;
        if exists == 0 {
            return Err(not_found());
        }

        let now = Utc::now();
        let inserted = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (id, item_id, name, rating, comment, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, item_id, name, rating, comment, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(item_uuid)
        .bind(reviewer)
        .bind(rating)
        .bind(comment)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let review = match inserted {
            Ok(review) => review,
            Err(err) if is_unique_violation(&err) => return Err(CatalogError::DuplicateReview),
            Err(err) => return Err(err.into()),
        };

        sqlx::query(
            "UPDATE items SET
                num_reviews = (SELECT COUNT(*) FROM reviews WHERE item_id = ?1),
                rating = COALESCE((SELECT AVG(rating) FROM reviews WHERE item_id = ?1), 0),
                updated_at = ?2
             WHERE id = ?1",
        )
        .bind(item_uuid)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(collection, item = %item_uuid, reviewer, rating, "review added");
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog_service::tests::{draft, file_service, service};

    async fn with_item(catalog: CatalogService) -> (ReviewService, CatalogService, String) {
        let item = catalog
            .create_item("jackets", "s", &draft("coat", "winter", 10.0))
            .await
            .unwrap();
        let reviews = ReviewService::new(catalog.db.clone(), catalog.clone());
        (reviews, catalog, item.id.to_string())
    }

    async fn setup() -> (ReviewService, CatalogService, String) {
        with_item(service().await).await
    }

    #[tokio::test]
    async fn summary_is_the_exact_mean() {
        let (reviews, catalog, id) = setup().await;
        for (who, rating) in [("ana", 4), ("ben", 5), ("cai", 3)] {
            let review = reviews
                .add_review("jackets", &id, who, rating, "ok")
                .await
                .unwrap();
            assert_eq!(review.name, who);
            assert_eq!(review.rating, rating);
        }

        let item = catalog.get_item("jackets", &id).await.unwrap();
        assert_eq!(item.num_reviews, 3);
        assert_eq!(item.reviews.len(), 3);
        assert_eq!(item.rating, 4.0);
        let order: Vec<_> = item.reviews.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, ["ana", "ben", "cai"]);
    }

    #[tokio::test]
    async fn count_grows_by_one_per_review() {
        let (reviews, catalog, id) = setup().await;
        reviews.add_review("jackets", &id, "ana", 2, "meh").await.unwrap();
        let before = catalog.get_item("jackets", &id).await.unwrap();
        reviews.add_review("jackets", &id, "ben", 5, "great").await.unwrap();
        let after = catalog.get_item("jackets", &id).await.unwrap();
        assert_eq!(after.num_reviews, before.num_reviews + 1);
        assert_eq!(after.rating, 3.5);
    }

    #[tokio::test]
    async fn second_review_from_same_reviewer_is_rejected() {
        let (reviews, catalog, id) = setup().await;
        reviews.add_review("jackets", &id, "ana", 4, "first").await.unwrap();
        let err = reviews
            .add_review("jackets", &id, "ana", 1, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateReview));

        let item = catalog.get_item("jackets", &id).await.unwrap();
        assert_eq!(item.num_reviews, 1);
        assert_eq!(item.rating, 4.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reviewers_all_land() {
        let (_dir, catalog) = file_service().await;
        let (reviews, catalog, id) = with_item(catalog).await;

        let mut handles = Vec::new();
        for n in 0..20 {
            let reviews = reviews.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let rating = n % 5 + 1;
                reviews
                    .add_review("jackets", &id, &format!("reviewer-{}", n), rating, "ok")
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let item = catalog.get_item("jackets", &id).await.unwrap();
        assert_eq!(item.num_reviews, 20);
        assert_eq!(item.reviews.len(), 20);
        assert_eq!(item.rating, 3.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_admit_exactly_one() {
        let (_dir, catalog) = file_service().await;
        let (reviews, catalog, id) = with_item(catalog).await;

        let mut handles = Vec::new();
        for (who, rating) in [("ana", 5), ("ana", 3), ("ben", 4), ("ben", 2)] {
            let reviews = reviews.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let result = reviews.add_review("jackets", &id, who, rating, "x").await;
                (who, result)
            }));
        }

        let mut landed = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                (who, Ok(_)) => landed.push(who),
                (_, Err(CatalogError::DuplicateReview)) => {}
                (who, Err(err)) => panic!("{} failed with {:?}", who, err),
            }
        }
        landed.sort_unstable();
        assert_eq!(landed, ["ana", "ben"]);
        assert_eq!(catalog.get_item("jackets", &id).await.unwrap().num_reviews, 2);
    }

    #[tokio::test]
    async fn missing_item_and_bad_rating() {
        let (reviews, _catalog, id) = setup().await;
        let missing = Uuid::new_v4().to_string();
        assert!(matches!(
            reviews.add_review("jackets", &missing, "ana", 4, "x").await,
            Err(CatalogError::ItemNotFound { .. })
        ));
        assert!(matches!(
            reviews.add_review("blazers", &id, "ana", 4, "x").await,
            Err(CatalogError::ItemNotFound { .. })
        ));
        for rating in [0, 6, -1] {
            assert!(matches!(
                reviews.add_review("jackets", &id, "ana", rating, "x").await,
                Err(CatalogError::InvalidRating(r)) if r == rating
            ));
        }
    }
}
