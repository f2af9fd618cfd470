//! Represents a sellable catalog item and the reviews embedded in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single product within one catalog collection (jackets, suits, ...).
///
/// `rating` and `num_reviews` are derived from `reviews` and are only ever
/// written by the review aggregator: `num_reviews == reviews.len()` and
/// `rating` is the mean review rating, or 0 without reviews.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Unique identifier of the item.
    pub id: Uuid,

    /// Collection key the item belongs to (e.g. "jackets").
    pub collection: String,

    pub name: String,

    /// Opaque identity of the seller that listed the item.
    pub seller_id: String,

    /// Resolved seller projection, absent when the seller is not registered.
    pub seller: Option<SellerSummary>,

    /// Free-form category label inside the collection.
    pub category: String,

    pub price: f64,
    pub brand: String,
    pub count_in_stock: i64,

    /// Mean of all review ratings (0 without reviews).
    pub rating: f64,

    /// Number of reviews.
    pub num_reviews: i64,

    pub description: String,

    /// Reviews in submission order.
    pub reviews: Vec<Review>,

    /// Linked image asset, if any.
    pub asset_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One reviewer's rating and comment.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    #[serde(skip)]
    pub item_id: Uuid,
    /// Reviewer identity; unique per item.
    pub name: String,
    /// Integer rating in 1..=5.
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Limited view of the seller shown with an item.
///
/// Listings carry name and logo; the detail view adds rating and review count.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub id: String,
    pub name: String,
    pub logo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_reviews: Option<i64>,
}

/// Fields accepted when creating or seeding an item. Missing fields fall back
/// to sample values.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemDraft {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub brand: Option<String>,
    pub count_in_stock: Option<i64>,
    pub description: Option<String>,
}

/// Field-level update of an existing item. Absent fields are left untouched.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub brand: Option<String>,
    pub count_in_stock: Option<i64>,
    pub description: Option<String>,
    /// Uploaded asset to link in place of the current one.
    pub asset_id: Option<Uuid>,
}

/// Flat row read from `items` joined with `sellers`.
#[derive(FromRow, Debug)]
pub(crate) struct ItemRecord {
    pub id: Uuid,
    pub collection: String,
    pub name: String,
    pub seller_id: String,
    pub category: String,
    pub price: f64,
    pub brand: String,
    pub count_in_stock: i64,
    pub rating: f64,
    pub num_reviews: i64,
    pub description: String,
    pub asset_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seller_name: Option<String>,
    pub seller_logo: Option<String>,
    pub seller_rating: Option<f64>,
    pub seller_num_reviews: Option<i64>,
}

impl ItemRecord {
    /// Assemble the API item. `full_seller` adds rating and review count to
    /// the seller projection.
    pub fn into_item(self, reviews: Vec<Review>, full_seller: bool) -> CatalogItem {
        let seller = self.seller_name.map(|name| SellerSummary {
            id: self.seller_id.clone(),
            name,
            logo: self.seller_logo.unwrap_or_default(),
            rating: self.seller_rating.filter(|_| full_seller),
            num_reviews: self.seller_num_reviews.filter(|_| full_seller),
        });

        CatalogItem {
            id: self.id,
            collection: self.collection,
            name: self.name,
            seller_id: self.seller_id,
            seller,
            category: self.category,
            price: self.price,
            brand: self.brand,
            count_in_stock: self.count_in_stock,
            rating: self.rating,
            num_reviews: self.num_reviews,
            description: self.description,
            reviews,
            asset_id: self.asset_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
