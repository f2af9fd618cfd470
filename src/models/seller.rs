//! A seller profile that catalog items are attributed to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered seller.
///
/// The id is the opaque identity supplied by the authentication layer; the
/// profile fields feed the seller projection shown alongside items.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: String,
    pub name: String,
    pub logo: String,
    pub rating: f64,
    pub num_reviews: i64,
    pub created_at: DateTime<Utc>,
}

/// Payload for registering or replacing a seller profile.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub num_reviews: i64,
}
