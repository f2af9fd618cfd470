//! Faceted listing: optional filters combined with AND, a fixed set of sort
//! orders, and offset/limit paging. Every catalog collection uses the same
//! engine; only the page size differs.

use crate::models::item::CatalogItem;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, sqlite::Sqlite};

/// Raw listing parameters as they arrive in the query string.
///
/// Everything is a string on the wire and coerced by [`ListParams::from_query`].
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "pageNumber")]
    pub page_number: Option<String>,
    pub name: Option<String>,
    pub seller: Option<String>,
    pub category: Option<String>,
    pub order: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub rating: Option<String>,
}

/// Sort orders a listing can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Price ascending.
    Lowest,
    /// Price descending.
    Highest,
    /// Rating descending.
    TopRated,
    /// Most recently inserted first.
    #[default]
    Newest,
}

impl SortOrder {
    /// Map the `order` parameter; anything unrecognised means newest first.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "lowest" => Self::Lowest,
            "highest" => Self::Highest,
            "toprated" => Self::TopRated,
            _ => Self::Newest,
        }
    }

    /// `ORDER BY` clause. Insertion order breaks ties so pages are stable.
    fn order_by(self) -> &'static str {
        match self {
            Self::Lowest => "i.price ASC, i.seq DESC",
            Self::Highest => "i.price DESC, i.seq DESC",
            Self::TopRated => "i.rating DESC, i.seq DESC",
            Self::Newest => "i.seq DESC",
        }
    }
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Conjunction of the optional listing predicates. `None` contributes no
/// constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// Case-insensitive substring of the item name.
    pub name: Option<String>,
    /// Exact seller identity.
    pub seller: Option<String>,
    /// Exact category label.
    pub category: Option<String>,
    pub price: Option<PriceRange>,
    /// Items rated at least this much.
    pub min_rating: Option<f64>,
}

impl ItemFilter {
    /// Append `WHERE` conditions for `collection` plus every present predicate.
    pub fn push_conditions<'a>(&'a self, collection: &'a str, builder: &mut QueryBuilder<'a, Sqlite>) {
        builder.push(" WHERE i.collection = ");
        builder.push_bind(collection);

        if let Some(name) = &self.name {
            builder.push(" AND i.name_folded LIKE ");
            builder.push_bind(format!("%{}%", escape_like(&name.to_lowercase())));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(seller) = &self.seller {
            builder.push(" AND i.seller_id = ");
            builder.push_bind(seller.as_str());
        }
        if let Some(category) = &self.category {
            builder.push(" AND i.category = ");
            builder.push_bind(category.as_str());
        }
        if let Some(range) = self.price {
            builder.push(" AND i.price >= ");
            builder.push_bind(range.min);
            builder.push(" AND i.price <= ");
            builder.push_bind(range.max);
        }
        if let Some(rating) = self.min_rating {
            builder.push(" AND i.rating >= ");
            builder.push_bind(rating);
        }
    }
}

/// Coerced listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub filter: ItemFilter,
    pub sort: SortOrder,
    /// 1-based page number.
    pub page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            filter: ItemFilter::default(),
            sort: SortOrder::default(),
            page: 1,
        }
    }
}

impl ListParams {
    /// Coerce wire parameters.
    ///
    /// Empty strings and zero values mean "no filter". The price range only
    /// applies when both bounds are present and non-zero.
    pub fn from_query(q: &ListQuery) -> Self {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.is_empty()).cloned();

        let min = coerce_number(q.min.as_deref());
        let max = coerce_number(q.max.as_deref());
        let rating = coerce_number(q.rating.as_deref());

        let page = coerce_number(q.page_number.as_deref()).trunc();
        let page = if page >= 1.0 {
            page.min(u32::MAX as f64) as u32
        } else {
            1
        };

        Self {
            filter: ItemFilter {
                name: non_empty(&q.name),
                seller: non_empty(&q.seller),
                category: non_empty(&q.category),
                price: (min != 0.0 && max != 0.0).then_some(PriceRange { min, max }),
                min_rating: (rating != 0.0).then_some(rating),
            },
            sort: SortOrder::parse(q.order.as_deref().unwrap_or("")),
            page,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct ItemPage {
    pub items: Vec<CatalogItem>,
    pub page: u32,
    pub pages: u64,
}

/// Number of pages needed for `count` matches.
pub fn total_pages(count: u64, page_size: u32) -> u64 {
    count.div_ceil(u64::from(page_size.max(1)))
}

/// `(offset, limit)` of a 1-based page.
pub fn page_window(page: u32, page_size: u32) -> (i64, i64) {
    let page_size = i64::from(page_size);
    let offset = page_size.saturating_mul(i64::from(page.max(1)) - 1);
    (offset, page_size)
}

/// Append the sort and paging tail of a listing query.
pub fn push_order_and_window(
    builder: &mut QueryBuilder<'_, Sqlite>,
    sort: SortOrder,
    page: u32,
    page_size: u32,
) {
    let (offset, limit) = page_window(page, page_size);
    builder.push(" ORDER BY ");
    builder.push(sort.order_by());
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);
}

/// Numeric coercion of a query value; unparsable or non-finite input is 0.
fn coerce_number(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Escape `LIKE` wildcards so the name filter is a plain substring match.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
