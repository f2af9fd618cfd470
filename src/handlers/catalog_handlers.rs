//! HTTP handlers for catalog collections, reviews and sellers.
//! Every collection is served by the same handlers; the `{category}` path
//! segment selects it.

use crate::{
    errors::AppError,
    handlers::guards::RequestUser,
    models::{
        item::{ItemDraft, ItemUpdate},
        seller::SellerProfile,
    },
    services::catalog_query::{ListParams, ListQuery},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};

/// Body of `POST /api/catalog/{category}/{id}/reviews`.
#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

/// `GET /api/catalog/{category}`: `{ <category>: [...], page, pages }`.
pub async fn list_items(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let params = ListParams::from_query(&query);
    let page = state.catalog.list_items(&category, &params).await?;

    let mut body = Map::new();
    let items = serde_json::to_value(page.items).map_err(|e| AppError::internal(e.to_string()))?;
    body.insert(category, items);
    body.insert("page".into(), json!(page.page));
    body.insert("pages".into(), json!(page.pages));
    Ok(Json(Value::Object(body)))
}

/// `GET /api/catalog/{category}/categories`
pub async fn list_categories(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.distinct_categories(&category).await?))
}

/// `GET /api/catalog/{category}/{id}`
pub async fn get_item(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.get_item(&category, &id).await?))
}

/// `POST /api/catalog/{category}`: the caller becomes the seller. An empty
/// body creates a sample item.
pub async fn create_item(
    State(state): State<AppState>,
    Path(category): Path<String>,
    user: RequestUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    user.require_seller_or_admin()?;
    let draft: ItemDraft = parse_body(&body)?;

    let item = state.catalog.create_item(&category, &user.id, &draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Item Created", "item": item })),
    ))
}

/// `PUT /api/catalog/{category}/{id}`: an `assetId` in the body links that
/// upload and deletes the one it replaces.
pub async fn update_item(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
    user: RequestUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    user.require_seller_or_admin()?;
    let update: ItemUpdate = parse_body(&body)?;

    let item = state.linker.update_item(&category, &id, &update).await?;
    Ok(Json(json!({ "message": "Item Updated", "item": item })))
}

/// `DELETE /api/catalog/{category}/{id}`
pub async fn delete_item(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
    user: RequestUser,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let item = state.linker.delete_item(&category, &id).await?;
    Ok(Json(json!({ "message": "Item Deleted", "item": item })))
}

/// `POST /api/catalog/{category}/{id}/reviews`: the caller's name is the
/// reviewer identity.
pub async fn add_review(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
    user: RequestUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let review: ReviewBody = parse_required(&body)?;
    let review = state
        .reviews
        .add_review(&category, &id, &user.name, review.rating, &review.comment)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review Created", "review": review })),
    ))
}

/// `POST /api/catalog/{category}/seed`: replace the collection with the
/// drafts in the body.
pub async fn seed_items(
    State(state): State<AppState>,
    Path(category): Path<String>,
    user: RequestUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let drafts: Vec<ItemDraft> = parse_body(&body)?;
    let created = state.linker.seed(&category, &drafts).await?;
    Ok(Json(json!({ "createdItems": created })))
}

/// `POST /api/sellers`
pub async fn register_seller(
    State(state): State<AppState>,
    user: RequestUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let profile: SellerProfile = parse_required(&body)?;
    let seller = state.catalog.register_seller(&profile).await?;
    Ok((StatusCode::CREATED, Json(seller)))
}

/// Decode an optional JSON body; empty means `T::default()`.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_required(body)
}

fn parse_required<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("invalid body: {}", e)))
}
