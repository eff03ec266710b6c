//! Variation handlers: the variation-side CRUD, color search, and the
//! targeted per-size stock update.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shelf_core::{NewVariation, ProductData, SizeAvailability, VariationPatch};
use shelf_db::{ColorSearchHit, ProductRow, VariationRow};

use crate::middleware::RequestId;

use super::{map_db_error, map_not_found, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VariationItem {
    id: i64,
    color_name: String,
    color_code: String,
    variation_images: Vec<String>,
    main_image: String,
    stock_quantity: i32,
    is_available: bool,
    size_availability: Vec<SizeAvailability>,
    product_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VariationRow> for VariationItem {
    fn from(row: VariationRow) -> Self {
        Self {
            id: row.id,
            color_name: row.color_name,
            color_code: row.color_code,
            variation_images: row.variation_images,
            main_image: row.main_image,
            stock_quantity: row.stock_quantity,
            is_available: row.is_available,
            size_availability: row.size_availability.0,
            product_id: row.product_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// The owning product embedded in a color-search hit. Variation refs stay as
/// raw ids here; only the hit's own variation is resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OwnerProductItem {
    id: i64,
    name: String,
    image: String,
    variation_refs: Vec<i64>,
    data: ProductData,
    base_price: Decimal,
    available_sizes: Vec<String>,
    tags: Vec<String>,
    is_featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for OwnerProductItem {
    fn from(row: ProductRow) -> Self {
        let data = row.data();
        Self {
            id: row.id,
            name: row.name,
            image: row.image,
            variation_refs: row.variation_refs,
            data,
            base_price: row.base_price,
            available_sizes: row.available_sizes,
            tags: row.tags,
            is_featured: row.is_featured,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A color-search hit: the variation with its owner resolved inline.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ColorSearchItem {
    id: i64,
    color_name: String,
    color_code: String,
    variation_images: Vec<String>,
    main_image: String,
    stock_quantity: i32,
    is_available: bool,
    size_availability: Vec<SizeAvailability>,
    product: Option<OwnerProductItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ColorSearchHit> for ColorSearchItem {
    fn from(hit: ColorSearchHit) -> Self {
        let variation = hit.variation;
        Self {
            id: variation.id,
            color_name: variation.color_name,
            color_code: variation.color_code,
            variation_images: variation.variation_images,
            main_image: variation.main_image,
            stock_quantity: variation.stock_quantity,
            is_available: variation.is_available,
            size_availability: variation.size_availability.0,
            product: hit.product.map(OwnerProductItem::from),
            created_at: variation.created_at,
            updated_at: variation.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateStockRequest {
    pub variation_id: i64,
    pub size: String,
    pub new_stock: i32,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /get/variations/{productId} — variations by back-reference.
pub(super) async fn list_product_variations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<VariationItem>>>, ApiError> {
    let rows = shelf_db::list_for_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(VariationItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /add/variation/{productId} — create a variation under an existing
/// product and append it to the owner's refs.
pub(super) async fn add_variation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
    Json(body): Json<NewVariation>,
) -> Result<(StatusCode, Json<ApiResponse<VariationItem>>), ApiError> {
    let row = shelf_db::add_variation(&state.pool, product_id, &body)
        .await
        .map_err(|e| map_not_found(&req_id.0, e, format!("product {product_id} not found")))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: VariationItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PUT /update/variation/{variationId} — sparse variation update.
pub(super) async fn update_variation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(variation_id): Path<i64>,
    Json(body): Json<VariationPatch>,
) -> Result<Json<ApiResponse<VariationItem>>, ApiError> {
    let row = shelf_db::update_variation(&state.pool, variation_id, &body)
        .await
        .map_err(|e| {
            map_not_found(&req_id.0, e, format!("variation {variation_id} not found"))
        })?;

    Ok(Json(ApiResponse {
        data: VariationItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /delete/variation/{variationId} — delete and detach from the owner.
pub(super) async fn delete_variation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(variation_id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    shelf_db::delete_variation(&state.pool, variation_id)
        .await
        .map_err(|e| {
            map_not_found(&req_id.0, e, format!("variation {variation_id} not found"))
        })?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /get/productcolors/{color} — available variations by color substring,
/// owners resolved inline.
pub(super) async fn search_by_color(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(color): Path<String>,
) -> Result<Json<ApiResponse<Vec<ColorSearchItem>>>, ApiError> {
    let hits = shelf_db::search_by_color(&state.pool, &color)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: hits.into_iter().map(ColorSearchItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /update/stock — set the stock of one variation+size pair.
pub(super) async fn update_stock(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<UpdateStockRequest>,
) -> Result<Json<ApiResponse<VariationItem>>, ApiError> {
    let row = shelf_db::update_size_stock(&state.pool, body.variation_id, &body.size, body.new_stock)
        .await
        .map_err(|e| {
            map_not_found(
                &req_id.0,
                e,
                format!(
                    "variation {} has no size '{}' or does not exist",
                    body.variation_id, body.size
                ),
            )
        })?;

    Ok(Json(ApiResponse {
        data: VariationItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}
