//! Product handlers: CRUD plus the category/featured/filtered read paths.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shelf_core::{NewProduct, ProductData, ProductPatch};
use shelf_db::{ProductFilter, ProductWithVariations, SortField, SortOrder};

use crate::middleware::RequestId;

use super::variations::VariationItem;
use super::{
    map_db_error, map_not_found, normalize_limit, normalize_page, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// A product with its variation refs resolved to full records.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductItem {
    id: i64,
    name: String,
    image: String,
    variations: Vec<VariationItem>,
    data: ProductData,
    base_price: Decimal,
    available_sizes: Vec<String>,
    tags: Vec<String>,
    is_featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductItem {
    fn from_record(record: ProductWithVariations) -> Self {
        let data = record.product.data();
        let product = record.product;
        Self {
            id: product.id,
            name: product.name,
            image: product.image,
            variations: record
                .variations
                .into_iter()
                .map(VariationItem::from)
                .collect(),
            data,
            base_price: product.base_price,
            available_sizes: product.available_sizes,
            tags: product.tags,
            is_featured: product.is_featured,
            is_active: product.is_active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PaginationInfo {
    current_page: i64,
    total_pages: i64,
    total_products: i64,
    limit: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct FilteredProductsData {
    products: Vec<ProductItem>,
    pagination: PaginationInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FilteredQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn items(records: Vec<ProductWithVariations>) -> Vec<ProductItem> {
    records.into_iter().map(ProductItem::from_record).collect()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /get/products — every product, variations resolved, newest first.
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let records = shelf_db::list_products(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: items(records),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /create/product — create a product, optionally with embedded
/// variations, as one atomic operation.
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let record = shelf_db::create_product(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ProductItem::from_record(record),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PUT /update/product — sparse update; the target id travels in the body.
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ProductPatch>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let product_id = body.id;
    let record = shelf_db::update_product(&state.pool, &body)
        .await
        .map_err(|e| map_not_found(&req_id.0, e, format!("product {product_id} not found")))?;

    Ok(Json(ApiResponse {
        data: ProductItem::from_record(record),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /delete/product/{id} — delete the product and cascade to its
/// variations.
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    shelf_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_not_found(&req_id.0, e, format!("product {id} not found")))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /get/product/{id} — one product, variations resolved.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let record = shelf_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(&req_id.0, "not_found", format!("product {id} not found")))?;

    Ok(Json(ApiResponse {
        data: ProductItem::from_record(record),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /get/category/{category} — active products by category substring.
pub(super) async fn list_by_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(category): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let records = shelf_db::list_by_category(&state.pool, &category)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: items(records),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /get/featured — featured, active products.
pub(super) async fn list_featured(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let records = shelf_db::list_featured(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: items(records),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /get/filtered — filtered, sorted, paginated product search.
pub(super) async fn list_filtered(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FilteredQuery>,
) -> Result<Json<ApiResponse<FilteredProductsData>>, ApiError> {
    let filter = ProductFilter {
        category: query.category,
        brand: query.brand,
        min_price: query.min_price,
        max_price: query.max_price,
        sort_by: SortField::parse(query.sort_by.as_deref()),
        sort_order: SortOrder::parse(query.sort_order.as_deref()),
        page: normalize_page(query.page),
        limit: normalize_limit(query.limit),
    };

    let page = shelf_db::list_filtered(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: FilteredProductsData {
            products: items(page.products),
            pagination: PaginationInfo {
                current_page: page.page,
                total_pages: page.total_pages,
                total_products: page.total,
                limit: page.limit,
            },
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
