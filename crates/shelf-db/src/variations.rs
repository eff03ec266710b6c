//! Database operations for the `product_variations` table and the variation
//! side of the product <-> variation relationship.
//!
//! Attach/detach both update the owner's `variation_refs` inside the same
//! transaction as the variation write; no caller can move one side of the
//! pair without the other.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use shelf_core::{NewVariation, SizeAvailability, VariationPatch};

use crate::products::ProductRow;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `product_variations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariationRow {
    pub id: i64,
    pub color_name: String,
    pub color_code: String,
    pub variation_images: Vec<String>,
    pub main_image: String,
    pub stock_quantity: i32,
    pub is_available: bool,
    pub size_availability: Json<Vec<SizeAvailability>>,
    /// Back-reference to the owning product; `NULL` only transiently, inside
    /// the product-creation transaction.
    pub product_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A color-search hit: the variation plus its owning product resolved inline.
/// `product` is `None` only for a variation whose back-reference is missing.
#[derive(Debug, Clone)]
pub struct ColorSearchHit {
    pub variation: VariationRow,
    pub product: Option<ProductRow>,
}

// ---------------------------------------------------------------------------
// Shared insert + batch fetch, used by the product-side routines too
// ---------------------------------------------------------------------------

/// Insert one variation row inside an open transaction and return it.
pub(crate) async fn insert_variation(
    conn: &mut PgConnection,
    variation: &NewVariation,
    product_id: Option<i64>,
) -> Result<VariationRow, DbError> {
    let row = sqlx::query_as::<_, VariationRow>(
        "INSERT INTO product_variations \
             (color_name, color_code, variation_images, main_image, stock_quantity, \
              is_available, size_availability, product_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id, color_name, color_code, variation_images, main_image, \
                   stock_quantity, is_available, size_availability, product_id, \
                   created_at, updated_at",
    )
    .bind(&variation.color_name)
    .bind(&variation.color_code)
    .bind(&variation.variation_images)
    .bind(&variation.main_image)
    .bind(variation.stock_quantity)
    .bind(variation.is_available)
    .bind(Json(&variation.size_availability))
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Fetch variations by id set, keyed by id for ref-order reassembly.
pub(crate) async fn variations_by_ids(
    pool: &PgPool,
    ids: &[i64],
) -> Result<HashMap<i64, VariationRow>, DbError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, VariationRow>(
        "SELECT id, color_name, color_code, variation_images, main_image, \
                stock_quantity, is_available, size_availability, product_id, \
                created_at, updated_at \
         FROM product_variations \
         WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all variations whose `product_id` equals the given id.
///
/// This is the independent query path over the back-reference, not a walk of
/// the owner's `variation_refs`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_for_product(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<VariationRow>, DbError> {
    let rows = sqlx::query_as::<_, VariationRow>(
        "SELECT id, color_name, color_code, variation_images, main_image, \
                stock_quantity, is_available, size_availability, product_id, \
                created_at, updated_at \
         FROM product_variations \
         WHERE product_id = $1 \
         ORDER BY id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Case-insensitive substring search on `color_name` among available
/// variations, each with its owning product resolved inline.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn search_by_color(pool: &PgPool, color: &str) -> Result<Vec<ColorSearchHit>, DbError> {
    let variations = sqlx::query_as::<_, VariationRow>(
        "SELECT id, color_name, color_code, variation_images, main_image, \
                stock_quantity, is_available, size_availability, product_id, \
                created_at, updated_at \
         FROM product_variations \
         WHERE is_available = TRUE AND color_name ILIKE '%' || $1 || '%' \
         ORDER BY id",
    )
    .bind(color)
    .fetch_all(pool)
    .await?;

    let product_ids: Vec<i64> = variations.iter().filter_map(|v| v.product_id).collect();
    let products: HashMap<i64, ProductRow> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, image, variation_refs, price, description, rating, is_new, \
                    brand, category, model_number, base_price, available_sizes, tags, \
                    is_featured, is_active, created_at, updated_at \
             FROM products \
             WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| (row.id, row))
        .collect()
    };

    Ok(variations
        .into_iter()
        .map(|variation| {
            let product = variation
                .product_id
                .and_then(|id| products.get(&id).cloned());
            ColorSearchHit { variation, product }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Create a variation under an existing product and append its id to the
/// owner's `variation_refs`, atomically.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product is absent, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn add_variation(
    pool: &PgPool,
    product_id: i64,
    variation: &NewVariation,
) -> Result<VariationRow, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    let row = insert_variation(&mut tx, variation, Some(product_id)).await?;

    sqlx::query(
        "UPDATE products \
         SET variation_refs = array_append(variation_refs, $2), updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(product_id)
    .bind(row.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Apply a sparse update to a variation. Never touches the owning product.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the variation is absent, or
/// [`DbError::Sqlx`] if the statement fails.
pub async fn update_variation(
    pool: &PgPool,
    variation_id: i64,
    patch: &VariationPatch,
) -> Result<VariationRow, DbError> {
    let row = sqlx::query_as::<_, VariationRow>(
        "UPDATE product_variations \
         SET color_name        = COALESCE($2, color_name), \
             color_code        = COALESCE($3, color_code), \
             variation_images  = COALESCE($4, variation_images), \
             main_image        = COALESCE($5, main_image), \
             stock_quantity    = COALESCE($6, stock_quantity), \
             is_available      = COALESCE($7, is_available), \
             size_availability = COALESCE($8, size_availability), \
             updated_at        = NOW() \
         WHERE id = $1 \
         RETURNING id, color_name, color_code, variation_images, main_image, \
                   stock_quantity, is_available, size_availability, product_id, \
                   created_at, updated_at",
    )
    .bind(variation_id)
    .bind(patch.color_name.as_deref())
    .bind(patch.color_code.as_deref())
    .bind(patch.variation_images.as_ref())
    .bind(patch.main_image.as_deref())
    .bind(patch.stock_quantity)
    .bind(patch.is_available)
    .bind(patch.size_availability.as_ref().map(Json))
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Delete a variation and remove its id from the owner's `variation_refs`,
/// atomically.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the variation is absent, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn delete_variation(pool: &PgPool, variation_id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let owner: Option<i64> = sqlx::query_scalar(
        "SELECT product_id FROM product_variations WHERE id = $1 FOR UPDATE",
    )
    .bind(variation_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    if let Some(product_id) = owner {
        sqlx::query(
            "UPDATE products \
             SET variation_refs = array_remove(variation_refs, $2), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(product_id)
        .bind(variation_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM product_variations WHERE id = $1")
        .bind(variation_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Set the `stock` of the one `size_availability` entry matching `size`, in
/// a single statement. The other entries and every other column of the row
/// are untouched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no variation has `variation_id` or its
/// `size_availability` has no entry for `size`, or [`DbError::Sqlx`] if the
/// statement fails.
pub async fn update_size_stock(
    pool: &PgPool,
    variation_id: i64,
    size: &str,
    new_stock: i32,
) -> Result<VariationRow, DbError> {
    let row = sqlx::query_as::<_, VariationRow>(
        "UPDATE product_variations \
         SET size_availability = ( \
                 SELECT COALESCE(jsonb_agg( \
                            CASE WHEN elem->>'size' = $2 \
                                 THEN jsonb_set(elem, '{stock}', to_jsonb($3::INT)) \
                                 ELSE elem \
                            END ORDER BY idx), '[]'::jsonb) \
                 FROM jsonb_array_elements(product_variations.size_availability) \
                      WITH ORDINALITY AS t(elem, idx) \
             ), \
             updated_at = NOW() \
         WHERE id = $1 \
           AND EXISTS ( \
               SELECT 1 \
               FROM jsonb_array_elements(product_variations.size_availability) AS e(elem) \
               WHERE e.elem->>'size' = $2 \
           ) \
         RETURNING id, color_name, color_code, variation_images, main_image, \
                   stock_quantity, is_available, size_availability, product_id, \
                   created_at, updated_at",
    )
    .bind(variation_id)
    .bind(size)
    .bind(new_stock)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}
