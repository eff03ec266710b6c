//! Database operations for the `products` table, including the product side
//! of the product <-> variation relationship.
//!
//! Every operation that touches both tables (create with embedded
//! variations, replace variations on update, cascade delete) runs inside a
//! single transaction so the denormalized pair — `products.variation_refs`
//! and `product_variations.product_id` — can never be observed half-written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shelf_core::{NewProduct, ProductData, ProductPatch};

use crate::variations::{insert_variation, variations_by_ids, VariationRow};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
///
/// The nested `data` object is flattened into columns here; [`ProductRow::data`]
/// reassembles it for responses and for the merge path.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub image: String,
    /// Ordered variation ids; insertion order is creation/add order.
    pub variation_refs: Vec<i64>,
    pub price: Decimal,
    pub description: String,
    pub rating: Decimal,
    pub is_new: bool,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub model_number: Option<String>,
    pub base_price: Decimal,
    pub available_sizes: Vec<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// Reassemble the nested `data` object from its flattened columns.
    #[must_use]
    pub fn data(&self) -> ProductData {
        ProductData {
            price: self.price,
            description: self.description.clone(),
            rating: self.rating,
            is_new: self.is_new,
            brand: self.brand.clone(),
            category: self.category.clone(),
            model_number: self.model_number.clone(),
        }
    }
}

/// A product with its `variation_refs` resolved to full variation records,
/// in ref order. Refs pointing at missing rows are skipped, mirroring
/// populate semantics.
#[derive(Debug, Clone)]
pub struct ProductWithVariations {
    pub product: ProductRow,
    pub variations: Vec<VariationRow>,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    Price,
    BasePrice,
    Rating,
}

impl SortField {
    /// Map a caller-supplied sort key to a whitelisted column. Unknown keys
    /// fall back to `createdAt`.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("updatedAt") => SortField::UpdatedAt,
            Some("name") => SortField::Name,
            Some("price") => SortField::Price,
            Some("basePrice") => SortField::BasePrice,
            Some("rating") => SortField::Rating,
            _ => SortField::CreatedAt,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::BasePrice => "base_price",
            SortField::Rating => "rating",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    /// Only the exact string `"desc"` (or an absent value) sorts descending;
    /// anything else sorts ascending.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("desc") | None => SortOrder::Desc,
            Some(_) => SortOrder::Asc,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Desc => "DESC",
            SortOrder::Asc => "ASC",
        }
    }
}

/// Input filters for the paginated product search. `page` and `limit` are
/// expected pre-clamped to positive values by the caller.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category: None,
            brand: None,
            min_price: None,
            max_price: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
            limit: 10,
        }
    }
}

/// One page of filtered products plus the pagination bookkeeping.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<ProductWithVariations>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

/// Resolve `variation_refs` for a batch of products with one id-set query,
/// preserving per-product ref order (duplicate refs resolve to the same
/// record twice).
async fn attach_variations(
    pool: &PgPool,
    products: Vec<ProductRow>,
) -> Result<Vec<ProductWithVariations>, DbError> {
    let ids: Vec<i64> = products
        .iter()
        .flat_map(|p| p.variation_refs.iter().copied())
        .collect();
    let by_id = variations_by_ids(pool, &ids).await?;

    Ok(products
        .into_iter()
        .map(|product| {
            let variations = product
                .variation_refs
                .iter()
                .filter_map(|id| by_id.get(id).cloned())
                .collect();
            ProductWithVariations {
                product,
                variations,
            }
        })
        .collect())
}

async fn attach_one(pool: &PgPool, product: ProductRow) -> Result<ProductWithVariations, DbError> {
    let mut resolved = attach_variations(pool, vec![product]).await?;
    // attach_variations returns exactly as many entries as it was given.
    resolved.pop().ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns all products, variations resolved, newest-created first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductWithVariations>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, image, variation_refs, price, description, rating, is_new, \
                brand, category, model_number, base_price, available_sizes, tags, \
                is_featured, is_active, created_at, updated_at \
         FROM products \
         ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    attach_variations(pool, rows).await
}

/// Returns one product with variations resolved, or `None` if absent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_product(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ProductWithVariations>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, image, variation_refs, price, description, rating, is_new, \
                brand, category, model_number, base_price, available_sizes, tags, \
                is_featured, is_active, created_at, updated_at \
         FROM products \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(attach_one(pool, row).await?)),
        None => Ok(None),
    }
}

/// Returns active products whose category matches `category`
/// case-insensitively by substring, variations resolved, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_by_category(
    pool: &PgPool,
    category: &str,
) -> Result<Vec<ProductWithVariations>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, image, variation_refs, price, description, rating, is_new, \
                brand, category, model_number, base_price, available_sizes, tags, \
                is_featured, is_active, created_at, updated_at \
         FROM products \
         WHERE is_active = TRUE AND category ILIKE '%' || $1 || '%' \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(category)
    .fetch_all(pool)
    .await?;

    attach_variations(pool, rows).await
}

/// Returns featured, active products, variations resolved, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_featured(pool: &PgPool) -> Result<Vec<ProductWithVariations>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, image, variation_refs, price, description, rating, is_new, \
                brand, category, model_number, base_price, available_sizes, tags, \
                is_featured, is_active, created_at, updated_at \
         FROM products \
         WHERE is_featured = TRUE AND is_active = TRUE \
         ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    attach_variations(pool, rows).await
}

/// Filtered, sorted, offset/limit-paginated search over active products.
///
/// Substring filters are case-insensitive; price bounds are inclusive.
/// `total_pages` is `ceil(total / limit)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_filtered(
    pool: &PgPool,
    filter: &ProductFilter,
) -> Result<ProductPage, DbError> {
    // Sort column and direction come from a closed enum, never from the
    // request string, so interpolation here cannot inject SQL.
    let sql = format!(
        "SELECT id, name, image, variation_refs, price, description, rating, is_new, \
                brand, category, model_number, base_price, available_sizes, tags, \
                is_featured, is_active, created_at, updated_at \
         FROM products \
         WHERE is_active = TRUE \
           AND ($1::TEXT IS NULL OR category ILIKE '%' || $1 || '%') \
           AND ($2::TEXT IS NULL OR brand ILIKE '%' || $2 || '%') \
           AND ($3::NUMERIC IS NULL OR price >= $3) \
           AND ($4::NUMERIC IS NULL OR price <= $4) \
         ORDER BY {} {}, id DESC \
         LIMIT $5 OFFSET $6",
        filter.sort_by.column(),
        filter.sort_order.keyword(),
    );

    let offset = (filter.page - 1) * filter.limit;
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(filter.category.as_deref())
        .bind(filter.brand.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) \
         FROM products \
         WHERE is_active = TRUE \
           AND ($1::TEXT IS NULL OR category ILIKE '%' || $1 || '%') \
           AND ($2::TEXT IS NULL OR brand ILIKE '%' || $2 || '%') \
           AND ($3::NUMERIC IS NULL OR price >= $3) \
           AND ($4::NUMERIC IS NULL OR price <= $4)",
    )
    .bind(filter.category.as_deref())
    .bind(filter.brand.as_deref())
    .bind(filter.min_price)
    .bind(filter.max_price)
    .fetch_one(pool)
    .await?;

    let products = attach_variations(pool, rows).await?;
    let total_pages = (total + filter.limit - 1) / filter.limit;

    Ok(ProductPage {
        products,
        total,
        page: filter.page,
        limit: filter.limit,
        total_pages,
    })
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Create a product, optionally with embedded variations, as one atomic
/// operation.
///
/// Variations are inserted first (ids collected in submission order), the
/// product row is inserted with `variation_refs` set, and the new
/// variations' `product_id` is backfilled by id-set membership. A failure at
/// any step rolls the whole operation back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn create_product(
    pool: &PgPool,
    input: &NewProduct,
) -> Result<ProductWithVariations, DbError> {
    let mut tx = pool.begin().await?;

    let mut refs: Vec<i64> = Vec::new();
    if let Some(variations) = &input.variations {
        for variation in variations {
            let row = insert_variation(&mut tx, variation, None).await?;
            refs.push(row.id);
        }
    }

    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products \
             (name, image, variation_refs, price, description, rating, is_new, \
              brand, category, model_number, base_price, available_sizes, tags, \
              is_featured, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING id, name, image, variation_refs, price, description, rating, is_new, \
                   brand, category, model_number, base_price, available_sizes, tags, \
                   is_featured, is_active, created_at, updated_at",
    )
    .bind(&input.name)
    .bind(&input.image)
    .bind(&refs)
    .bind(input.data.price)
    .bind(&input.data.description)
    .bind(input.data.rating)
    .bind(input.data.is_new)
    .bind(&input.data.brand)
    .bind(&input.data.category)
    .bind(&input.data.model_number)
    .bind(input.base_price)
    .bind(&input.available_sizes)
    .bind(&input.tags)
    .bind(input.is_featured)
    .bind(input.is_active)
    .fetch_one(&mut *tx)
    .await?;

    if !refs.is_empty() {
        sqlx::query(
            "UPDATE product_variations \
             SET product_id = $1, updated_at = NOW() \
             WHERE id = ANY($2)",
        )
        .bind(row.id)
        .bind(&refs)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    attach_one(pool, row).await
}

/// Apply a sparse update to a product as one atomic operation.
///
/// If `patch.variations` is present (an empty list counts as present), every
/// current variation is deleted and the supplied payloads are created fresh —
/// a full replace that assigns new identities even to payloads identical to
/// the old records. Remaining fields follow the two-level merge: top-level
/// `Some` fields overlay the stored row, then the nested `data` patch merges
/// field-by-field via [`ProductData::merged`].
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `patch.id`, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn update_product(
    pool: &PgPool,
    patch: &ProductPatch,
) -> Result<ProductWithVariations, DbError> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, image, variation_refs, price, description, rating, is_new, \
                brand, category, model_number, base_price, available_sizes, tags, \
                is_featured, is_active, created_at, updated_at \
         FROM products \
         WHERE id = $1 \
         FOR UPDATE",
    )
    .bind(patch.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let variation_refs = match &patch.variations {
        Some(replacement) => {
            if !existing.variation_refs.is_empty() {
                sqlx::query("DELETE FROM product_variations WHERE id = ANY($1)")
                    .bind(&existing.variation_refs)
                    .execute(&mut *tx)
                    .await?;
            }

            let mut refs = Vec::with_capacity(replacement.len());
            for variation in replacement {
                let row = insert_variation(&mut tx, variation, Some(existing.id)).await?;
                refs.push(row.id);
            }
            refs
        }
        None => existing.variation_refs.clone(),
    };

    let data = match &patch.data {
        Some(data_patch) => existing.data().merged(data_patch),
        None => existing.data(),
    };

    let row = sqlx::query_as::<_, ProductRow>(
        "UPDATE products \
         SET name = $2, image = $3, variation_refs = $4, price = $5, description = $6, \
             rating = $7, is_new = $8, brand = $9, category = $10, model_number = $11, \
             base_price = $12, available_sizes = $13, tags = $14, is_featured = $15, \
             is_active = $16, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, image, variation_refs, price, description, rating, is_new, \
                   brand, category, model_number, base_price, available_sizes, tags, \
                   is_featured, is_active, created_at, updated_at",
    )
    .bind(existing.id)
    .bind(patch.name.as_deref().unwrap_or(&existing.name))
    .bind(patch.image.as_deref().unwrap_or(&existing.image))
    .bind(&variation_refs)
    .bind(data.price)
    .bind(&data.description)
    .bind(data.rating)
    .bind(data.is_new)
    .bind(&data.brand)
    .bind(&data.category)
    .bind(&data.model_number)
    .bind(patch.base_price.unwrap_or(existing.base_price))
    .bind(patch.available_sizes.as_ref().unwrap_or(&existing.available_sizes))
    .bind(patch.tags.as_ref().unwrap_or(&existing.tags))
    .bind(patch.is_featured.unwrap_or(existing.is_featured))
    .bind(patch.is_active.unwrap_or(existing.is_active))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    attach_one(pool, row).await
}

/// Delete a product and every variation it references, atomically.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn delete_product(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let refs: Vec<i64> =
        sqlx::query_scalar("SELECT variation_refs FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

    if !refs.is_empty() {
        sqlx::query("DELETE FROM product_variations WHERE id = ANY($1)")
            .bind(&refs)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Offline tests; live property tests are in tests/live.rs.
// ---------------------------------------------------------------------------
