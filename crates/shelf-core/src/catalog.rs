//! Catalog domain types shared by the db layer and the HTTP surface.
//!
//! The patch types encode the update contract in the type system: a `Some`
//! field overlays the stored value, an absent field keeps it, and the nested
//! `data` object merges field-by-field via [`ProductData::merged`] instead of
//! being replaced wholesale.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The nested attribute object carried by every product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub price: Decimal,
    pub description: String,
    /// 0–5; the range itself is enforced by a database CHECK.
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default)]
    pub is_new: bool,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub model_number: Option<String>,
}

impl ProductData {
    /// Overlay `patch` onto `self` field-by-field.
    ///
    /// Fields the patch omits keep their stored value; this is the nested
    /// half of the two-level product merge. An update that only carries
    /// `data.price` must never wipe `data.description`.
    #[must_use]
    pub fn merged(&self, patch: &ProductDataPatch) -> ProductData {
        ProductData {
            price: patch.price.unwrap_or(self.price),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            rating: patch.rating.unwrap_or(self.rating),
            is_new: patch.is_new.unwrap_or(self.is_new),
            brand: patch.brand.clone().or_else(|| self.brand.clone()),
            category: patch.category.clone().or_else(|| self.category.clone()),
            model_number: patch
                .model_number
                .clone()
                .or_else(|| self.model_number.clone()),
        }
    }
}

/// One entry of a variation's per-size stock list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeAvailability {
    pub size: String,
    pub stock: i32,
    #[serde(default)]
    pub price_adjustment: Decimal,
}

/// Payload for creating a variation, standalone or embedded in a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariation {
    pub color_name: String,
    /// Hex-like color reference, e.g. `#f7997c`.
    pub color_code: String,
    #[serde(default)]
    pub variation_images: Vec<String>,
    pub main_image: String,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub size_availability: Vec<SizeAvailability>,
}

/// Payload for creating a product, optionally with embedded variations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub image: String,
    pub data: ProductData,
    pub base_price: Decimal,
    #[serde(default)]
    pub available_sizes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub variations: Option<Vec<NewVariation>>,
}

/// Sparse product update. The target id travels in the body, matching the
/// `PUT /update/product` wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub id: i64,
    pub name: Option<String>,
    pub image: Option<String>,
    pub data: Option<ProductDataPatch>,
    pub base_price: Option<Decimal>,
    pub available_sizes: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    /// `Some` (even an empty list) replaces the entire variation set with
    /// freshly created records; `None` leaves the variations untouched.
    pub variations: Option<Vec<NewVariation>>,
}

/// Sparse overlay for the nested `data` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDataPatch {
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub rating: Option<Decimal>,
    pub is_new: Option<bool>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub model_number: Option<String>,
}

/// Sparse variation update. `product_id` is deliberately absent: re-homing a
/// variation would desynchronize the owner's `variation_refs`, and the
/// update-variation operation never touches the owning product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationPatch {
    pub color_name: Option<String>,
    pub color_code: Option<String>,
    pub variation_images: Option<Vec<String>>,
    pub main_image: Option<String>,
    pub stock_quantity: Option<i32>,
    pub is_available: Option<bool>,
    pub size_availability: Option<Vec<SizeAvailability>>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_data() -> ProductData {
        ProductData {
            price: Decimal::new(1000, 2),
            description: "x".to_string(),
            rating: Decimal::new(45, 1),
            is_new: true,
            brand: Some("Acme".to_string()),
            category: Some("sneakers".to_string()),
            model_number: None,
        }
    }

    #[test]
    fn merged_keeps_fields_the_patch_omits() {
        let patch = ProductDataPatch {
            price: Some(Decimal::new(2000, 2)),
            ..ProductDataPatch::default()
        };

        let merged = base_data().merged(&patch);

        assert_eq!(merged.price, Decimal::new(2000, 2));
        assert_eq!(merged.description, "x", "untouched nested field lost");
        assert_eq!(merged.rating, Decimal::new(45, 1));
        assert!(merged.is_new);
        assert_eq!(merged.brand.as_deref(), Some("Acme"));
        assert_eq!(merged.category.as_deref(), Some("sneakers"));
    }

    #[test]
    fn merged_overlays_every_supplied_field() {
        let patch = ProductDataPatch {
            price: Some(Decimal::ONE),
            description: Some("y".to_string()),
            rating: Some(Decimal::ZERO),
            is_new: Some(false),
            brand: Some("Other".to_string()),
            category: Some("boots".to_string()),
            model_number: Some("M-1".to_string()),
        };

        let merged = base_data().merged(&patch);

        assert_eq!(merged.description, "y");
        assert!(!merged.is_new);
        assert_eq!(merged.brand.as_deref(), Some("Other"));
        assert_eq!(merged.model_number.as_deref(), Some("M-1"));
    }

    #[test]
    fn product_data_defaults_rating_and_is_new() {
        let data: ProductData =
            serde_json::from_str(r#"{"price":"10.00","description":"d"}"#).expect("deserialize");
        assert_eq!(data.rating, Decimal::ZERO);
        assert!(!data.is_new);
        assert!(data.brand.is_none());
    }

    #[test]
    fn new_variation_defaults() {
        let v: NewVariation = serde_json::from_str(
            r##"{"colorName":"Red","colorCode":"#ff0000","mainImage":"red.png"}"##,
        )
        .expect("deserialize");
        assert_eq!(v.stock_quantity, 0);
        assert!(v.is_available);
        assert!(v.variation_images.is_empty());
        assert!(v.size_availability.is_empty());
    }

    #[test]
    fn size_availability_defaults_price_adjustment() {
        let entry: SizeAvailability =
            serde_json::from_str(r#"{"size":"M","stock":3}"#).expect("deserialize");
        assert_eq!(entry.price_adjustment, Decimal::ZERO);
    }

    #[test]
    fn product_patch_distinguishes_absent_and_empty_variations() {
        let absent: ProductPatch = serde_json::from_str(r#"{"id":1}"#).expect("deserialize");
        assert!(absent.variations.is_none());

        let empty: ProductPatch =
            serde_json::from_str(r#"{"id":1,"variations":[]}"#).expect("deserialize");
        assert_eq!(empty.variations.map(|v| v.len()), Some(0));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_string(&SizeAvailability {
            size: "M".to_string(),
            stock: 5,
            price_adjustment: Decimal::new(150, 2),
        })
        .expect("serialize");
        assert!(json.contains("\"priceAdjustment\":\"1.50\""), "{json}");

        let patch: ProductDataPatch =
            serde_json::from_str(r#"{"modelNumber":"MN-9","isNew":true}"#).expect("deserialize");
        assert_eq!(patch.model_number.as_deref(), Some("MN-9"));
        assert_eq!(patch.is_new, Some(true));
    }
}
