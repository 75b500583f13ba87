//! Catalog product records as consumed by the cart and wishlist.
//!
//! The catalog itself is owned by the content API; these are the read-only
//! shapes the storefront receives and snapshots.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A product reference as served by the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// URL handle (slug).
    #[serde(default)]
    pub handle: String,
    /// Current catalog price in the store currency.
    pub price: Decimal,
    /// Primary image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Create a product with an empty handle and no image.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            handle: String::new(),
            price,
            image_url: None,
        }
    }
}

/// The (size, color) selection distinguishing otherwise identical items.
///
/// Either half may be absent for products without that option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl VariantKey {
    #[must_use]
    pub fn new(size: Option<&str>, color: Option<&str>) -> Self {
        Self {
            size: size.map(str::to_owned),
            color: color.map(str::to_owned),
        }
    }

    /// Whether neither option is set.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.size.is_none() && self.color.is_none()
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.size, &self.color) {
            (Some(size), Some(color)) => write!(f, "{size} / {color}"),
            (Some(only), None) | (None, Some(only)) => f.write_str(only),
            (None, None) => f.write_str("Default"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_wire_format_is_camel_case() {
        let mut product = Product::new("tee-1", "Tee", Decimal::new(1999, 2));
        product.image_url = Some("https://cdn.example/tee.jpg".to_string());

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["id"], "tee-1");
        assert_eq!(json["imageUrl"], "https://cdn.example/tee.jpg");
    }

    #[test]
    fn test_product_accepts_missing_optional_fields() {
        let product: Product =
            serde_json::from_str(r#"{"id":"mug","title":"Mug","price":"8.50"}"#).unwrap();
        assert_eq!(product.price, Decimal::new(850, 2));
        assert!(product.handle.is_empty());
        assert!(product.image_url.is_none());
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(VariantKey::new(Some("M"), Some("Red")).to_string(), "M / Red");
        assert_eq!(VariantKey::new(None, Some("Red")).to_string(), "Red");
        assert_eq!(VariantKey::default().to_string(), "Default");
        assert!(VariantKey::default().is_default());
    }
}
