use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{product, size};
use crate::errors::ServiceError;
use crate::models::slug::slugify;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

/// Live catalog data the cart needs to render a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariationSummary {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
}

/// Input for creating or updating a product variation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariationDraft {
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// `None` or zero falls back to the product's base price
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub variation_image_url: Option<String>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Variation fields after normalization, ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedVariation {
    pub color: String,
    pub description: String,
    pub sku: String,
    pub slug: String,
    pub price_cents: i64,
    pub stock: i32,
    pub variation_image_url: Option<String>,
    pub discount: Decimal,
    pub featured: bool,
    pub is_active: bool,
    /// Every other variation of the product must drop its featured flag
    pub unfeature_siblings: bool,
}

/// Generated SKU: `{product_id}-{size}-{hex without #}-{5 random hex chars}`
pub fn generate_sku(product_id: Uuid, size_name: &str, color: &str) -> String {
    let uid = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}-{}",
        product_id,
        size_name,
        color.trim_start_matches('#'),
        &uid[..5]
    )
}

/// Applies the write-path rules for a variation: SKU generation, default
/// price, stock-driven activation and the single featured flag per product.
pub fn normalize_variation(
    draft: VariationDraft,
    product: &product::Model,
    size: &size::Model,
    has_featured_sibling: bool,
) -> Result<NormalizedVariation, ServiceError> {
    let color = draft.color.trim().to_string();
    if !HEX_COLOR_RE.is_match(&color) {
        return Err(ServiceError::ValidationError(format!(
            "'{}' is not a hex color like #1A2B3C",
            draft.color
        )));
    }
    if draft.stock < 0 {
        return Err(ServiceError::ValidationError(
            "stock cannot be negative".to_string(),
        ));
    }
    if draft.discount < Decimal::ZERO || draft.discount >= Decimal::ONE_HUNDRED {
        return Err(ServiceError::ValidationError(
            "discount must be between 0 and 100 percent".to_string(),
        ));
    }

    let sku = match draft.sku.map(|s| s.trim().to_string()) {
        Some(sku) if !sku.is_empty() => sku,
        _ => generate_sku(product.id, &size.name, &color),
    };

    let price_cents = match draft.price_cents {
        Some(price) if price > 0 => price,
        Some(price) if price < 0 => {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ))
        }
        _ => product.base_price_cents,
    };

    let featured = draft.featured || !has_featured_sibling;

    Ok(NormalizedVariation {
        slug: slugify(&sku),
        color,
        description: draft.description,
        sku,
        price_cents,
        stock: draft.stock,
        variation_image_url: draft.variation_image_url,
        discount: draft.discount,
        featured,
        is_active: draft.is_active && draft.stock > 0,
        unfeature_siblings: draft.featured,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn product(base_price_cents: i64) -> product::Model {
        let now = Utc::now();
        product::Model {
            id: Uuid::new_v4(),
            name: "Oxford Shirt".into(),
            category_id: Uuid::new_v4(),
            brand_id: Uuid::new_v4(),
            slug: "oxford-shirt".into(),
            description: String::new(),
            base_image_url: None,
            base_price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn size(name: &str) -> size::Model {
        size::Model {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    fn draft(color: &str, stock: i32) -> VariationDraft {
        VariationDraft {
            color: color.into(),
            stock,
            is_active: true,
            ..Default::default()
        }
    }

    #[test]
    fn generates_sku_and_slug() {
        let p = product(2500);
        let n = normalize_variation(draft("#A1B2C3", 3), &p, &size("XL"), true).unwrap();

        let prefix = format!("{}-XL-A1B2C3-", p.id);
        assert!(n.sku.starts_with(&prefix), "sku was {}", n.sku);
        assert_eq!(n.sku.len(), prefix.len() + 5);
        assert_eq!(n.slug, slugify(&n.sku));
    }

    #[test]
    fn keeps_explicit_sku() {
        let mut d = draft("#A1B2C3", 3);
        d.sku = Some("OX-XL-BLUE".into());
        let n = normalize_variation(d, &product(100), &size("XL"), true).unwrap();
        assert_eq!(n.sku, "OX-XL-BLUE");
        assert_eq!(n.slug, "ox-xl-blue");
    }

    #[test]
    fn price_defaults_to_product_base() {
        let p = product(4200);
        let n = normalize_variation(draft("#000000", 1), &p, &size("M"), true).unwrap();
        assert_eq!(n.price_cents, 4200);

        let mut d = draft("#000000", 1);
        d.price_cents = Some(0);
        let n = normalize_variation(d, &p, &size("M"), true).unwrap();
        assert_eq!(n.price_cents, 4200);

        let mut d = draft("#000000", 1);
        d.price_cents = Some(3900);
        let n = normalize_variation(d, &p, &size("M"), true).unwrap();
        assert_eq!(n.price_cents, 3900);
    }

    #[test]
    fn zero_stock_forces_inactive() {
        let n = normalize_variation(draft("#000000", 0), &product(100), &size("M"), true).unwrap();
        assert!(!n.is_active);

        let n = normalize_variation(draft("#000000", 2), &product(100), &size("M"), true).unwrap();
        assert!(n.is_active);
    }

    #[test]
    fn featured_rules() {
        // first variation of a product becomes featured
        let n = normalize_variation(draft("#000000", 1), &product(100), &size("M"), false).unwrap();
        assert!(n.featured);
        assert!(!n.unfeature_siblings);

        // non-featured draft next to a featured sibling stays plain
        let n = normalize_variation(draft("#000000", 1), &product(100), &size("M"), true).unwrap();
        assert!(!n.featured);

        // explicit featured steals the flag
        let mut d = draft("#000000", 1);
        d.featured = true;
        let n = normalize_variation(d, &product(100), &size("M"), true).unwrap();
        assert!(n.featured);
        assert!(n.unfeature_siblings);
    }

    #[test]
    fn rejects_bad_input() {
        let p = product(100);
        assert!(normalize_variation(draft("blue", 1), &p, &size("M"), true).is_err());
        assert!(normalize_variation(draft("#000000", -1), &p, &size("M"), true).is_err());

        let mut d = draft("#000000", 1);
        d.discount = dec!(100);
        assert!(normalize_variation(d, &p, &size("M"), true).is_err());
    }
}
