use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::entities::product_variation;
use crate::errors::ServiceError;
use crate::models::catalog::VariationSummary;
use crate::models::money::cents_to_decimal;

/// One cart entry as stored in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub id: Uuid,
    /// Price captured when the variation was first added
    pub price_cents: i64,
    pub quantity: i64,
}

impl CartEntry {
    pub fn total_cents(&self) -> i64 {
        self.price_cents * self.quantity
    }
}

/// A cart entry enriched with live catalog data for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub quantity: i64,
    pub price_cents: i64,
    pub price: Decimal,
    pub total: Decimal,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub product_slug: Option<String>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}

/// Session-resident shopping cart keyed by stringified variation id.
///
/// Every mutation sets the modified flag so callers know the session needs
/// to be written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCart {
    entries: BTreeMap<String, CartEntry>,
    #[serde(skip)]
    modified: bool,
}

impl SessionCart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` of `variation`, or sets it when `update_quantity` is
    /// true. A resulting quantity of zero or less drops the entry. Setting a
    /// quantity above stock, or growing an entry past it, fails and leaves the
    /// cart untouched. Shrinking by a delta is always allowed.
    pub fn add(
        &mut self,
        variation: &product_variation::Model,
        quantity: i64,
        update_quantity: bool,
    ) -> Result<(), ServiceError> {
        let key = variation.id.to_string();
        let current = self.entries.get(&key).map(|e| e.quantity).unwrap_or(0);
        let next = if update_quantity {
            quantity
        } else {
            current + quantity
        };

        let stock = i64::from(variation.stock);
        let over_stock = if update_quantity {
            next > stock
        } else {
            next > current && next > stock
        };
        if over_stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} left in stock for {}",
                variation.stock.max(0),
                variation.sku
            )));
        }

        if next <= 0 {
            self.entries.remove(&key);
        } else {
            self.entries
                .entry(key)
                .and_modify(|entry| entry.quantity = next)
                .or_insert_with(|| CartEntry {
                    id: variation.id,
                    price_cents: variation.effective_price_cents(),
                    quantity: next,
                });
        }
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, variation_id: Uuid) {
        self.entries.remove(&variation_id.to_string());
        self.modified = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.modified = true;
    }

    pub fn get(&self, variation_id: Uuid) -> Option<&CartEntry> {
        self.entries.get(&variation_id.to_string())
    }

    pub fn entries(&self) -> impl Iterator<Item = &CartEntry> {
        self.entries.values()
    }

    pub fn variation_ids(&self) -> Vec<Uuid> {
        self.entries.values().map(|e| e.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of units across all entries
    pub fn len(&self) -> i64 {
        self.entries.values().map(|e| e.quantity).sum()
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.entries.values().map(CartEntry::total_cents).sum()
    }

    pub fn total_cost(&self) -> Decimal {
        cents_to_decimal(self.subtotal_cents())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Enriches entries with live catalog data. Entries whose variation no
    /// longer exists keep their snapshot values with empty display fields.
    pub fn hydrate(&self, summaries: &[VariationSummary]) -> Vec<CartLine> {
        let by_id: HashMap<Uuid, &VariationSummary> =
            summaries.iter().map(|s| (s.id, s)).collect();

        self.entries
            .values()
            .map(|entry| {
                let live = by_id.get(&entry.id);
                CartLine {
                    id: entry.id,
                    quantity: entry.quantity,
                    price_cents: entry.price_cents,
                    price: cents_to_decimal(entry.price_cents),
                    total: cents_to_decimal(entry.total_cents()),
                    name: live.map(|s| s.product_name.clone()),
                    slug: live.map(|s| s.slug.clone()),
                    product_slug: live.map(|s| s.product_slug.clone()),
                    image_url: live.and_then(|s| s.image_url.clone()),
                    stock: live.map(|s| s.stock),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn variation(price_cents: i64, stock: i32) -> product_variation::Model {
        let now = Utc::now();
        product_variation::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            size_id: Uuid::new_v4(),
            color: "#112233".into(),
            slug: "v".into(),
            description: String::new(),
            sku: "SKU-1".into(),
            price_cents,
            stock,
            variation_image_url: None,
            discount: Decimal::ZERO,
            featured: true,
            is_active: stock > 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn set_then_increment_then_zero_removes() {
        let a = variation(250, 10);
        let mut cart = SessionCart::new();

        cart.add(&a, 2, true).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total_cost(), dec!(5.00));

        cart.add(&a, 3, false).unwrap();
        assert_eq!(cart.get(a.id).unwrap().quantity, 5);

        cart.add(&a, 0, true).unwrap();
        assert_eq!(cart.len(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn decrement_to_zero_removes_entry() {
        let a = variation(100, 3);
        let mut cart = SessionCart::new();
        cart.add(&a, 1, false).unwrap();
        cart.add(&a, -1, false).unwrap();
        assert!(cart.get(a.id).is_none());
    }

    #[test]
    fn exceeding_stock_fails_without_mutation() {
        let a = variation(100, 4);
        let mut cart = SessionCart::new();
        cart.add(&a, 3, true).unwrap();
        let before = cart.clone();

        assert_matches!(
            cart.add(&a, 2, false),
            Err(ServiceError::InsufficientStock(_))
        );
        assert_matches!(
            cart.add(&a, 5, true),
            Err(ServiceError::InsufficientStock(_))
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn shrinking_is_allowed_even_when_stock_dropped() {
        let mut a = variation(100, 5);
        let mut cart = SessionCart::new();
        cart.add(&a, 5, true).unwrap();
        a.stock = 1;
        cart.add(&a, -1, false).unwrap();
        assert_eq!(cart.len(), 4);
    }

    #[test]
    fn setting_above_stock_fails_even_below_current_quantity() {
        let mut a = variation(100, 5);
        let mut cart = SessionCart::new();
        cart.add(&a, 5, true).unwrap();
        a.stock = 3;
        let before = cart.clone();

        assert_matches!(
            cart.add(&a, 4, true),
            Err(ServiceError::InsufficientStock(_))
        );
        assert_eq!(cart, before);

        cart.add(&a, 3, true).unwrap();
        assert_eq!(cart.len(), 3);
    }

    #[test]
    fn snapshot_price_survives_catalog_change() {
        let mut a = variation(1000, 10);
        let mut cart = SessionCart::new();
        cart.add(&a, 1, true).unwrap();
        a.price_cents = 5000;
        cart.add(&a, 1, false).unwrap();
        assert_eq!(cart.get(a.id).unwrap().price_cents, 1000);
        assert_eq!(cart.subtotal_cents(), 2000);
    }

    #[test]
    fn discount_is_captured_in_snapshot() {
        let mut a = variation(1000, 10);
        a.discount = dec!(25);
        let mut cart = SessionCart::new();
        cart.add(&a, 2, true).unwrap();
        assert_eq!(cart.subtotal_cents(), 1500);
    }

    #[test]
    fn remove_and_clear_mark_modified() {
        let a = variation(100, 10);
        let mut cart = SessionCart::new();
        assert!(!cart.is_modified());

        cart.remove(a.id);
        assert!(cart.is_modified());

        let mut cart = SessionCart::new();
        cart.add(&a, 1, false).unwrap();
        cart.clear();
        assert!(cart.is_modified());
        assert_eq!(cart.total_cost(), Decimal::ZERO);
    }

    #[test]
    fn wire_shape_is_a_plain_map() {
        let a = variation(199, 10);
        let mut cart = SessionCart::new();
        cart.add(&a, 2, true).unwrap();

        let json = serde_json::to_value(&cart).unwrap();
        let entry = &json[a.id.to_string()];
        assert_eq!(entry["price_cents"], 199);
        assert_eq!(entry["quantity"], 2);
        assert_eq!(entry["id"], a.id.to_string());

        let restored: SessionCart = serde_json::from_value(json).unwrap();
        assert!(!restored.is_modified());
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn hydrate_uses_snapshot_totals_and_tolerates_missing_rows() {
        let a = variation(300, 10);
        let b = variation(700, 10);
        let mut cart = SessionCart::new();
        cart.add(&a, 2, true).unwrap();
        cart.add(&b, 1, true).unwrap();

        let summaries = vec![VariationSummary {
            id: a.id,
            product_id: a.product_id,
            product_name: "Linen Shirt".into(),
            product_slug: "linen-shirt".into(),
            slug: "linen-shirt-m".into(),
            image_url: Some("a.png".into()),
            price_cents: 9999,
            stock: 10,
        }];

        let lines = cart.hydrate(&summaries);
        assert_eq!(lines.len(), 2);
        let line_a = lines.iter().find(|l| l.id == a.id).unwrap();
        assert_eq!(line_a.name.as_deref(), Some("Linen Shirt"));
        assert_eq!(line_a.total, dec!(6.00));
        let line_b = lines.iter().find(|l| l.id == b.id).unwrap();
        assert!(line_b.name.is_none());
        assert_eq!(line_b.total, dec!(7.00));
    }

    proptest! {
        #[test]
        fn length_and_total_track_net_quantities(ops in prop::collection::vec((0usize..3, -3i64..5), 0..40)) {
            let variations = [variation(125, 1_000), variation(990, 1_000), variation(1, 1_000)];
            let mut cart = SessionCart::new();
            let mut expected = [0i64; 3];

            for (idx, delta) in ops {
                cart.add(&variations[idx], delta, false).unwrap();
                expected[idx] = (expected[idx] + delta).max(0);
            }

            prop_assert_eq!(cart.len(), expected.iter().sum::<i64>());
            prop_assert!(cart.entries().all(|e| e.quantity > 0));
            let cents: i64 = expected
                .iter()
                .zip(variations.iter())
                .map(|(q, v)| q * v.price_cents)
                .sum();
            prop_assert_eq!(cart.total_cost(), cents_to_decimal(cents));
        }
    }
}
