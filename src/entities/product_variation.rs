use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::money::cents_to_decimal;

/// A purchasable unit of a product, distinguished by size and color.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    /// Hex color, e.g. `#1A2B3C`
    pub color: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub price_cents: i64,
    pub stock: i32,
    pub variation_image_url: Option<String>,
    /// Percentage off, 0 means no discount
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount: Decimal,
    pub featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::size::Entity",
        from = "Column::SizeId",
        to = "super::size::Column::Id"
    )]
    Size,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Size.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn has_discount(&self) -> bool {
        !self.discount.is_zero()
    }

    /// Price after discount in whole cents (fractions truncated). This is the
    /// amount captured into a cart when the variation is first added.
    pub fn effective_price_cents(&self) -> i64 {
        if !self.has_discount() {
            return self.price_cents;
        }
        let discounted =
            Decimal::from(self.price_cents) * (Decimal::ONE_HUNDRED - self.discount)
                / Decimal::ONE_HUNDRED;
        discounted.trunc().to_i64().unwrap_or(self.price_cents)
    }

    /// Discounted price rounded to cents, `None` when there is no discount
    pub fn price_after(&self) -> Option<Decimal> {
        if !self.has_discount() {
            return None;
        }
        let discounted = self.price_without() * (Decimal::ONE_HUNDRED - self.discount)
            / Decimal::ONE_HUNDRED;
        Some(discounted.round_dp(2))
    }

    pub fn price_without(&self) -> Decimal {
        cents_to_decimal(self.price_cents)
    }

    pub fn display_name(&self, product_name: &str, size_name: &str) -> String {
        format!("{} - {} - {}", product_name, self.color, size_name)
    }

    /// Variation image, falling back to the product's base image
    pub fn image_url(&self, product_base_image: Option<&str>) -> Option<String> {
        self.variation_image_url
            .clone()
            .or_else(|| product_base_image.map(str::to_string))
    }

    /// Other active variations of the same product sharing this color
    pub fn same_colors<'a>(&self, siblings: &'a [Model]) -> Vec<&'a Model> {
        siblings
            .iter()
            .filter(|v| {
                v.id != self.id
                    && v.product_id == self.product_id
                    && v.color == self.color
                    && v.is_active
            })
            .collect()
    }

    /// One active variation per other color of the same product: the
    /// earliest created one, ties broken by id.
    pub fn other_color_variations<'a>(&self, siblings: &'a [Model]) -> Vec<&'a Model> {
        let mut by_color: BTreeMap<&str, &'a Model> = BTreeMap::new();
        for v in siblings.iter().filter(|v| {
            v.product_id == self.product_id && v.is_active && v.color != self.color
        }) {
            by_color
                .entry(v.color.as_str())
                .and_modify(|current| {
                    if (v.created_at, v.id) < (current.created_at, current.id) {
                        *current = v;
                    }
                })
                .or_insert(v);
        }
        by_color.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn variation(color: &str, price_cents: i64, discount: Decimal) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            size_id: Uuid::nil(),
            color: color.to_string(),
            slug: "slug".into(),
            description: String::new(),
            sku: "sku".into(),
            price_cents,
            stock: 5,
            variation_image_url: None,
            discount,
            featured: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn undiscounted_prices() {
        let v = variation("#000000", 1999, Decimal::ZERO);
        assert!(!v.has_discount());
        assert_eq!(v.effective_price_cents(), 1999);
        assert_eq!(v.price_after(), None);
        assert_eq!(v.price_without(), dec!(19.99));
    }

    #[test]
    fn discount_truncates_snapshot_and_rounds_display() {
        let v = variation("#000000", 1999, dec!(15));
        // 1999 * 0.85 = 1699.15
        assert_eq!(v.effective_price_cents(), 1699);
        assert_eq!(v.price_after(), Some(dec!(16.99)));
    }

    #[test]
    fn image_falls_back_to_product() {
        let mut v = variation("#000000", 100, Decimal::ZERO);
        assert_eq!(v.image_url(None), None);
        assert_eq!(v.image_url(Some("base.png")).as_deref(), Some("base.png"));
        v.variation_image_url = Some("own.png".into());
        assert_eq!(v.image_url(Some("base.png")).as_deref(), Some("own.png"));
    }

    #[test]
    fn color_siblings() {
        let me = variation("#FF0000", 100, Decimal::ZERO);
        let same = variation("#FF0000", 100, Decimal::ZERO);
        let mut inactive_same = variation("#FF0000", 100, Decimal::ZERO);
        inactive_same.is_active = false;
        let blue_first = variation("#0000FF", 100, Decimal::ZERO);
        let mut blue_later = variation("#0000FF", 100, Decimal::ZERO);
        blue_later.created_at = blue_first.created_at + chrono::Duration::seconds(5);

        let all = vec![
            me.clone(),
            same.clone(),
            inactive_same,
            blue_later,
            blue_first.clone(),
        ];

        let same_colors = me.same_colors(&all);
        assert_eq!(same_colors.len(), 1);
        assert_eq!(same_colors[0].id, same.id);

        let others = me.other_color_variations(&all);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, blue_first.id);
    }
}
