use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::money::cents_to_decimal;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub category_id: Uuid,
    pub brand_id: Uuid,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    pub base_image_url: Option<String>,
    pub base_price_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::brand::Entity",
        from = "Column::BrandId",
        to = "super::brand::Column::Id"
    )]
    Brand,
    #[sea_orm(has_many = "super::product_variation::Entity")]
    Variations,
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::brand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brand.def()
    }
}

impl Related<super::product_variation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variations.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Base price in currency units
    pub fn base_price(&self) -> Decimal {
        cents_to_decimal(self.base_price_cents)
    }

    /// The featured variation among `variations` (expected to be this product's)
    pub fn featured<'a>(
        &self,
        variations: &'a [super::product_variation::Model],
    ) -> Option<&'a super::product_variation::Model> {
        variations
            .iter()
            .find(|v| v.product_id == self.id && v.featured)
    }

    /// True when any variation can currently be bought
    pub fn is_active_now(&self, variations: &[super::product_variation::Model]) -> bool {
        variations
            .iter()
            .any(|v| v.product_id == self.id && v.is_active)
    }

    /// True when any variation carries a discount
    pub fn on_sale(&self, variations: &[super::product_variation::Model]) -> bool {
        variations
            .iter()
            .any(|v| v.product_id == self.id && v.has_discount())
    }
}
