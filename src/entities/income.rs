//! Income entity - the `fact_income` income statement lines.
//!
//! The sum of `net_income` over a month is the ceiling budget allocations are validated against.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Income statement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fact_income")]
pub struct Model {
    /// Unique identifier for the income line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// First day of the month the income belongs to
    pub income_date: Date,
    /// Income category (inside an `Income` bucket)
    pub category_id: i64,
    /// Owning user
    pub user_id: i64,
    /// Income before debt
    pub gross_income: Decimal,
    /// Share of the month's maturity debt paid from this income
    pub paid_debt: Decimal,
    /// `gross_income - paid_debt`
    pub net_income: Decimal,
    /// When the line was recorded
    pub created_time: DateTimeUtc,
    /// Last modification
    pub updated_time: DateTimeUtc,
}

/// Defines relationships between Income and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each income line belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// Each income line belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
