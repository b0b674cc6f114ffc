//! Bucket entity - static reference data grouping categories.
//!
//! A bucket is either an `Income` bucket (its categories receive income statement
//! lines) or a `Spendable` bucket (its categories receive budget allocations and expenses).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of money a bucket holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum BucketType {
    /// Salary, side income and similar sources
    #[sea_orm(string_value = "Income")]
    Income,
    /// Anything money can be allocated to and spent from
    #[sea_orm(string_value = "Spendable")]
    Spendable,
}

/// Bucket database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_bucket")]
pub struct Model {
    /// Unique identifier for the bucket
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Essentials", "Income")
    #[sea_orm(unique)]
    pub bucket_name: String,
    /// Whether the bucket holds income or spendable categories
    pub bucket_type: BucketType,
}

/// Defines relationships between Bucket and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One bucket groups many categories
    #[sea_orm(has_many = "super::category::Entity")]
    Categories,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
