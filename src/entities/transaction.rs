//! Transaction entity - the `fact_transaction` ledger.
//!
//! One table stores three kinds of rows, told apart by `action_id`: budget allocations
//! (planned spend for a category in a month), expenses, and debt payments.
//! `price` and `quantity` are only populated for allocation rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a ledger row represents. Stored as the numeric action id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum TransactionAction {
    /// Planned spend for a category in a budget month
    #[sea_orm(num_value = 3)]
    BudgetAllocation,
    /// Money actually spent
    #[sea_orm(num_value = 4)]
    Expense,
    /// Maturity debt paid out of the month's income
    #[sea_orm(num_value = 5)]
    DebtPayment,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fact_transaction")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Booking date; the first day of the month for allocations and debt payments
    pub transaction_date: Date,
    /// Free text audit note
    pub description: String,
    /// Always non-negative; meaning depends on `action_id`
    pub amount: Decimal,
    /// Category the money is booked against
    pub category_id: i64,
    /// Kind of row
    pub action_id: TransactionAction,
    /// Owning user
    pub user_id: i64,
    /// Where an expense happened, if recorded
    pub location_id: Option<i64>,
    /// Unit cost an allocation was computed from
    pub price: Option<Decimal>,
    /// Number of units an allocation was computed from
    pub quantity: Option<i64>,
    /// Last insert or update
    pub updated_time: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// Each transaction belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Expenses may reference a location
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
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

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
