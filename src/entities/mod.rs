//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities mirror the logical schema: `dim_*` reference tables and the
//! `fact_transaction` / `fact_income` ledgers.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bucket;
pub mod category;
pub mod income;
pub mod location;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use bucket::{BucketType, Column as BucketColumn, Entity as Bucket, Model as BucketModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use income::{Column as IncomeColumn, Entity as Income, Model as IncomeModel};
pub use location::{Column as LocationColumn, Entity as Location, Model as LocationModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
    TransactionAction,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
