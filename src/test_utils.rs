//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{allocation::AllocationDraft, auth, catalog, income, ledger, period::Period},
    entities::{self, BucketType},
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Lowest bcrypt cost, keeps hashing fast in tests.
pub const TEST_PASSWORD_COST: u32 = 4;

/// Password given to every user made by [`create_test_user`].
pub const TEST_PASSWORD: &str = "password123";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The month most tests work in: March 2024.
pub fn test_period() -> Period {
    Period::from_year_month(2024, 3).unwrap_or_else(Period::current)
}

/// Registers a user with [`TEST_PASSWORD`].
pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<entities::UserModel> {
    auth::register_user(db, username, TEST_PASSWORD, TEST_PASSWORD_COST).await
}

/// Creates a bucket.
pub async fn create_test_bucket(
    db: &DatabaseConnection,
    name: &str,
    bucket_type: BucketType,
) -> Result<entities::BucketModel> {
    catalog::create_bucket(db, name, bucket_type).await
}

/// Creates a category owned by `user_id`.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
    bucket_id: i64,
    user_id: i64,
) -> Result<entities::CategoryModel> {
    catalog::create_category(db, name, bucket_id, user_id).await
}

/// A database with one user, an income bucket holding "Salary" and a spendable
/// bucket holding "Food", "Rent" and "Transport".
pub struct BudgetFixture {
    /// The database
    pub db: DatabaseConnection,
    /// The user owning every category
    pub user: entities::UserModel,
    /// "Income" bucket
    pub income_bucket: entities::BucketModel,
    /// "Essentials" bucket
    pub spendable: entities::BucketModel,
    /// Income category
    pub salary: entities::CategoryModel,
    /// Spendable category
    pub food: entities::CategoryModel,
    /// Spendable category
    pub rent: entities::CategoryModel,
    /// Spendable category
    pub transport: entities::CategoryModel,
}

/// Builds a [`BudgetFixture`] on a fresh database.
pub async fn setup_budget_fixture() -> Result<BudgetFixture> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "test_user").await?;
    let income_bucket = create_test_bucket(&db, "Income", BucketType::Income).await?;
    let spendable = create_test_bucket(&db, "Essentials", BucketType::Spendable).await?;

    let salary = create_test_category(&db, "Salary", income_bucket.id, user.id).await?;
    let food = create_test_category(&db, "Food", spendable.id, user.id).await?;
    let rent = create_test_category(&db, "Rent", spendable.id, user.id).await?;
    let transport = create_test_category(&db, "Transport", spendable.id, user.id).await?;

    Ok(BudgetFixture {
        db,
        user,
        income_bucket,
        spendable,
        salary,
        food,
        rent,
        transport,
    })
}

/// Records a salary line with no debt, so gross and net are both `net_income`.
pub async fn create_test_income(
    db: &DatabaseConnection,
    fixture: &BudgetFixture,
    period: Period,
    net_income: i64,
) -> Result<entities::IncomeModel> {
    income::record_income(
        db,
        fixture.user.id,
        period,
        fixture.salary.id,
        Decimal::from(net_income),
        Decimal::ZERO,
    )
    .await
}

/// Writes an allocation row of `amount` (price `amount`, quantity 1) straight to the ledger.
pub async fn create_test_allocation(
    db: &DatabaseConnection,
    fixture: &BudgetFixture,
    category_id: i64,
    period: Period,
    amount: i64,
) -> Result<entities::TransactionModel> {
    let draft = AllocationDraft {
        category_id,
        price: Decimal::from(amount),
        quantity: 1,
        amount: Decimal::from(amount),
    };
    ledger::insert_allocation(db, &draft, period, fixture.user.id).await
}

/// Records an expense of `amount` on `date`.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    user_id: i64,
    category_id: i64,
    date: NaiveDate,
    amount: i64,
) -> Result<entities::TransactionModel> {
    crate::core::expense::record_expense(
        db,
        user_id,
        crate::core::expense::NewExpense {
            transaction_date: date,
            description: "Test expense".to_string(),
            amount: Decimal::from(amount),
            category_id,
            location_id: None,
        },
    )
    .await
}
