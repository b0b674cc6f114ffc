//! Income statements and debt payments.
//!
//! Each income statement line records gross income, debt paid out of it and the
//! resulting net income for one income category in one month. The sum of a month's
//! net income is the ceiling the budget validator checks allocations against.

use crate::{
    core::{allocation::checked_sum, catalog, period::Period},
    entities::{BucketType, Income, TransactionAction, income, transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Name of the category debt payments are booked against.
pub const DEBT_PAYMENT_CATEGORY: &str = "Emergency";

/// Description stamped on every debt payment row.
pub const DEBT_PAYMENT_DESCRIPTION: &str = "Maturity Debt Payment";

/// Records one income statement line for `period`.
///
/// `category_id` must be one of the user's income categories. Net income is derived as
/// `gross_income - paid_debt`, so paid debt may not exceed gross income.
pub async fn record_income<C>(
    db: &C,
    user_id: i64,
    period: Period,
    category_id: i64,
    gross_income: Decimal,
    paid_debt: Decimal,
) -> Result<income::Model>
where
    C: ConnectionTrait,
{
    if gross_income < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: gross_income,
        });
    }
    if paid_debt < Decimal::ZERO || paid_debt > gross_income {
        return Err(Error::InvalidAmount { amount: paid_debt });
    }

    catalog::require_category(db, category_id, user_id, BucketType::Income).await?;

    let now = Utc::now();
    let line = income::ActiveModel {
        income_date: Set(period.start()),
        category_id: Set(category_id),
        user_id: Set(user_id),
        gross_income: Set(gross_income),
        paid_debt: Set(paid_debt),
        net_income: Set(gross_income - paid_debt),
        created_time: Set(now),
        updated_time: Set(now),
        ..Default::default()
    };
    let result = line.insert(db).await?;

    info!(
        "Recorded income for user {} ({}): gross {}, debt {}, net {}",
        user_id, period, result.gross_income, result.paid_debt, result.net_income
    );
    Ok(result)
}

/// Retrieves the income statement lines of `user_id` for `period`.
pub async fn list_income<C>(db: &C, user_id: i64, period: Period) -> Result<Vec<income::Model>>
where
    C: ConnectionTrait,
{
    Income::find()
        .filter(income::Column::UserId.eq(user_id))
        .filter(income::Column::IncomeDate.gte(period.start()))
        .filter(income::Column::IncomeDate.lt(period.end()))
        .order_by_asc(income::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Total net income of `user_id` for `period`. Zero when nothing was recorded.
pub async fn total_net_income<C>(db: &C, user_id: i64, period: Period) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let lines = list_income(db, user_id, period).await?;
    checked_sum(lines.iter().map(|line| line.net_income))
}

/// Books a debt payment for `period` against the user's emergency category.
pub async fn record_debt_payment<C>(
    db: &C,
    user_id: i64,
    period: Period,
    amount: Decimal,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }

    let category = catalog::find_category_by_name(db, DEBT_PAYMENT_CATEGORY, user_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: DEBT_PAYMENT_CATEGORY.to_string(),
        })?;

    let row = transaction::ActiveModel {
        transaction_date: Set(period.start()),
        description: Set(DEBT_PAYMENT_DESCRIPTION.to_string()),
        amount: Set(amount),
        category_id: Set(category.id),
        action_id: Set(TransactionAction::DebtPayment),
        user_id: Set(user_id),
        location_id: Set(None),
        price: Set(None),
        quantity: Set(None),
        updated_time: Set(Utc::now()),
        ..Default::default()
    };
    let result = row.insert(db).await?;

    info!("Recorded debt payment of {amount} for user {user_id} ({period})");
    Ok(result)
}
