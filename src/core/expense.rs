//! Expense recording.

use crate::{
    core::{catalog, period::Period},
    entities::{BucketType, Transaction, TransactionAction, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// A purchase as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewExpense {
    /// When the money was spent
    pub transaction_date: NaiveDate,
    /// What it was for
    pub description: String,
    /// How much, strictly positive
    pub amount: Decimal,
    /// Spendable category it is charged to
    pub category_id: i64,
    /// Where it was spent, if recorded
    pub location_id: Option<i64>,
}

/// Records an expense for `user_id`.
///
/// The category must be one of the user's spendable categories and the location, when
/// given, one of the user's locations.
pub async fn record_expense<C>(db: &C, user_id: i64, expense: NewExpense) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let description = expense.description.trim();
    if description.is_empty() {
        return Err(Error::MissingField {
            field: "description".to_string(),
        });
    }
    if expense.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: expense.amount,
        });
    }

    catalog::require_category(db, expense.category_id, user_id, BucketType::Spendable).await?;

    if let Some(location_id) = expense.location_id {
        if catalog::get_location_for_user(db, location_id, user_id)
            .await?
            .is_none()
        {
            return Err(Error::LocationNotFound {
                name: location_id.to_string(),
            });
        }
    }

    let row = transaction::ActiveModel {
        transaction_date: Set(expense.transaction_date),
        description: Set(description.to_string()),
        amount: Set(expense.amount),
        category_id: Set(expense.category_id),
        action_id: Set(TransactionAction::Expense),
        user_id: Set(user_id),
        location_id: Set(expense.location_id),
        price: Set(None),
        quantity: Set(None),
        updated_time: Set(Utc::now()),
        ..Default::default()
    };
    let result = row.insert(db).await?;

    info!(
        "Recorded expense {} of {} in category {} for user {}",
        result.id, result.amount, result.category_id, user_id
    );
    Ok(result)
}

/// Retrieves the expenses of `user_id` dated inside `period`, newest first.
pub async fn list_expenses<C>(db: &C, user_id: i64, period: Period) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::ActionId.eq(TransactionAction::Expense))
        .filter(transaction::Column::TransactionDate.gte(period.start()))
        .filter(transaction::Column::TransactionDate.lt(period.end()))
        .order_by_desc(transaction::Column::TransactionDate)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Date of the user's most recent expense, if any.
pub async fn latest_transaction_date<C>(db: &C, user_id: i64) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    let latest = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::ActionId.eq(TransactionAction::Expense))
        .order_by_desc(transaction::Column::TransactionDate)
        .limit(1)
        .one(db)
        .await?;
    Ok(latest.map(|row| row.transaction_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::create_location;
    use crate::test_utils::*;

    fn expense(category_id: i64, date: NaiveDate, amount: i64) -> NewExpense {
        NewExpense {
            transaction_date: date,
            description: "Groceries".to_string(),
            amount: Decimal::from(amount),
            category_id,
            location_id: None,
        }
    }

    #[tokio::test]
    async fn test_record_expense() -> Result<()> {
        let fixture = setup_budget_fixture().await?;
        let market = create_location(&fixture.db, "Market", fixture.user.id).await?;
        let date = test_period().start() + chrono::Days::new(4);

        let mut input = expense(fixture.food.id, date, 42_000);
        input.location_id = Some(market.id);
        let row = record_expense(&fixture.db, fixture.user.id, input).await?;

        assert_eq!(row.action_id, TransactionAction::Expense);
        assert_eq!(row.location_id, Some(market.id));
        assert_eq!(row.transaction_date, date);
        assert_eq!(row.price, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_expense_validation() -> Result<()> {
        let fixture = setup_budget_fixture().await?;
        let date = test_period().start();

        let mut blank = expense(fixture.food.id, date, 10);
        blank.description = "  ".to_string();
        assert!(matches!(
            record_expense(&fixture.db, fixture.user.id, blank).await,
            Err(Error::MissingField { .. })
        ));

        assert!(matches!(
            record_expense(&fixture.db, fixture.user.id, expense(fixture.food.id, date, 0)).await,
            Err(Error::InvalidAmount { .. })
        ));

        assert!(matches!(
            record_expense(&fixture.db, fixture.user.id, expense(fixture.salary.id, date, 10)).await,
            Err(Error::CategoryNotFound { .. })
        ));

        let other = create_test_user(&fixture.db, "other").await?;
        let foreign = create_location(&fixture.db, "Elsewhere", other.id).await?;
        let mut input = expense(fixture.food.id, date, 10);
        input.location_id = Some(foreign.id);
        assert!(matches!(
            record_expense(&fixture.db, fixture.user.id, input).await,
            Err(Error::LocationNotFound { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_expenses_and_latest_date() -> Result<()> {
        let fixture = setup_budget_fixture().await?;
        let period = test_period();

        assert_eq!(latest_transaction_date(&fixture.db, fixture.user.id).await?, None);

        let early = period.start();
        let late = period.start() + chrono::Days::new(20);
        let next_month = period.next().start() + chrono::Days::new(2);
        record_expense(&fixture.db, fixture.user.id, expense(fixture.food.id, early, 10)).await?;
        record_expense(&fixture.db, fixture.user.id, expense(fixture.food.id, late, 20)).await?;
        record_expense(&fixture.db, fixture.user.id, expense(fixture.food.id, next_month, 30)).await?;

        let listed = list_expenses(&fixture.db, fixture.user.id, period).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].transaction_date, late);

        assert_eq!(
            latest_transaction_date(&fixture.db, fixture.user.id).await?,
            Some(next_month)
        );
        Ok(())
    }
}
