//! Allocation ledger - budget allocation rows in `fact_transaction`.
//!
//! Every write here is a single-row statement on its own pooled connection. A save
//! applies its plan row by row with no surrounding transaction, so a failure part way
//! through leaves the earlier rows written. [`apply_plan`] therefore reports each row's
//! outcome instead of failing the whole batch.

use crate::{
    core::{
        allocation::{AllocationDraft, PersistedAllocation, ReconciliationPlan},
        period::Period,
    },
    entities::{Transaction, TransactionAction, transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Retrieves the allocation rows of `user_id` for `period`, oldest first.
pub async fn fetch_allocations<C>(
    db: &C,
    user_id: i64,
    period: Period,
) -> Result<Vec<PersistedAllocation>>
where
    C: ConnectionTrait,
{
    let rows = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::ActionId.eq(TransactionAction::BudgetAllocation))
        .filter(transaction::Column::TransactionDate.gte(period.start()))
        .filter(transaction::Column::TransactionDate.lt(period.end()))
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(PersistedAllocation::from).collect())
}

/// Writes a new allocation row dated on the first day of `period`.
pub async fn insert_allocation<C>(
    db: &C,
    draft: &AllocationDraft,
    period: Period,
    user_id: i64,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let row = transaction::ActiveModel {
        transaction_date: Set(period.start()),
        description: Set(format!(
            "Allocation calculated from price {} and quantity {}",
            draft.price, draft.quantity
        )),
        amount: Set(draft.amount),
        category_id: Set(draft.category_id),
        action_id: Set(TransactionAction::BudgetAllocation),
        user_id: Set(user_id),
        location_id: Set(None),
        price: Set(Some(draft.price)),
        quantity: Set(Some(draft.quantity)),
        updated_time: Set(Utc::now()),
        ..Default::default()
    };

    let inserted = row.insert(db).await?;
    debug!(
        "Inserted allocation {} for category {} ({})",
        inserted.id, draft.category_id, draft.amount
    );
    Ok(inserted)
}

/// Overwrites the amount, price and quantity of an existing allocation row.
///
/// Fails with `AllocationNotFound` if the id is unknown or is not an allocation row.
pub async fn update_allocation<C>(
    db: &C,
    transaction_id: i64,
    draft: &AllocationDraft,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let existing = Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::ActionId.eq(TransactionAction::BudgetAllocation))
        .one(db)
        .await?
        .ok_or(Error::AllocationNotFound { transaction_id })?;

    let mut row: transaction::ActiveModel = existing.into();
    row.amount = Set(draft.amount);
    row.price = Set(Some(draft.price));
    row.quantity = Set(Some(draft.quantity));
    row.description = Set(format!(
        "Allocation updated to price {} and quantity {}",
        draft.price, draft.quantity
    ));
    row.updated_time = Set(Utc::now());

    let updated = row.update(db).await?;
    debug!(
        "Updated allocation {} for category {} ({})",
        transaction_id, draft.category_id, draft.amount
    );
    Ok(updated)
}

/// Which write a failed row was part of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOperation {
    /// A new allocation row
    Insert,
    /// An update of an existing row
    Update,
}

/// A row of the plan that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAllocation {
    /// Category the row was for
    pub category_id: i64,
    /// Insert or update
    pub operation: LedgerOperation,
    /// Existing row id for updates
    pub transaction_id: Option<i64>,
    /// Human-readable cause
    pub error: String,
}

/// Outcome of applying a reconciliation plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Rows created, in plan order
    pub inserted: Vec<PersistedAllocation>,
    /// Rows overwritten, in plan order
    pub updated: Vec<PersistedAllocation>,
    /// Rows that failed; earlier successes are not rolled back
    pub failed: Vec<FailedAllocation>,
}

impl SaveReport {
    /// True when every row of the plan was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies `plan` one row at a time: inserts first, then updates.
///
/// A failing row is logged and recorded in the report; the remaining rows are still attempted.
pub async fn apply_plan<C>(
    db: &C,
    plan: &ReconciliationPlan,
    period: Period,
    user_id: i64,
) -> SaveReport
where
    C: ConnectionTrait,
{
    let mut report = SaveReport::default();

    for draft in &plan.to_insert {
        match insert_allocation(db, draft, period, user_id).await {
            Ok(row) => report.inserted.push(row.into()),
            Err(e) => {
                warn!(
                    "Failed to insert allocation for category {} ({period}): {e}",
                    draft.category_id
                );
                report.failed.push(FailedAllocation {
                    category_id: draft.category_id,
                    operation: LedgerOperation::Insert,
                    transaction_id: None,
                    error: e.to_string(),
                });
            }
        }
    }

    for update in &plan.to_update {
        match update_allocation(db, update.transaction_id, &update.draft).await {
            Ok(row) => report.updated.push(row.into()),
            Err(e) => {
                warn!(
                    "Failed to update allocation {} for category {} ({period}): {e}",
                    update.transaction_id, update.draft.category_id
                );
                report.failed.push(FailedAllocation {
                    category_id: update.draft.category_id,
                    operation: LedgerOperation::Update,
                    transaction_id: Some(update.transaction_id),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Applied allocation plan for user {user_id} ({period}): {} inserted, {} updated, {} failed",
        report.inserted.len(),
        report.updated.len(),
        report.failed.len()
    );
    report
}
