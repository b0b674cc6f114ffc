//! Budget validation and the save-allocations flow.

use crate::{
    core::{
        allocation::{DesiredAllocations, reconcile},
        income, ledger,
        ledger::SaveReport,
        period::Period,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::{info, warn};

/// Where a month's total allocation stands against its net income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    /// No positive net income: nothing can be allocated
    Unfunded,
    /// Allocations are larger than net income
    Exceeded {
        /// How much the total is over
        overage: Decimal,
    },
    /// Allocations fit; the percentage is informational
    WithinBudget {
        /// `total / net_income * 100`
        percentage_used: Decimal,
    },
}

impl BudgetStatus {
    /// Converts the blocking states into errors.
    pub fn ensure_savable(self, period: Period, total: Decimal, net_income: Decimal) -> Result<()> {
        match self {
            Self::Unfunded => Err(Error::BudgetUnfunded {
                period: period.start(),
            }),
            Self::Exceeded { .. } => Err(Error::BudgetExceeded { total, net_income }),
            Self::WithinBudget { .. } => Ok(()),
        }
    }
}

/// Classifies `total_allocated` against `net_income`. A total equal to net income is
/// within budget at exactly 100%.
#[must_use]
pub fn validate(total_allocated: Decimal, net_income: Decimal) -> BudgetStatus {
    if net_income <= Decimal::ZERO {
        return BudgetStatus::Unfunded;
    }
    if total_allocated > net_income {
        return BudgetStatus::Exceeded {
            overage: total_allocated - net_income,
        };
    }
    BudgetStatus::WithinBudget {
        percentage_used: total_allocated / net_income * Decimal::ONE_HUNDRED,
    }
}

/// Persists `desired` as the allocations of `user_id` for `period`.
///
/// The existing rows are fetched, reconciled against `desired`, and the total the
/// ledger would hold afterwards is validated against the month's net income. Only
/// then is the plan written, one row at a time. Row failures do not abort the
/// batch; they come back in the report.
pub async fn save_allocations<C>(
    db: &C,
    user_id: i64,
    period: Period,
    desired: &DesiredAllocations,
) -> Result<SaveReport>
where
    C: ConnectionTrait,
{
    let net_income = income::total_net_income(db, user_id, period).await?;
    let existing = ledger::fetch_allocations(db, user_id, period).await?;
    let plan = reconcile(desired, &existing);

    let total = plan
        .projected_total(&existing)
        .inspect_err(|e| warn!("Rejected allocation save for user {user_id} ({period}): {e}"))?;
    let status = validate(total, net_income);
    if let Err(e) = status.ensure_savable(period, total, net_income) {
        warn!("Rejected allocation save for user {user_id} ({period}): {e}");
        return Err(e);
    }

    if plan.is_empty() {
        info!("Nothing to save for user {user_id} ({period})");
        return Ok(SaveReport::default());
    }

    Ok(ledger::apply_plan(db, &plan, period, user_id).await)
}
