//! Report generation business logic.
//!
//! This module builds the budget-versus-spend report for a month and summaries of
//! allocations, either as persisted or as currently drafted in a session. All
//! functions return structured data; rendering is left to the caller.

use crate::{
    core::{
        allocation::{DesiredAllocations, checked_sum},
        budget::{BudgetStatus, validate},
        expense, income, ledger,
        period::Period,
    },
    entities::{Bucket, Category, category},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Label used for rows whose category no longer resolves.
const UNKNOWN: &str = "Unknown";

/// How a category's spending compares to its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingStatus {
    /// Less than 70% used
    OnTrack,
    /// 70% up to 90% used
    Caution,
    /// 90% up to and including 100% used
    Critical,
    /// More than allocated
    OverBudget,
}

impl SpendingStatus {
    /// Classifies a usage percentage.
    #[must_use]
    pub fn from_usage(percent_used: Decimal) -> Self {
        if percent_used < Decimal::from(70) {
            Self::OnTrack
        } else if percent_used < Decimal::from(90) {
            Self::Caution
        } else if percent_used <= Decimal::ONE_HUNDRED {
            Self::Critical
        } else {
            Self::OverBudget
        }
    }
}

/// Usage reported when spending cannot be expressed as a share of the budget.
const OVERSPENT: Decimal = Decimal::from_parts(101, 0, 0, false, 0);

/// Calculates how much of `budget` has been spent, as a percentage.
///
/// A zero budget counts as over budget once anything is spent against it, and so does
/// a ratio too large to represent.
#[must_use]
pub fn calculate_usage(spent: Decimal, budget: Decimal) -> Decimal {
    if budget <= Decimal::ZERO {
        return if spent > Decimal::ZERO {
            OVERSPENT
        } else {
            Decimal::ZERO
        };
    }
    spent
        .checked_div(budget)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(OVERSPENT, |percent| percent.round_dp(2))
}

/// Adds `amount` to the running total kept for `key`.
fn accumulate<K: Ord>(totals: &mut BTreeMap<K, Decimal>, key: K, amount: Decimal) -> Result<()> {
    let total = totals.entry(key).or_default();
    *total = checked_sum([*total, amount])?;
    Ok(())
}

/// One category in the budget report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetLine {
    /// Category id
    pub category_id: i64,
    /// Category name
    pub category_name: String,
    /// Bucket name
    pub bucket_name: String,
    /// Allocated for the month
    pub budget: Decimal,
    /// Spent in the month
    pub spent: Decimal,
    /// `budget - spent`, negative when overspent
    pub remaining: Decimal,
    /// `spent / budget * 100`
    pub percent_used: Decimal,
    /// Band of `percent_used`
    pub status: SpendingStatus,
}

/// Budget against actual spending for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetReport {
    /// The month reported on
    pub period: Period,
    /// Net income ceiling
    pub net_income: Decimal,
    /// Sum of all allocations
    pub total_allocated: Decimal,
    /// Sum of all expenses in allocated categories
    pub total_spent: Decimal,
    /// Allocation total against net income
    pub budget_status: BudgetStatus,
    /// One line per allocated category, ordered by bucket then category
    pub lines: Vec<BudgetLine>,
}

/// Names of a category and its bucket.
#[derive(Debug, Clone)]
struct CategoryLabel {
    category_name: String,
    bucket_name: String,
}

async fn category_labels<C>(db: &C, user_id: i64) -> Result<HashMap<i64, CategoryLabel>>
where
    C: ConnectionTrait,
{
    let rows = Category::find()
        .filter(category::Column::UserId.eq(user_id))
        .find_also_related(Bucket)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(category, bucket)| {
            (
                category.id,
                CategoryLabel {
                    category_name: category.category_name,
                    bucket_name: bucket.map_or_else(|| UNKNOWN.to_string(), |b| b.bucket_name),
                },
            )
        })
        .collect())
}

fn label_for(labels: &HashMap<i64, CategoryLabel>, category_id: i64) -> CategoryLabel {
    labels.get(&category_id).cloned().unwrap_or_else(|| CategoryLabel {
        category_name: UNKNOWN.to_string(),
        bucket_name: UNKNOWN.to_string(),
    })
}

/// Builds the budget-versus-spend report of `user_id` for `period`.
///
/// Only categories with an allocation in the month get a line. Spending in categories
/// without an allocation is not part of the report.
pub async fn budget_report<C>(db: &C, user_id: i64, period: Period) -> Result<BudgetReport>
where
    C: ConnectionTrait,
{
    let net_income = income::total_net_income(db, user_id, period).await?;
    let allocations = ledger::fetch_allocations(db, user_id, period).await?;
    let expenses = expense::list_expenses(db, user_id, period).await?;
    let labels = category_labels(db, user_id).await?;

    let mut budgets: BTreeMap<i64, Decimal> = BTreeMap::new();
    for allocation in &allocations {
        accumulate(&mut budgets, allocation.category_id, allocation.amount)?;
    }

    let mut spending: BTreeMap<i64, Decimal> = BTreeMap::new();
    for row in &expenses {
        accumulate(&mut spending, row.category_id, row.amount)?;
    }

    let mut lines: Vec<BudgetLine> = budgets
        .into_iter()
        .map(|(category_id, budget)| {
            let spent = spending.get(&category_id).copied().unwrap_or_default();
            let percent_used = calculate_usage(spent, budget);
            let label = label_for(&labels, category_id);
            BudgetLine {
                category_id,
                category_name: label.category_name,
                bucket_name: label.bucket_name,
                budget,
                spent,
                remaining: budget - spent,
                percent_used,
                status: SpendingStatus::from_usage(percent_used),
            }
        })
        .collect();
    lines.sort_by(|a, b| {
        a.bucket_name
            .cmp(&b.bucket_name)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });

    let total_allocated = checked_sum(lines.iter().map(|line| line.budget))?;
    let total_spent = checked_sum(lines.iter().map(|line| line.spent))?;

    Ok(BudgetReport {
        period,
        net_income,
        total_allocated,
        total_spent,
        budget_status: validate(total_allocated, net_income),
        lines,
    })
}

/// What the allocation distribution is grouped by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// One slice per bucket
    #[default]
    Bucket,
    /// One slice per category
    Category,
}

/// One allocation with its names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationRow {
    /// Bucket name
    pub bucket_name: String,
    /// Category id
    pub category_id: i64,
    /// Category name
    pub category_name: String,
    /// Unit price
    pub price: Decimal,
    /// Units
    pub quantity: i64,
    /// Allocated amount
    pub amount: Decimal,
}

/// A slice of the distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionSlice {
    /// Bucket or category name
    pub label: String,
    /// Sum of the amounts in the slice
    pub amount: Decimal,
    /// Share of the grand total, in percent
    pub share: Decimal,
}

/// Allocation table plus its distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationSummary {
    /// Rows ordered by bucket then category
    pub rows: Vec<AllocationRow>,
    /// Sum of every row
    pub grand_total: Decimal,
    /// `grand_total` as shown to the user, e.g. `1,250,000`
    pub grand_total_display: String,
    /// Grouping used for `distribution`
    pub group_by: GroupBy,
    /// Slices ordered by label
    pub distribution: Vec<DistributionSlice>,
}

/// Totals `rows` and groups them into distribution slices.
///
/// # Errors
/// `InvalidAmount` when a total does not fit in a `Decimal`.
pub fn summarize(mut rows: Vec<AllocationRow>, group_by: GroupBy) -> Result<AllocationSummary> {
    rows.sort_by(|a, b| {
        a.bucket_name
            .cmp(&b.bucket_name)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });

    let grand_total = checked_sum(rows.iter().map(|row| row.amount))?;

    let mut groups: BTreeMap<&str, Decimal> = BTreeMap::new();
    for row in &rows {
        let label = match group_by {
            GroupBy::Bucket => row.bucket_name.as_str(),
            GroupBy::Category => row.category_name.as_str(),
        };
        accumulate(&mut groups, label, row.amount)?;
    }

    let distribution = groups
        .into_iter()
        .map(|(label, amount)| DistributionSlice {
            label: label.to_string(),
            amount,
            share: if grand_total.is_zero() {
                Decimal::ZERO
            } else {
                (amount / grand_total * Decimal::ONE_HUNDRED).round_dp(2)
            },
        })
        .collect();

    Ok(AllocationSummary {
        rows,
        grand_total,
        grand_total_display: format_amount(grand_total),
        group_by,
        distribution,
    })
}

/// Summarizes the persisted allocations of `user_id` for `period`.
pub async fn allocation_summary<C>(
    db: &C,
    user_id: i64,
    period: Period,
    group_by: GroupBy,
) -> Result<AllocationSummary>
where
    C: ConnectionTrait,
{
    let allocations = ledger::fetch_allocations(db, user_id, period).await?;
    let labels = category_labels(db, user_id).await?;

    let rows = allocations
        .into_iter()
        .map(|allocation| {
            let label = label_for(&labels, allocation.category_id);
            AllocationRow {
                bucket_name: label.bucket_name,
                category_id: allocation.category_id,
                category_name: label.category_name,
                price: allocation.price,
                quantity: allocation.quantity,
                amount: allocation.amount,
            }
        })
        .collect();

    summarize(rows, group_by)
}

/// Summarizes drafts that have not been saved yet.
pub async fn draft_summary<C>(
    db: &C,
    user_id: i64,
    drafts: &DesiredAllocations,
    group_by: GroupBy,
) -> Result<AllocationSummary>
where
    C: ConnectionTrait,
{
    let labels = category_labels(db, user_id).await?;

    let rows = drafts
        .iter()
        .map(|draft| {
            let label = label_for(&labels, draft.category_id);
            AllocationRow {
                bucket_name: label.bucket_name,
                category_id: draft.category_id,
                category_name: label.category_name,
                price: draft.price,
                quantity: draft.quantity,
                amount: draft.amount,
            }
        })
        .collect();

    summarize(rows, group_by)
}

/// Formats an amount rounded to a whole number with thousands separators,
/// e.g. `1,250,000`.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}
