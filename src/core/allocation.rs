//! Budget allocation reconciliation.
//!
//! A user edits a month's allocations in memory (the *desired* set, keyed by category).
//! Saving turns those edits into the smallest list of ledger writes that makes the
//! persisted rows match: categories without a row are inserted, categories with a row
//! are updated. Rows for categories the user did not touch are left alone; clearing an
//! allocation means staging a zero amount for it, never deleting the row.
//!
//! Everything here is pure. Fetching the existing rows and issuing the writes belongs
//! to [`crate::core::ledger`].

use crate::{
    entities::transaction,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How the user expressed an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationInput {
    /// `amount = price * quantity`
    Priced {
        /// Unit cost
        price: Decimal,
        /// Number of units
        quantity: i64,
    },
    /// `amount = percent / 100 * net_income`
    Percentage {
        /// Share of the month's net income, 0-100
        percent: Decimal,
    },
}

impl AllocationInput {
    /// True when the input carries nothing to allocate (both price and quantity are
    /// zero, or a zero percentage). Such inputs are never staged.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match *self {
            Self::Priced { price, quantity } => price.is_zero() && quantity == 0,
            Self::Percentage { percent } => percent.is_zero(),
        }
    }

    /// Resolves the input into a draft for `category_id`.
    ///
    /// Percentages are recorded as a single unit priced at the computed amount.
    pub fn into_draft(self, category_id: i64, net_income: Decimal) -> Result<AllocationDraft> {
        match self {
            Self::Priced { price, quantity } => {
                if price < Decimal::ZERO {
                    return Err(Error::InvalidAmount { amount: price });
                }
                if quantity < 0 {
                    return Err(Error::InvalidAmount {
                        amount: Decimal::from(quantity),
                    });
                }
                let amount = price
                    .checked_mul(Decimal::from(quantity))
                    .ok_or(Error::InvalidAmount { amount: price })?;
                Ok(AllocationDraft {
                    category_id,
                    price,
                    quantity,
                    amount,
                })
            }
            Self::Percentage { percent } => {
                if percent < Decimal::ZERO {
                    return Err(Error::InvalidAmount { amount: percent });
                }
                let amount = percent
                    .checked_mul(net_income)
                    .ok_or(Error::InvalidAmount { amount: percent })?
                    / Decimal::ONE_HUNDRED;
                Ok(AllocationDraft {
                    category_id,
                    price: amount,
                    quantity: 1,
                    amount,
                })
            }
        }
    }
}

/// One category's allocation as the user wants it to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDraft {
    /// Category the money is planned for
    pub category_id: i64,
    /// Unit cost
    pub price: Decimal,
    /// Number of units
    pub quantity: i64,
    /// Planned spend for the month
    pub amount: Decimal,
}

/// An allocation row already stored in the ledger for the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAllocation {
    /// Ledger row id
    pub transaction_id: i64,
    /// Category the row belongs to
    pub category_id: i64,
    /// Unit cost, zero for rows written without one
    pub price: Decimal,
    /// Number of units, zero for rows written without one
    pub quantity: i64,
    /// Planned spend
    pub amount: Decimal,
    /// Audit note written with the row
    pub description: String,
}

impl From<transaction::Model> for PersistedAllocation {
    fn from(model: transaction::Model) -> Self {
        Self {
            transaction_id: model.id,
            category_id: model.category_id,
            price: model.price.unwrap_or_default(),
            quantity: model.quantity.unwrap_or_default(),
            amount: model.amount,
            description: model.description,
        }
    }
}

/// The desired set: at most one draft per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredAllocations {
    drafts: BTreeMap<i64, AllocationDraft>,
}

impl DesiredAllocations {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `draft`, replacing any earlier draft for the same category.
    pub fn insert(&mut self, draft: AllocationDraft) {
        self.drafts.insert(draft.category_id, draft);
    }

    /// Resolves `input` and stages it for `category_id`.
    ///
    /// Blank inputs are not staged and drop any earlier draft for the category.
    /// Returns whether a draft is now staged.
    pub fn stage(
        &mut self,
        category_id: i64,
        input: AllocationInput,
        net_income: Decimal,
    ) -> Result<bool> {
        if input.is_blank() {
            self.drafts.remove(&category_id);
            return Ok(false);
        }
        let draft = input.into_draft(category_id, net_income)?;
        self.insert(draft);
        Ok(true)
    }

    /// Drops the draft for `category_id`, returning it if one was staged.
    pub fn remove(&mut self, category_id: i64) -> Option<AllocationDraft> {
        self.drafts.remove(&category_id)
    }

    /// Draft staged for `category_id`.
    #[must_use]
    pub fn get(&self, category_id: i64) -> Option<&AllocationDraft> {
        self.drafts.get(&category_id)
    }

    /// True when `category_id` has a staged draft.
    #[must_use]
    pub fn contains(&self, category_id: i64) -> bool {
        self.drafts.contains_key(&category_id)
    }

    /// Number of staged drafts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    /// True when nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Drafts ordered by category id.
    pub fn iter(&self) -> impl Iterator<Item = &AllocationDraft> {
        self.drafts.values()
    }

    /// Sum of all staged amounts.
    ///
    /// # Errors
    /// `InvalidAmount` when the sum does not fit in a `Decimal`.
    pub fn total(&self) -> Result<Decimal> {
        checked_sum(self.drafts.values().map(|d| d.amount))
    }

    /// Drops every staged draft.
    pub fn clear(&mut self) {
        self.drafts.clear();
    }
}

impl FromIterator<AllocationDraft> for DesiredAllocations {
    fn from_iter<I: IntoIterator<Item = AllocationDraft>>(iter: I) -> Self {
        let mut desired = Self::new();
        for draft in iter {
            desired.insert(draft);
        }
        desired
    }
}

/// An update for an existing ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationUpdate {
    /// Ledger row to overwrite
    pub transaction_id: i64,
    /// New values
    pub draft: AllocationDraft,
}

/// The writes needed to make the ledger match the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Drafts for categories with no row yet
    pub to_insert: Vec<AllocationDraft>,
    /// Drafts for categories that already have a row
    pub to_update: Vec<AllocationUpdate>,
}

impl ReconciliationPlan {
    /// True when the plan writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty()
    }

    /// Number of single-row writes the plan performs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_insert.len() + self.to_update.len()
    }

    /// What the period's allocations will add up to once the plan is applied:
    /// inserted amounts, updated amounts, plus every row the plan does not touch.
    ///
    /// # Errors
    /// `InvalidAmount` when the total does not fit in a `Decimal`.
    pub fn projected_total(&self, existing: &[PersistedAllocation]) -> Result<Decimal> {
        let updated: HashSet<i64> = self.to_update.iter().map(|u| u.transaction_id).collect();
        let untouched = existing
            .iter()
            .filter(|row| !updated.contains(&row.transaction_id))
            .map(|row| row.amount);
        let inserted = self.to_insert.iter().map(|d| d.amount);
        let rewritten = self.to_update.iter().map(|u| u.draft.amount);
        checked_sum(untouched.chain(inserted).chain(rewritten))
    }
}

/// Adds up money amounts, failing instead of overflowing.
///
/// # Errors
/// `InvalidAmount` carrying `Decimal::MAX` when the sum is out of range.
pub fn checked_sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or(Error::InvalidAmount {
            amount: Decimal::MAX,
        })
}

/// Diffs the desired set against the rows already persisted for the same user and period.
///
/// Matching is by category only. Every matching row is re-sent as an update even when
/// its values are unchanged. If the ledger holds more than one row for a category, each
/// of them receives the draft. Rows whose category is not in `desired` appear in neither
/// output.
#[must_use]
pub fn reconcile(
    desired: &DesiredAllocations,
    existing: &[PersistedAllocation],
) -> ReconciliationPlan {
    let persisted: HashSet<i64> = existing.iter().map(|row| row.category_id).collect();

    let to_insert = desired
        .iter()
        .filter(|draft| !persisted.contains(&draft.category_id))
        .cloned()
        .collect();

    let to_update = existing
        .iter()
        .filter_map(|row| {
            desired.get(row.category_id).map(|draft| AllocationUpdate {
                transaction_id: row.transaction_id,
                draft: draft.clone(),
            })
        })
        .collect();

    ReconciliationPlan {
        to_insert,
        to_update,
    }
}
