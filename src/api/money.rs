//! Income statements, debt payments and expenses.

use crate::{
    api::{AppState, CurrentSession, PeriodQuery},
    core::{
        allocation::checked_sum,
        catalog,
        expense::{self, NewExpense},
        income,
        period::Period,
    },
    entities::{CategoryModel, IncomeModel, TransactionModel},
    errors::Result,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A month's income statement.
#[derive(Debug, Serialize)]
pub struct IncomeStatement {
    /// The month
    pub period: Period,
    /// Recorded lines
    pub lines: Vec<IncomeModel>,
    /// Sum of the lines' net income
    pub total_net_income: Decimal,
}

/// GET /api/income
pub async fn list_income(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<IncomeStatement>> {
    let period = query.or_session(&session);
    let lines = income::list_income(&state.db, session.user_id(), period).await?;
    let total_net_income = checked_sum(lines.iter().map(|line| line.net_income))?;
    Ok(Json(IncomeStatement {
        period,
        lines,
        total_net_income,
    }))
}

/// GET /api/income/categories
pub async fn list_income_categories(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<Vec<CategoryModel>>> {
    Ok(Json(
        catalog::list_income_categories(&state.db, session.user_id()).await?,
    ))
}

/// Body of POST /api/income
#[derive(Debug, Deserialize)]
pub struct NewIncome {
    /// Month the income belongs to; the session's month when absent
    pub period: Option<Period>,
    /// Income category
    pub category_id: i64,
    /// Income before debt
    pub gross_income: Decimal,
    /// Debt paid out of it
    #[serde(default)]
    pub paid_debt: Decimal,
}

/// POST /api/income
pub async fn record_income(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<NewIncome>,
) -> Result<(StatusCode, Json<IncomeModel>)> {
    let period = request.period.unwrap_or(session.context.period);
    let line = income::record_income(
        &state.db,
        session.user_id(),
        period,
        request.category_id,
        request.gross_income,
        request.paid_debt,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// Body of POST /api/debt-payments
#[derive(Debug, Deserialize)]
pub struct NewDebtPayment {
    /// Month the payment belongs to; the session's month when absent
    pub period: Option<Period>,
    /// Amount paid
    pub amount: Decimal,
}

/// POST /api/debt-payments
pub async fn record_debt_payment(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<NewDebtPayment>,
) -> Result<(StatusCode, Json<TransactionModel>)> {
    let period = request.period.unwrap_or(session.context.period);
    let payment =
        income::record_debt_payment(&state.db, session.user_id(), period, request.amount).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /api/expenses
pub async fn list_expenses(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<TransactionModel>>> {
    let period = query.or_session(&session);
    Ok(Json(
        expense::list_expenses(&state.db, session.user_id(), period).await?,
    ))
}

/// Date of the caller's most recent expense, `null` before the first one.
#[derive(Debug, Serialize)]
pub struct LatestExpenseDate {
    /// Suggested default date for the next expense
    pub transaction_date: Option<NaiveDate>,
}

/// GET /api/expenses/latest-date
pub async fn latest_expense_date(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<LatestExpenseDate>> {
    let transaction_date = expense::latest_transaction_date(&state.db, session.user_id()).await?;
    Ok(Json(LatestExpenseDate { transaction_date }))
}

/// POST /api/expenses
pub async fn record_expense(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<NewExpense>,
) -> Result<(StatusCode, Json<TransactionModel>)> {
    let row = expense::record_expense(&state.db, session.user_id(), request).await?;
    Ok((StatusCode::CREATED, Json(row)))
}
