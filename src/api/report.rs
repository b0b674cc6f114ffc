//! Reports.

use crate::{
    api::{AppState, CurrentSession, PeriodQuery},
    core::{
        period::Period,
        report::{self, AllocationSummary, BudgetReport, GroupBy},
    },
    errors::Result,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

/// GET /api/reports/budget
pub async fn budget(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<BudgetReport>> {
    let period = query.or_session(&session);
    Ok(Json(
        report::budget_report(&state.db, session.user_id(), period).await?,
    ))
}

/// `?period=&group_by=bucket|category&drafts=true`
#[derive(Debug, Default, Deserialize)]
pub struct AllocationReportQuery {
    /// Month to summarize; the session's month when absent
    pub period: Option<Period>,
    /// Distribution grouping
    #[serde(default)]
    pub group_by: GroupBy,
    /// Summarize the session's unsaved drafts instead of the ledger
    #[serde(default)]
    pub drafts: bool,
}

/// GET /api/reports/allocations
pub async fn allocations(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<AllocationReportQuery>,
) -> Result<Json<AllocationSummary>> {
    let summary = if query.drafts {
        report::draft_summary(
            &state.db,
            session.user_id(),
            &session.context.drafts,
            query.group_by,
        )
        .await?
    } else {
        let period = query.period.unwrap_or(session.context.period);
        report::allocation_summary(&state.db, session.user_id(), period, query.group_by).await?
    };
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{allocation::AllocationInput, session::SessionContext};
    use crate::test_utils::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_budget_and_allocation_reports() -> Result<()> {
        let fixture = setup_budget_fixture().await?;
        let period = test_period();
        create_test_income(&fixture.db, &fixture, period, 1_000).await?;
        create_test_allocation(&fixture.db, &fixture, fixture.food.id, period, 400).await?;

        let state = AppState::new(fixture.db.clone(), TEST_PASSWORD_COST);
        let mut context = SessionContext::new(fixture.user.id, fixture.user.username.clone());
        context.select_period(period);
        context.drafts.stage(
            fixture.rent.id,
            AllocationInput::Priced {
                price: Decimal::from(300),
                quantity: 1,
            },
            Decimal::from(1_000),
        )?;
        let token = state.sessions.login(context.clone()).await;
        let session = CurrentSession { token, context };

        let Json(budget_report) = budget(
            State(state.clone()),
            session.clone(),
            Query(PeriodQuery::default()),
        )
        .await?;
        assert_eq!(budget_report.lines.len(), 1);
        assert_eq!(budget_report.total_allocated, Decimal::from(400));

        let Json(persisted) = allocations(
            State(state.clone()),
            session.clone(),
            Query(AllocationReportQuery::default()),
        )
        .await?;
        assert_eq!(persisted.grand_total, Decimal::from(400));
        assert_eq!(persisted.group_by, GroupBy::Bucket);

        let Json(drafted) = allocations(
            State(state),
            session,
            Query(AllocationReportQuery {
                drafts: true,
                group_by: GroupBy::Category,
                ..Default::default()
            }),
        )
        .await?;
        assert_eq!(drafted.grand_total, Decimal::from(300));
        assert_eq!(drafted.distribution[0].label, "Rent");
        Ok(())
    }
}
