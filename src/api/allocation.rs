//! Budget allocation editing.
//!
//! Drafts are staged in the caller's session one category at a time and persisted
//! together by `POST /api/allocations/session/save`.

use crate::{
    api::{AppState, CurrentSession, PeriodQuery},
    core::{
        allocation::{AllocationDraft, AllocationInput, PersistedAllocation, reconcile},
        budget::{self, BudgetStatus},
        catalog, income, ledger,
        ledger::SaveReport,
        period::Period,
    },
    entities::BucketType,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// GET /api/allocations
pub async fn list_allocations(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<PersistedAllocation>>> {
    let period = query.or_session(&session);
    Ok(Json(
        ledger::fetch_allocations(&state.db, session.user_id(), period).await?,
    ))
}

/// The session's drafts and what saving them would do to the budget.
#[derive(Debug, Serialize)]
pub struct SessionAllocations {
    /// Month being edited
    pub period: Period,
    /// Net income ceiling
    pub net_income: Decimal,
    /// Staged drafts, by category id
    pub drafts: Vec<AllocationDraft>,
    /// Ledger total once the drafts are saved
    pub projected_total: Decimal,
    /// `projected_total` against `net_income`
    pub budget_status: BudgetStatus,
}

async fn session_view(state: &AppState, session: &CurrentSession) -> Result<SessionAllocations> {
    let user_id = session.user_id();
    let period = session.context.period;
    let net_income = income::total_net_income(&state.db, user_id, period).await?;
    let existing = ledger::fetch_allocations(&state.db, user_id, period).await?;
    let projected_total =
        reconcile(&session.context.drafts, &existing).projected_total(&existing)?;

    Ok(SessionAllocations {
        period,
        net_income,
        drafts: session.context.drafts.iter().cloned().collect(),
        projected_total,
        budget_status: budget::validate(projected_total, net_income),
    })
}

/// GET /api/allocations/session
pub async fn session_allocations(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<SessionAllocations>> {
    Ok(Json(session_view(&state, &session).await?))
}

/// Body of PUT /api/allocations/session/period
#[derive(Debug, Deserialize)]
pub struct SelectPeriod {
    /// Any day of the month to edit
    pub period: Period,
}

/// PUT /api/allocations/session/period
pub async fn select_period(
    State(state): State<AppState>,
    mut session: CurrentSession,
    Json(request): Json<SelectPeriod>,
) -> Result<Json<SessionAllocations>> {
    session.context = state
        .sessions
        .update(session.token, |context| {
            context.select_period(request.period);
            context.clone()
        })
        .await
        .ok_or(Error::Unauthenticated)?;

    Ok(Json(session_view(&state, &session).await?))
}

/// Answer to staging a draft.
#[derive(Debug, Serialize, Deserialize)]
pub struct StagedDraft {
    /// Whether a draft is now staged; blank inputs stage nothing
    pub staged: bool,
    /// The staged draft
    pub draft: Option<AllocationDraft>,
}

/// PUT /api/allocations/session/drafts/:category_id
pub async fn stage_draft(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(category_id): Path<i64>,
    Json(input): Json<AllocationInput>,
) -> Result<Json<StagedDraft>> {
    let user_id = session.user_id();
    catalog::require_category(&state.db, category_id, user_id, BucketType::Spendable).await?;
    let net_income = income::total_net_income(&state.db, user_id, session.context.period).await?;

    let staged = state
        .sessions
        .update(session.token, |context| {
            let mut drafts = context.drafts.clone();
            let staged = drafts.stage(category_id, input, net_income)?;
            // Refuse drafts whose total cannot be represented
            let _ = drafts.total()?;
            context.drafts = drafts;
            Ok::<_, Error>(StagedDraft {
                staged,
                draft: context.drafts.get(category_id).cloned(),
            })
        })
        .await
        .ok_or(Error::Unauthenticated)??;

    Ok(Json(staged))
}

/// DELETE /api/allocations/session/drafts/:category_id
pub async fn remove_draft(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(category_id): Path<i64>,
) -> Result<StatusCode> {
    state
        .sessions
        .update(session.token, |context| context.drafts.remove(category_id))
        .await
        .ok_or(Error::Unauthenticated)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/allocations/session/save
///
/// Answers 200 when every row was written and the saved drafts are dropped from the
/// session, or 207 with the failed rows listed; the drafts stay in the session so the
/// save can be retried. Drafts staged by another request while the save ran are kept.
pub async fn save(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<(StatusCode, Json<SaveReport>)> {
    let report = budget::save_allocations(
        &state.db,
        session.user_id(),
        session.context.period,
        &session.context.drafts,
    )
    .await?;

    if !report.is_complete() {
        return Ok((StatusCode::MULTI_STATUS, Json(report)));
    }

    state
        .sessions
        .update(session.token, |context| {
            if context.period != session.context.period {
                return;
            }
            for saved in session.context.drafts.iter() {
                if context.drafts.get(saved.category_id) == Some(saved) {
                    context.drafts.remove(saved.category_id);
                }
            }
        })
        .await;
    Ok((StatusCode::OK, Json(report)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{ledger::LedgerOperation, session::SessionContext};
    use crate::entities::Category;
    use crate::test_utils::*;
    use sea_orm::EntityTrait;

    async fn fixture_state() -> Result<(AppState, BudgetFixture, CurrentSession)> {
        let fixture = setup_budget_fixture().await?;
        let state = AppState::new(fixture.db.clone(), TEST_PASSWORD_COST);
        let mut context = SessionContext::new(fixture.user.id, fixture.user.username.clone());
        context.select_period(test_period());
        let token = state.sessions.login(context.clone()).await;
        Ok((state, fixture, CurrentSession { token, context }))
    }

    async fn refresh(state: &AppState, session: &CurrentSession) -> CurrentSession {
        CurrentSession {
            token: session.token,
            context: state.sessions.get(session.token).await.unwrap(),
        }
    }

    fn priced(price: i64, quantity: i64) -> AllocationInput {
        AllocationInput::Priced {
            price: Decimal::from(price),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_stage_save_and_clear_drafts() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;
        create_test_income(&fixture.db, &fixture, test_period(), 1_000).await?;

        let Json(staged) = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.food.id),
            Json(priced(50, 4)),
        )
        .await?;
        assert!(staged.staged);
        assert_eq!(staged.draft.unwrap().amount, Decimal::from(200));

        let Json(staged) = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.rent.id),
            Json(AllocationInput::Percentage {
                percent: Decimal::from(50),
            }),
        )
        .await?;
        assert_eq!(staged.draft.unwrap().amount, Decimal::from(500));

        let session = refresh(&state, &session).await;
        let Json(view) = session_allocations(State(state.clone()), session.clone()).await?;
        assert_eq!(view.drafts.len(), 2);
        assert_eq!(view.projected_total, Decimal::from(700));
        assert_eq!(
            view.budget_status,
            BudgetStatus::WithinBudget {
                percentage_used: Decimal::from(70)
            }
        );

        let (status, Json(report)) = save(State(state.clone()), session.clone()).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.inserted.len(), 2);

        let session = refresh(&state, &session).await;
        assert!(session.context.drafts.is_empty());

        let Json(persisted) =
            list_allocations(State(state), session, Query(PeriodQuery::default())).await?;
        assert_eq!(persisted.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_input_drops_draft() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;

        let Json(staged) = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.food.id),
            Json(priced(50, 4)),
        )
        .await?;
        assert!(staged.staged);
        let Json(staged) = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.food.id),
            Json(priced(0, 0)),
        )
        .await?;
        assert!(!staged.staged);
        assert!(staged.draft.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_stage_rejects_foreign_and_income_categories() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;
        let other = create_test_user(&fixture.db, "other").await?;
        let foreign =
            create_test_category(&fixture.db, "Theirs", fixture.spendable.id, other.id).await?;

        for category_id in [foreign.id, fixture.salary.id] {
            let result = stage_draft(
                State(state.clone()),
                session.clone(),
                Path(category_id),
                Json(priced(1, 1)),
            )
            .await;
            assert!(matches!(result, Err(Error::CategoryNotFound { .. })));
        }

        let result = stage_draft(
            State(state),
            session,
            Path(fixture.food.id),
            Json(priced(-1, 1)),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_over_budget_keeps_drafts() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;
        create_test_income(&fixture.db, &fixture, test_period(), 100).await?;

        let Json(staged) = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.food.id),
            Json(priced(101, 1)),
        )
        .await?;
        assert_eq!(staged.draft.unwrap().amount, Decimal::from(101));

        let session = refresh(&state, &session).await;
        let result = save(State(state.clone()), session.clone()).await;
        assert!(matches!(result, Err(Error::BudgetExceeded { .. })));

        let session = refresh(&state, &session).await;
        assert_eq!(session.context.drafts.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_select_period_and_remove_draft() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;

        for category_id in [fixture.food.id, fixture.rent.id] {
            let Json(staged) = stage_draft(
                State(state.clone()),
                session.clone(),
                Path(category_id),
                Json(priced(1, 1)),
            )
            .await?;
            assert!(staged.staged);
        }

        let status = remove_draft(State(state.clone()), session.clone(), Path(fixture.food.id)).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(refresh(&state, &session).await.context.drafts.len(), 1);

        let Json(view) = select_period(
            State(state.clone()),
            session.clone(),
            Json(SelectPeriod {
                period: test_period().next(),
            }),
        )
        .await?;
        assert_eq!(view.period, test_period().next());
        assert!(view.drafts.is_empty());
        assert_eq!(view.budget_status, BudgetStatus::Unfunded);
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_save_answers_multi_status_and_keeps_drafts() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;
        create_test_income(&fixture.db, &fixture, test_period(), 1_000).await?;

        for category_id in [fixture.food.id, fixture.transport.id] {
            let Json(staged) = stage_draft(
                State(state.clone()),
                session.clone(),
                Path(category_id),
                Json(priced(100, 1)),
            )
            .await?;
            assert!(staged.staged);
        }

        // The transport row can no longer satisfy its category foreign key
        Category::delete_by_id(fixture.transport.id)
            .exec(&fixture.db)
            .await?;

        let session = refresh(&state, &session).await;
        let (status, Json(report)) = save(State(state.clone()), session.clone()).await?;
        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].category_id, fixture.food.id);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].category_id, fixture.transport.id);
        assert_eq!(report.failed[0].operation, LedgerOperation::Insert);
        assert_eq!(report.failed[0].transaction_id, None);

        let session = refresh(&state, &session).await;
        assert_eq!(session.context.drafts.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_keeps_drafts_staged_meanwhile() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;
        create_test_income(&fixture.db, &fixture, test_period(), 1_000).await?;

        let Json(staged) = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.food.id),
            Json(priced(100, 1)),
        )
        .await?;
        assert!(staged.staged);
        let snapshot = refresh(&state, &session).await;

        // Staged after the snapshot the save works from
        for (category_id, price) in [(fixture.rent.id, 300), (fixture.food.id, 150)] {
            let Json(staged) = stage_draft(
                State(state.clone()),
                session.clone(),
                Path(category_id),
                Json(priced(price, 1)),
            )
            .await?;
            assert!(staged.staged);
        }

        let (status, Json(report)) = save(State(state.clone()), snapshot).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].amount, Decimal::from(100));

        let drafts = refresh(&state, &session).await.context.drafts;
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts.get(fixture.rent.id).unwrap().amount, Decimal::from(300));
        assert_eq!(drafts.get(fixture.food.id).unwrap().amount, Decimal::from(150));
        Ok(())
    }

    #[tokio::test]
    async fn test_stage_rejects_unrepresentable_total() -> Result<()> {
        let (state, fixture, session) = fixture_state().await?;
        let huge = AllocationInput::Priced {
            price: Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0),
            quantity: 1,
        };

        let Json(staged) = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.food.id),
            Json(huge),
        )
        .await?;
        assert!(staged.staged);

        let result = stage_draft(
            State(state.clone()),
            session.clone(),
            Path(fixture.rent.id),
            Json(huge),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let session = refresh(&state, &session).await;
        assert_eq!(session.context.drafts.len(), 1);
        let Json(view) = session_allocations(State(state), session).await?;
        assert_eq!(view.budget_status, BudgetStatus::Unfunded);
        Ok(())
    }
}
