//! Registration, login and the session extractor.

use crate::{
    api::AppState,
    core::{
        auth,
        period::Period,
        session::SessionContext,
    },
    entities::UserModel,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The session behind the request's `Authorization: Bearer <token>` header.
///
/// Handlers taking this extractor answer 401 when the token is missing or unknown.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    /// Session token
    pub token: Uuid,
    /// Snapshot of the session when the request arrived
    pub context: SessionContext,
}

impl CurrentSession {
    /// Logged-in user's id.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.context.user_id
    }
}

fn bearer_token(parts: &Parts) -> Option<Uuid> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts).ok_or(Error::Unauthenticated)?;
        let context = state
            .sessions
            .get(token)
            .await
            .ok_or(Error::Unauthenticated)?;
        Ok(Self { token, context })
    }
}

/// Username and password.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Login name
    pub username: String,
    /// Plain password, only ever hashed or verified
    pub password: String,
}

/// POST /api/users
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<Credentials>,
) -> Result<(StatusCode, Json<UserModel>)> {
    let user =
        auth::register_user(&state.db, &request.username, &request.password, state.password_cost)
            .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Answer to a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for later requests
    pub token: Uuid,
    /// Logged-in user's id
    pub user_id: i64,
    /// Logged-in user's name
    pub username: String,
    /// Budget month the session starts on
    pub period: Period,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<Credentials>,
) -> Result<Json<LoginResponse>> {
    let user = auth::verify_user(
        &state.db,
        &request.username,
        &request.password,
        state.password_cost,
    )
    .await?;
    let context = SessionContext::new(user.id, user.username.clone());
    let period = context.period;
    let token = state.sessions.login(context).await;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        period,
    }))
}

/// POST /api/logout
pub async fn logout(State(state): State<AppState>, session: CurrentSession) -> StatusCode {
    state.sessions.logout(session.token).await;
    StatusCode::NO_CONTENT
}
