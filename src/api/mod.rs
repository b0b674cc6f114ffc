//! HTTP interface - a JSON API over the core business logic.
//!
//! Handlers are thin: they pull the session out of the request, call into
//! [`crate::core`], and let [`crate::errors::Error`] pick the response status.

pub mod allocation;
pub mod auth;
pub mod catalog;
pub mod error;
pub mod money;
pub mod report;

pub use auth::CurrentSession;

use crate::{
    config::settings::ServerSettings,
    core::{period::Period, session::SessionStore},
    errors::{Error, Result},
};
use axum::{
    Router,
    http::Method,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Open sessions
    pub sessions: SessionStore,
    /// bcrypt cost for new passwords
    pub password_cost: u32,
}

impl AppState {
    /// Creates application state with no open sessions.
    #[must_use]
    pub fn new(db: DatabaseConnection, password_cost: u32) -> Self {
        Self {
            db,
            sessions: SessionStore::new(),
            password_cost,
        }
    }
}

/// `?period=YYYY-MM-DD` query; any day of the month selects that month.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    /// Month to look at; the session's month when absent
    pub period: Option<Period>,
}

impl PeriodQuery {
    /// The requested month, falling back to the session's.
    #[must_use]
    pub fn or_session(&self, session: &CurrentSession) -> Period {
        self.period.unwrap_or(session.context.period)
    }
}

/// Assembles every route.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/buckets", get(catalog::list_buckets))
        .route("/buckets/:bucket_id/categories", get(catalog::list_categories))
        .route("/categories", post(catalog::create_category))
        .route(
            "/locations",
            get(catalog::list_locations).post(catalog::create_location),
        )
        .route("/income", get(money::list_income).post(money::record_income))
        .route("/income/categories", get(money::list_income_categories))
        .route("/debt-payments", post(money::record_debt_payment))
        .route(
            "/expenses",
            get(money::list_expenses).post(money::record_expense),
        )
        .route("/expenses/latest-date", get(money::latest_expense_date))
        .route("/allocations", get(allocation::list_allocations))
        .route("/allocations/session", get(allocation::session_allocations))
        .route("/allocations/session/period", put(allocation::select_period))
        .route(
            "/allocations/session/drafts/:category_id",
            put(allocation::stage_draft).delete(allocation::remove_draft),
        )
        .route("/allocations/session/save", post(allocation::save))
        .route("/reports/budget", get(report::budget))
        .route("/reports/allocations", get(report::allocations));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Binds `settings.bind_address` and serves until Ctrl-C.
pub async fn run_server(settings: &ServerSettings, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_protected_route_requires_session() -> Result<()> {
        let app = router(AppState::new(setup_test_db().await?, TEST_PASSWORD_COST));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/buckets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Please log in to access this page");
        Ok(())
    }

    #[tokio::test]
    async fn test_register_login_and_save_over_http() -> Result<()> {
        let fixture = setup_budget_fixture().await?;
        let app = router(AppState::new(fixture.db.clone(), TEST_PASSWORD_COST));

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/login",
                None,
                &json!({ "username": "test_user", "password": TEST_PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/allocations/session/period",
                Some(&token),
                &json!({ "period": "2024-03-17" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["period"], "2024-03-01");

        let uri = format!("/api/allocations/session/drafts/{}", fixture.food.id);
        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &uri,
                Some(&token),
                &json!({ "kind": "priced", "price": "25", "quantity": 4 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // No income recorded for March yet
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/allocations/session/save",
                Some(&token),
                &json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        create_test_income(&fixture.db, &fixture, test_period(), 1_000).await?;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/allocations/session/save",
                Some(&token),
                &json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["inserted"].as_array().unwrap().len(), 1);
        assert!(report["failed"].as_array().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() -> Result<()> {
        let app = router(AppState::new(setup_test_db().await?, TEST_PASSWORD_COST));
        let body = json!({ "username": "alice", "password": "pw" });

        let first = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/users", None, &body))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let created = body_json(first).await;
        assert!(created.get("password_hash").is_none());

        let second = app
            .oneshot(json_request(Method::POST, "/api/users", None, &body))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        Ok(())
    }

    #[tokio::test]
    async fn test_last_representable_month_is_refused() -> Result<()> {
        let fixture = setup_budget_fixture().await?;
        let state = AppState::new(fixture.db.clone(), TEST_PASSWORD_COST);
        let token = state
            .sessions
            .login(crate::core::session::SessionContext::new(
                fixture.user.id,
                fixture.user.username.clone(),
            ))
            .await
            .to_string();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/allocations/session/period",
                Some(&token),
                &json!({ "period": "+262142-12-05" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::GET,
                "/api/income?period=%2B262142-12-05",
                Some(&token),
                &json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request(
                Method::GET,
                "/api/income/categories",
                Some(&token),
                &json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
        Ok(())
    }
}
