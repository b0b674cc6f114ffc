//! Buckets, categories and locations.

use crate::{
    api::{AppState, CurrentSession},
    core::catalog,
    entities::{BucketModel, BucketType, CategoryModel, LocationModel},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// `?bucket_type=Income|Spendable`
#[derive(Debug, Default, Deserialize)]
pub struct BucketQuery {
    /// Only buckets of this type
    pub bucket_type: Option<BucketType>,
}

/// GET /api/buckets
pub async fn list_buckets(
    State(state): State<AppState>,
    _session: CurrentSession,
    Query(query): Query<BucketQuery>,
) -> Result<Json<Vec<BucketModel>>> {
    let buckets = match query.bucket_type {
        Some(bucket_type) => catalog::list_buckets_by_type(&state.db, bucket_type).await?,
        None => catalog::list_buckets(&state.db).await?,
    };
    Ok(Json(buckets))
}

/// GET /api/buckets/:bucket_id/categories
pub async fn list_categories(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(bucket_id): Path<i64>,
) -> Result<Json<Vec<CategoryModel>>> {
    let categories = catalog::list_categories(&state.db, bucket_id, session.user_id()).await?;
    Ok(Json(categories))
}

/// Body of POST /api/categories
#[derive(Debug, Deserialize)]
pub struct NewCategory {
    /// Display name
    pub category_name: String,
    /// Owning bucket
    pub bucket_id: i64,
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<NewCategory>,
) -> Result<(StatusCode, Json<CategoryModel>)> {
    let category = catalog::create_category(
        &state.db,
        &request.category_name,
        request.bucket_id,
        session.user_id(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/locations
pub async fn list_locations(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<Vec<LocationModel>>> {
    Ok(Json(
        catalog::list_locations(&state.db, session.user_id()).await?,
    ))
}

/// Body of POST /api/locations
#[derive(Debug, Deserialize)]
pub struct NewLocation {
    /// Display name
    pub location_name: String,
}

/// POST /api/locations
pub async fn create_location(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<NewLocation>,
) -> Result<(StatusCode, Json<LocationModel>)> {
    let location =
        catalog::create_location(&state.db, &request.location_name, session.user_id()).await?;
    Ok((StatusCode::CREATED, Json(location)))
}
