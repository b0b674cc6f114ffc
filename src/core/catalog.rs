//! Category catalog - buckets, categories and locations.
//!
//! Buckets are shared reference data seeded from configuration. Categories and
//! locations belong to a single user, and every lookup here is scoped to that user
//! so one user can never book money against another user's category.

use crate::{
    config::settings::BucketConfig,
    entities::{Bucket, BucketType, Category, Location, bucket, category, location},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Retrieves every bucket, ordered by name.
pub async fn list_buckets<C>(db: &C) -> Result<Vec<bucket::Model>>
where
    C: ConnectionTrait,
{
    Bucket::find()
        .order_by_asc(bucket::Column::BucketName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the buckets of one type, ordered by name.
pub async fn list_buckets_by_type<C>(db: &C, bucket_type: BucketType) -> Result<Vec<bucket::Model>>
where
    C: ConnectionTrait,
{
    Bucket::find()
        .filter(bucket::Column::BucketType.eq(bucket_type))
        .order_by_asc(bucket::Column::BucketName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a bucket by its exact name.
pub async fn get_bucket_by_name<C>(db: &C, name: &str) -> Result<Option<bucket::Model>>
where
    C: ConnectionTrait,
{
    Bucket::find()
        .filter(bucket::Column::BucketName.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a bucket after validating its name.
pub async fn create_bucket<C>(db: &C, name: &str, bucket_type: BucketType) -> Result<bucket::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::MissingField {
            field: "bucket_name".to_string(),
        });
    }

    let bucket = bucket::ActiveModel {
        bucket_name: Set(name.to_string()),
        bucket_type: Set(bucket_type),
        ..Default::default()
    };
    Ok(bucket.insert(db).await?)
}

/// Inserts every configured bucket that does not exist yet. Existing buckets are never
/// modified. Returns the number of buckets created.
pub async fn seed_buckets<C>(db: &C, buckets: &[BucketConfig]) -> Result<usize>
where
    C: ConnectionTrait,
{
    let mut created = 0;
    for config in buckets {
        if get_bucket_by_name(db, config.name.trim()).await?.is_some() {
            continue;
        }
        create_bucket(db, &config.name, config.bucket_type).await?;
        info!("Seeded bucket '{}' ({:?})", config.name, config.bucket_type);
        created += 1;
    }
    Ok(created)
}

/// Retrieves a user's categories inside one bucket, ordered by name.
pub async fn list_categories<C>(db: &C, bucket_id: i64, user_id: i64) -> Result<Vec<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .filter(category::Column::BucketId.eq(bucket_id))
        .filter(category::Column::UserId.eq(user_id))
        .order_by_asc(category::Column::CategoryName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all of a user's categories that sit in buckets of `bucket_type`.
pub async fn list_categories_by_bucket_type<C>(
    db: &C,
    user_id: i64,
    bucket_type: BucketType,
) -> Result<Vec<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .inner_join(Bucket)
        .filter(bucket::Column::BucketType.eq(bucket_type))
        .filter(category::Column::UserId.eq(user_id))
        .order_by_asc(category::Column::CategoryName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the categories income statement lines can be recorded against.
pub async fn list_income_categories<C>(db: &C, user_id: i64) -> Result<Vec<category::Model>>
where
    C: ConnectionTrait,
{
    list_categories_by_bucket_type(db, user_id, BucketType::Income).await
}

/// Loads a category together with its bucket, but only if `user_id` owns it.
pub async fn get_category_for_user<C>(
    db: &C,
    category_id: i64,
    user_id: i64,
) -> Result<Option<(category::Model, bucket::Model)>>
where
    C: ConnectionTrait,
{
    let found = Category::find_by_id(category_id)
        .filter(category::Column::UserId.eq(user_id))
        .find_also_related(Bucket)
        .one(db)
        .await?;

    Ok(found.and_then(|(category, bucket)| bucket.map(|bucket| (category, bucket))))
}

/// Like [`get_category_for_user`] but also requires the category's bucket type,
/// failing with `CategoryNotFound` otherwise.
pub async fn require_category<C>(
    db: &C,
    category_id: i64,
    user_id: i64,
    bucket_type: BucketType,
) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    match get_category_for_user(db, category_id, user_id).await? {
        Some((category, bucket)) if bucket.bucket_type == bucket_type => Ok(category),
        _ => Err(Error::CategoryNotFound {
            name: category_id.to_string(),
        }),
    }
}

/// Finds one of the user's categories by its exact name, in any bucket.
pub async fn find_category_by_name<C>(
    db: &C,
    name: &str,
    user_id: i64,
) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .filter(category::Column::CategoryName.eq(name))
        .filter(category::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a category for `user_id` inside `bucket_id`.
///
/// The name is trimmed and must not be empty, the bucket must exist, and the user may
/// not already have a category with the same name in that bucket.
pub async fn create_category<C>(
    db: &C,
    name: &str,
    bucket_id: i64,
    user_id: i64,
) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::MissingField {
            field: "category_name".to_string(),
        });
    }

    if Bucket::find_by_id(bucket_id).one(db).await?.is_none() {
        return Err(Error::BucketNotFound {
            name: bucket_id.to_string(),
        });
    }

    let duplicate = Category::find()
        .filter(category::Column::CategoryName.eq(name))
        .filter(category::Column::BucketId.eq(bucket_id))
        .filter(category::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(Error::CategoryExists {
            name: name.to_string(),
        });
    }

    let category = category::ActiveModel {
        category_name: Set(name.to_string()),
        bucket_id: Set(bucket_id),
        user_id: Set(user_id),
        ..Default::default()
    };
    let result = category.insert(db).await?;
    info!(
        "Created category '{}' (id {}) in bucket {} for user {}",
        result.category_name, result.id, bucket_id, user_id
    );
    Ok(result)
}

/// Retrieves a user's locations, ordered by name.
pub async fn list_locations<C>(db: &C, user_id: i64) -> Result<Vec<location::Model>>
where
    C: ConnectionTrait,
{
    Location::find()
        .filter(location::Column::UserId.eq(user_id))
        .order_by_asc(location::Column::LocationName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a location only if `user_id` owns it.
pub async fn get_location_for_user<C>(
    db: &C,
    location_id: i64,
    user_id: i64,
) -> Result<Option<location::Model>>
where
    C: ConnectionTrait,
{
    Location::find_by_id(location_id)
        .filter(location::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a location for `user_id`.
pub async fn create_location<C>(db: &C, name: &str, user_id: i64) -> Result<location::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::MissingField {
            field: "location_name".to_string(),
        });
    }

    let location = location::ActiveModel {
        location_name: Set(name.to_string()),
        user_id: Set(user_id),
        ..Default::default()
    };
    Ok(location.insert(db).await?)
}
