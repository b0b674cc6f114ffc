//! User registration and login.
//!
//! Passwords are stored as bcrypt hashes, which embed their own salt and cost.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{info, warn};

/// Finds a user by username.
pub async fn get_user_by_username<C>(db: &C, username: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a user, hashing `password` with the given bcrypt `cost`.
pub async fn register_user<C>(
    db: &C,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::MissingField {
            field: "username".to_string(),
        });
    }
    if password.is_empty() {
        return Err(Error::MissingField {
            field: "password".to_string(),
        });
    }

    if get_user_by_username(db, username).await?.is_some() {
        return Err(Error::UsernameTaken {
            username: username.to_string(),
        });
    }

    let password_hash = bcrypt::hash(password, cost)?;
    let user = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let result = user.insert(db).await?;

    info!("Registered user '{}' (id {})", result.username, result.id);
    Ok(result)
}

/// Checks a username and password.
///
/// Unknown users and wrong passwords both yield `InvalidCredentials`. For an unknown
/// user the password is still hashed at `cost`, the cost new accounts are registered
/// with, so both failures take about as long.
pub async fn verify_user<C>(
    db: &C,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let Some(user) = get_user_by_username(db, username.trim()).await? else {
        let _discarded = bcrypt::hash(password, cost)?;
        warn!("Login attempt for unknown user '{}'", username.trim());
        return Err(Error::InvalidCredentials);
    };

    if bcrypt::verify(password, &user.password_hash)? {
        Ok(user)
    } else {
        warn!("Wrong password for user '{}'", user.username);
        Err(Error::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_register_stores_hash_not_password() -> Result<()> {
        let db = setup_test_db().await?;
        let user = register_user(&db, " alice ", "s3cret", TEST_PASSWORD_COST).await?;

        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "s3cret");
        assert!(user.password_hash.starts_with("$2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_blanks() -> Result<()> {
        let db = setup_test_db().await?;
        register_user(&db, "alice", "pw", TEST_PASSWORD_COST).await?;

        assert!(matches!(
            register_user(&db, "alice", "other", TEST_PASSWORD_COST).await,
            Err(Error::UsernameTaken { .. })
        ));
        assert!(matches!(
            register_user(&db, "", "pw", TEST_PASSWORD_COST).await,
            Err(Error::MissingField { .. })
        ));
        assert!(matches!(
            register_user(&db, "bob", "", TEST_PASSWORD_COST).await,
            Err(Error::MissingField { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_user() -> Result<()> {
        let db = setup_test_db().await?;
        let registered = register_user(&db, "alice", "s3cret", TEST_PASSWORD_COST).await?;

        let user = verify_user(&db, "alice", "s3cret", TEST_PASSWORD_COST).await?;
        assert_eq!(user.id, registered.id);

        assert!(matches!(
            verify_user(&db, "alice", "wrong", TEST_PASSWORD_COST).await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            verify_user(&db, "nobody", "s3cret", TEST_PASSWORD_COST).await,
            Err(Error::InvalidCredentials)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_user_still_hashes_password() -> Result<()> {
        let db = setup_test_db().await?;

        // bcrypt refuses cost 3, which is only reachable if the password is hashed
        assert!(matches!(
            verify_user(&db, "nobody", "s3cret", 3).await,
            Err(Error::PasswordHash(_))
        ));
        assert!(matches!(
            verify_user(&db, "nobody", "s3cret", TEST_PASSWORD_COST).await,
            Err(Error::InvalidCredentials)
        ));
        Ok(())
    }
}
