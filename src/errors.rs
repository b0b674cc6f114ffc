//! Unified error types and result handling.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// Every failure the service can report. None of them is fatal to the process;
/// the API layer renders each one as a user-visible message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read, parsed, or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any failure reported by the database layer, including pool exhaustion
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable was missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Password hashing or verification failed internally
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// A monetary value or quantity was negative, zero where forbidden, or out of range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending value
        amount: Decimal,
    },

    /// The date falls in a month that cannot be budgeted
    #[error("Invalid budget period: {date}")]
    InvalidPeriod {
        /// The rejected date
        date: NaiveDate,
    },

    /// A required input field was empty
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the field
        field: String,
    },

    /// No bucket matched the given id or name
    #[error("Bucket not found: {name}")]
    BucketNotFound {
        /// Id or name that was looked up
        name: String,
    },

    /// No category matched, or it belongs to another user
    #[error("Category not found: {name}")]
    CategoryNotFound {
        /// Id or name that was looked up
        name: String,
    },

    /// A category with the same name already exists in the bucket for this user
    #[error("Category already exists: {name}")]
    CategoryExists {
        /// The duplicate name
        name: String,
    },

    /// No location matched, or it belongs to another user
    #[error("Location not found: {name}")]
    LocationNotFound {
        /// Id or name that was looked up
        name: String,
    },

    /// The transaction id does not refer to a budget allocation row
    #[error("Allocation not found: transaction {transaction_id}")]
    AllocationNotFound {
        /// Id that was looked up
        transaction_id: i64,
    },

    /// There is no positive net income for the period, so nothing can be allocated
    #[error("No net income recorded for {period}; submit an income statement first")]
    BudgetUnfunded {
        /// First day of the budget month
        period: NaiveDate,
    },

    /// The allocations would exceed the period's net income
    #[error("Total allocated {total} exceeds net income {net_income}")]
    BudgetExceeded {
        /// Total the ledger would hold after saving
        total: Decimal,
        /// Net income ceiling for the period
        net_income: Decimal,
    },

    /// Unknown username or wrong password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Registration attempted with a username that is already taken
    #[error("Username already taken: {username}")]
    UsernameTaken {
        /// The duplicate username
        username: String,
    },

    /// The request carried no valid session token
    #[error("Please log in to access this page")]
    Unauthenticated,
}

impl Error {
    /// True when the database could not be reached or the pool had no free connection.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Database(DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
        )
    }

    /// True for failures detected before any persistence call is attempted.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. }
                | Self::MissingField { .. }
                | Self::InvalidPeriod { .. }
                | Self::BudgetUnfunded { .. }
                | Self::BudgetExceeded { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
