//! Unified error type for the bookkeeping core.
//!
//! Business-rule failures carry enough context to build a client-facing message,
//! while storage failures are classified as internal and never leak their details.

use rust_decimal::Decimal;
use thiserror::Error;

/// Every failure the core can report.
#[derive(Debug, Error)]
pub enum Error {
    /// The entity does not exist or belongs to another user
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"bill"`
        entity: &'static str,
        /// Identifier that was looked up
        id: i64,
    },

    /// A business rule was violated
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Human-readable description of the violated rule
        message: String,
    },

    /// A debit would drive a bank or vault balance below zero
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        /// Balance at the time of the check
        available: Decimal,
        /// Amount the operation tried to take
        required: Decimal,
    },

    /// Another writer changed the row between our read and our write
    #[error("{entity} {id} was modified concurrently")]
    ConcurrentModification {
        /// Entity kind, e.g. `"bank"`
        entity: &'static str,
        /// Row identifier
        id: i64,
    },

    /// The bearer token could not be resolved to a user
    #[error("Unauthorized")]
    Unauthorized,

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Storage layer failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 404-equivalent
    NotFound,
    /// 400-equivalent
    InvalidOperation,
    /// 400-equivalent with shortfall context
    InsufficientBalance,
    /// 401-equivalent
    Unauthorized,
    /// 500-equivalent
    Internal,
}

impl Error {
    /// Shorthand for building an [`Error::InvalidOperation`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Shorthand for building an [`Error::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Classifies the error for the request boundary.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::ConcurrentModification { .. }
            | Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status code for the error kind.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidOperation | ErrorKind::InsufficientBalance => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Internal => 500,
        }
    }

    /// Message safe to show to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_classification() {
        assert_eq!(Error::not_found("bill", 7).status_code(), 404);
        assert_eq!(Error::invalid("bill is already paid").status_code(), 400);
        assert_eq!(
            Error::InsufficientBalance {
                available: dec!(10.00),
                required: dec!(20.00),
            }
            .kind(),
            ErrorKind::InsufficientBalance
        );
        assert_eq!(Error::Unauthorized.status_code(), 401);
        assert_eq!(
            Error::ConcurrentModification {
                entity: "bank",
                id: 1
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = Error::Database(sea_orm::DbErr::Custom("disk I/O failure".to_string()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = Error::InsufficientBalance {
            available: dec!(100.00),
            required: dec!(150.00),
        };
        assert!(err.public_message().contains("150.00"));
    }
}
