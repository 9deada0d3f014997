//! Identity boundary - the only place a bearer token turns into a user.
//!
//! Token issuing and validation belong to an external identity provider. The core
//! only ever sees the resulting [`UserId`], passed explicitly into every operation.

use std::fmt;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    entities::user,
    errors::{Error, Result},
};

/// Identifier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw user id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw id as stored in the `user_id` columns.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External issuer and validator of opaque bearer tokens.
pub trait IdentityProvider: Send + Sync {
    /// Resolves a token to the user it was issued for, `None` if invalid or expired.
    fn validate(&self, token: &str) -> Option<UserId>;

    /// Issues a fresh token for the user.
    fn issue(&self, user_id: UserId, email: &str) -> String;
}

/// Resolves a bearer token to the user row it belongs to.
///
/// # Errors
/// - [`Error::Unauthorized`] if the provider rejects the token
/// - [`Error::NotFound`] if the token names a user that no longer exists
#[instrument(skip(db, provider, token))]
pub async fn authenticate<P>(
    db: &DatabaseConnection,
    provider: &P,
    token: &str,
) -> Result<user::Model>
where
    P: IdentityProvider + ?Sized,
{
    let user_id = provider.validate(token).ok_or(Error::Unauthorized)?;
    debug!(%user_id, "Token resolved");
    crate::core::user::get_user(db, user_id).await
}
