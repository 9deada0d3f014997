//! User business logic - registration and lookup of ledger owners.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use tracing::{info, instrument};

use crate::{
    core::UserId,
    entities::{User, user},
    errors::{Error, Result},
};

/// Input for [`create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login e-mail, must be unique
    pub email: String,
    /// Hash produced by the identity provider
    pub password_hash: String,
    /// Monthly salary, not negative
    pub salary: Decimal,
}

/// Registers a new user.
///
/// # Errors
/// Returns [`Error::InvalidOperation`] if the name is blank, the e-mail is malformed or
/// already registered, or the salary is negative.
#[instrument(skip(db, new_user), fields(email = %new_user.email))]
pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    let name = crate::core::require_name(&new_user.name, "User")?;
    let email = new_user.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(Error::invalid(format!("Invalid e-mail address: {email}")));
    }
    if new_user.salary < Decimal::ZERO {
        return Err(Error::invalid("Salary cannot be negative"));
    }

    let existing = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::invalid(format!("E-mail {email} is already registered")));
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        password_hash: Set(new_user.password_hash),
        salary: Set(new_user.salary),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, "User created");
    Ok(user)
}

/// Loads a user by id.
pub async fn get_user<C>(db: &C, user_id: UserId) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id.get())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id.get()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            salary: dec!(3000.00),
        }
    }

    #[tokio::test]
    async fn test_create_user_normalizes_email() -> Result<()> {
        let db = setup_test_db().await?;

        let user = create_user(&db, new_user("  Ana@Example.com ")).await?;
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.salary, dec!(3000.00));

        let fetched = get_user(&db, UserId::new(user.id)).await?;
        assert_eq!(fetched, user);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;

        create_user(&db, new_user("ana@example.com")).await?;
        let result = create_user(&db, new_user("ANA@example.com")).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_user(&db, new_user("not-an-email")).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        let mut negative = new_user("bob@example.com");
        negative.salary = dec!(-1.00);
        let result = create_user(&db, negative).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        Ok(())
    }
}
