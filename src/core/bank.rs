//! Bank business logic - bank accounts and transfers between them.
//!
//! Balances are only changed through [`crate::core::balance`]; this module never writes
//! the `balance` column directly after creation.

use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    core::{
        UserId,
        balance::{self, BalanceAccount, BalanceChange},
    },
    entities::{Bank, bank},
    errors::{Error, Result},
};

/// Input for [`create_bank`].
#[derive(Debug, Clone)]
pub struct NewBank {
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Opening balance, not negative
    pub balance: Decimal,
}

/// Result of [`transfer`]: both sides of the movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transfer {
    /// Amount moved
    pub amount: Decimal,
    /// Source bank before and after
    pub from: BalanceChange,
    /// Destination bank before and after
    pub to: BalanceChange,
}

/// Creates a bank for the user with an opening balance.
#[instrument(skip(db, new_bank), fields(name = %new_bank.name))]
pub async fn create_bank(
    db: &DatabaseConnection,
    user_id: UserId,
    new_bank: NewBank,
) -> Result<bank::Model> {
    let name = crate::core::require_name(&new_bank.name, "Bank")?;
    if new_bank.balance < Decimal::ZERO {
        return Err(Error::invalid("Opening balance cannot be negative"));
    }

    let bank = bank::ActiveModel {
        name: Set(name),
        description: Set(new_bank.description),
        balance: Set(new_bank.balance),
        version: Set(0),
        user_id: Set(user_id.get()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(bank_id = bank.id, "Bank created");
    Ok(bank)
}

/// Loads one of the user's banks.
///
/// # Errors
/// Returns [`Error::NotFound`] if the bank does not exist or belongs to someone else.
pub async fn get_bank<C>(db: &C, bank_id: i64, user_id: UserId) -> Result<bank::Model>
where
    C: ConnectionTrait,
{
    Bank::find_by_id(bank_id)
        .filter(bank::Column::UserId.eq(user_id.get()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("bank", bank_id))
}

/// Lists the user's banks alphabetically.
pub async fn list_banks(db: &DatabaseConnection, user_id: UserId) -> Result<Vec<bank::Model>> {
    Bank::find()
        .filter(bank::Column::UserId.eq(user_id.get()))
        .order_by_asc(bank::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a bank. Linked expenses and incomes go with it; bills and vaults lose their link.
#[instrument(skip(db))]
pub async fn delete_bank(db: &DatabaseConnection, bank_id: i64, user_id: UserId) -> Result<()> {
    let bank = get_bank(db, bank_id, user_id).await?;
    bank.delete(db).await?;
    info!(bank_id, "Bank deleted");
    Ok(())
}

/// Moves `amount` from one of the user's banks to another in a single transaction.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the amount is not positive or both banks are the same
/// - [`Error::NotFound`] if either bank is not the user's
/// - [`Error::InsufficientBalance`] if the source bank cannot cover the amount
#[instrument(skip(db))]
pub async fn transfer(
    db: &DatabaseConnection,
    from_bank_id: i64,
    to_bank_id: i64,
    amount: Decimal,
    user_id: UserId,
) -> Result<Transfer> {
    crate::core::ensure_positive(amount, "Transfer amount")?;
    if from_bank_id == to_bank_id {
        return Err(Error::invalid("Cannot transfer to the same bank"));
    }

    let txn = db.begin().await?;

    get_bank(&txn, from_bank_id, user_id).await?;
    get_bank(&txn, to_bank_id, user_id).await?;

    let from = balance::debit(&txn, BalanceAccount::Bank(from_bank_id), amount).await?;
    let to = balance::credit(&txn, BalanceAccount::Bank(to_bank_id), amount).await?;

    txn.commit().await?;

    info!(from_bank_id, to_bank_id, %amount, "Transfer completed");
    Ok(Transfer { amount, from, to })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_bank_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana@example.com").await?;

        let result = create_bank(
            &db,
            UserId::new(user.id),
            NewBank {
                name: "Checking".to_string(),
                description: None,
                balance: dec!(-0.01),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        let result = create_bank(
            &db,
            UserId::new(user.id),
            NewBank {
                name: "  ".to_string(),
                description: None,
                balance: dec!(0.00),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_bank_is_owner_scoped() -> Result<()> {
        let (db, _ana, bank) = setup_with_bank(dec!(10.00)).await?;
        let bob = create_test_user(&db, "bob@example.com").await?;

        let result = get_bank(&db, bank.id, UserId::new(bob.id)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "bank", .. })));
        assert!(list_banks(&db, UserId::new(bob.id)).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_moves_money() -> Result<()> {
        let (db, user, checking) = setup_with_bank(dec!(500.00)).await?;
        let savings = create_test_bank(&db, user.id, "Savings", dec!(20.00)).await?;

        let result = transfer(&db, checking.id, savings.id, dec!(125.50), UserId::new(user.id)).await?;
        assert_eq!(result.from.after, dec!(374.50));
        assert_eq!(result.to.after, dec!(145.50));

        let banks = list_banks(&db, UserId::new(user.id)).await?;
        let total: Decimal = banks.iter().map(|b| b.balance).sum();
        assert_eq!(total, dec!(520.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_transfer_changes_nothing() -> Result<()> {
        let (db, user, checking) = setup_with_bank(dec!(100.00)).await?;
        let savings = create_test_bank(&db, user.id, "Savings", dec!(0.00)).await?;

        let result = transfer(&db, checking.id, savings.id, dec!(100.01), UserId::new(user.id)).await;
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));

        let result = transfer(&db, checking.id, checking.id, dec!(1.00), UserId::new(user.id)).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        let checking = get_bank(&db, checking.id, UserId::new(user.id)).await?;
        let savings = get_bank(&db, savings.id, UserId::new(user.id)).await?;
        assert_eq!(checking.balance, dec!(100.00));
        assert_eq!(savings.balance, dec!(0.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_to_foreign_bank_is_not_found() -> Result<()> {
        let (db, ana, checking) = setup_with_bank(dec!(100.00)).await?;
        let bob = create_test_user(&db, "bob@example.com").await?;
        let foreign = create_test_bank(&db, bob.id, "Bob's", dec!(0.00)).await?;

        let result = transfer(&db, checking.id, foreign.id, dec!(10.00), UserId::new(ana.id)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "bank", .. })));

        let checking = get_bank(&db, checking.id, UserId::new(ana.id)).await?;
        assert_eq!(checking.balance, dec!(100.00));

        Ok(())
    }
}
