//! Balance mutator - the single writer of bank and vault balances.
//!
//! A mutation reads the current row, computes `current + delta`, refuses to go below zero,
//! and writes back with `WHERE version = <read version>`. Callers run it on the same
//! [`ConnectionTrait`] as the business change it belongs to (usually a `DatabaseTransaction`)
//! so both commit or roll back together.

use rust_decimal::Decimal;
use sea_orm::{prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::debug;

use crate::{
    entities::{Bank, Vault, bank, vault},
    errors::{Error, Result},
};

/// A balance that can be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BalanceAccount {
    /// `banks.balance` of the given bank id
    Bank(i64),
    /// `vaults.amount` of the given vault id
    Vault(i64),
}

/// Balance before and after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceChange {
    /// Account that was mutated
    pub account: BalanceAccount,
    /// Balance read before the write
    pub before: Decimal,
    /// Balance written
    pub after: Decimal,
}

/// Computes `current + delta`, failing if the result would be negative.
pub fn apply_delta(current: Decimal, delta: Decimal) -> Result<Decimal> {
    let after = current
        .checked_add(delta)
        .ok_or_else(|| Error::invalid(format!("Amount {delta} is out of range")))?;
    if after < Decimal::ZERO {
        return Err(Error::InsufficientBalance {
            available: current,
            required: -delta,
        });
    }
    Ok(after)
}

/// Adds `delta` (negative to take money out) to the account's balance.
///
/// # Errors
/// - [`Error::NotFound`] if the bank or vault does not exist
/// - [`Error::InsufficientBalance`] if the balance would drop below zero; nothing is written
/// - [`Error::ConcurrentModification`] if the row changed since it was read
pub async fn adjust<C>(db: &C, account: BalanceAccount, delta: Decimal) -> Result<BalanceChange>
where
    C: ConnectionTrait,
{
    let (before, version) = match account {
        BalanceAccount::Bank(id) => {
            let bank = Bank::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("bank", id))?;
            (bank.balance, bank.version)
        }
        BalanceAccount::Vault(id) => {
            let vault = Vault::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("vault", id))?;
            (vault.amount, vault.version)
        }
    };
    let after = apply_delta(before, delta)?;
    store(db, account, version, after).await?;

    debug!(?account, %before, %after, "Balance adjusted");
    Ok(BalanceChange {
        account,
        before,
        after,
    })
}

/// Writes `after` if the row is still at `read_version`, bumping the version.
///
/// # Errors
/// Returns [`Error::ConcurrentModification`] if another writer moved the version on.
async fn store<C>(db: &C, account: BalanceAccount, read_version: i32, after: Decimal) -> Result<()>
where
    C: ConnectionTrait,
{
    let (entity, id, rows_affected) = match account {
        BalanceAccount::Bank(id) => {
            let result = Bank::update_many()
                .col_expr(bank::Column::Balance, Expr::value(after))
                .col_expr(
                    bank::Column::Version,
                    Expr::col(bank::Column::Version).add(1),
                )
                .filter(bank::Column::Id.eq(id))
                .filter(bank::Column::Version.eq(read_version))
                .exec(db)
                .await?;
            ("bank", id, result.rows_affected)
        }
        BalanceAccount::Vault(id) => {
            let result = Vault::update_many()
                .col_expr(vault::Column::Amount, Expr::value(after))
                .col_expr(
                    vault::Column::Version,
                    Expr::col(vault::Column::Version).add(1),
                )
                .filter(vault::Column::Id.eq(id))
                .filter(vault::Column::Version.eq(read_version))
                .exec(db)
                .await?;
            ("vault", id, result.rows_affected)
        }
    };
    if rows_affected == 0 {
        return Err(Error::ConcurrentModification { entity, id });
    }
    Ok(())
}

/// Adds a positive `amount` to the account.
pub async fn credit<C>(db: &C, account: BalanceAccount, amount: Decimal) -> Result<BalanceChange>
where
    C: ConnectionTrait,
{
    crate::core::ensure_positive(amount, "Credit amount")?;
    adjust(db, account, amount).await
}

/// Takes a positive `amount` out of the account.
pub async fn debit<C>(db: &C, account: BalanceAccount, amount: Decimal) -> Result<BalanceChange>
where
    C: ConnectionTrait,
{
    crate::core::ensure_positive(amount, "Debit amount")?;
    adjust(db, account, -amount).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, TransactionTrait};

    #[test]
    fn test_apply_delta() {
        assert_eq!(apply_delta(dec!(100.00), dec!(-40.00)).unwrap(), dec!(60.00));
        assert_eq!(apply_delta(dec!(100.00), dec!(-100.00)).unwrap(), dec!(0.00));
        assert_eq!(apply_delta(dec!(0.00), dec!(25.50)).unwrap(), dec!(25.50));

        let err = apply_delta(dec!(100.00), dec!(-100.01)).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientBalance { available, required }
                if available == dec!(100.00) && required == dec!(100.01)
        ));
    }

    #[tokio::test]
    async fn test_credit_and_debit_reject_non_positive_amounts() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = credit(&db, BalanceAccount::Bank(1), Decimal::ZERO).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        let result = debit(&db, BalanceAccount::Vault(1), dec!(-1.00)).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_bank_balance() -> Result<()> {
        let (db, _user, bank) = setup_with_bank(dec!(500.00)).await?;

        let change = debit(&db, BalanceAccount::Bank(bank.id), dec!(120.25)).await?;
        assert_eq!(change.before, dec!(500.00));
        assert_eq!(change.after, dec!(379.75));

        let reloaded = Bank::find_by_id(bank.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.balance, dec!(379.75));
        assert_eq!(reloaded.version, bank.version + 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_fractional_amounts_survive_storage() -> Result<()> {
        let (db, _user, bank) = setup_with_bank(dec!(98765.4321)).await?;

        let change = credit(&db, BalanceAccount::Bank(bank.id), dec!(0.0001)).await?;
        assert_eq!(change.after, dec!(98765.4322));

        let reloaded = Bank::find_by_id(bank.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.balance, dec!(98765.4322));

        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_bank_unchanged() -> Result<()> {
        let (db, _user, bank) = setup_with_bank(dec!(50.00)).await?;

        let result = debit(&db, BalanceAccount::Bank(bank.id), dec!(50.01)).await;
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));

        let reloaded = Bank::find_by_id(bank.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.balance, dec!(50.00));
        assert_eq!(reloaded.version, bank.version);

        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_missing_account_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;

        let result = credit(&db, BalanceAccount::Vault(99), dec!(1.00)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "vault", id: 99 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_rolled_back_transaction_discards_mutation() -> Result<()> {
        let (db, _user, bank) = setup_with_bank(dec!(200.00)).await?;

        let txn = db.begin().await?;
        credit(&txn, BalanceAccount::Bank(bank.id), dec!(300.00)).await?;
        txn.rollback().await?;

        let reloaded = Bank::find_by_id(bank.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.balance, dec!(200.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_stale_bank_write_is_rejected() -> Result<()> {
        let (db, _user, bank) = setup_with_bank(dec!(200.00)).await?;

        credit(&db, BalanceAccount::Bank(bank.id), dec!(50.00)).await?;

        // Writer that read version 0 before the credit above landed
        let result = store(&db, BalanceAccount::Bank(bank.id), bank.version, dec!(0.00)).await;
        assert!(matches!(
            result,
            Err(Error::ConcurrentModification { entity: "bank", id }) if id == bank.id
        ));

        let reloaded = Bank::find_by_id(bank.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.balance, dec!(250.00));
        assert_eq!(reloaded.version, bank.version + 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_stale_vault_write_rolls_back_with_its_transaction() -> Result<()> {
        let (db, user, bank) = setup_with_bank(dec!(100.00)).await?;
        let vault = crate::core::vault::create_vault(
            &db,
            crate::core::UserId::new(user.id),
            crate::core::vault::NewVault {
                name: "Trip".to_string(),
                description: None,
                initial_amount: dec!(40.00),
                currency: "BRL".to_string(),
                bank_id: Some(bank.id),
            },
        )
        .await?;
        credit(&db, BalanceAccount::Vault(vault.id), dec!(10.00)).await?;

        let txn = db.begin().await?;
        debit(&txn, BalanceAccount::Bank(bank.id), dec!(5.00)).await?;
        let result = store(&txn, BalanceAccount::Vault(vault.id), vault.version, dec!(45.00)).await;
        assert!(matches!(result, Err(Error::ConcurrentModification { entity: "vault", .. })));
        txn.rollback().await?;

        let bank = Bank::find_by_id(bank.id).one(&db).await?.unwrap();
        let vault = Vault::find_by_id(vault.id).one(&db).await?.unwrap();
        assert_eq!(bank.balance, dec!(60.00));
        assert_eq!(vault.amount, dec!(50.00));

        Ok(())
    }
}
