//! Vault business logic - savings jars and the money moving in and out of them.
//!
//! A bank-linked vault is funded from its bank and pays back into it 1:1. An unlinked vault
//! takes cash deposits from outside the ledger, so its money can only leave by withdrawal.

use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    core::{
        UserId,
        balance::{self, BalanceAccount, BalanceChange},
        bank::get_bank,
        ensure_positive, require_name,
    },
    entities::{Vault, vault},
    errors::{Error, Result},
};

/// Input for [`create_vault`].
#[derive(Debug, Clone)]
pub struct NewVault {
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Money moved into the vault on creation, not negative
    pub initial_amount: Decimal,
    /// Currency tag, e.g. `"BRL"`
    pub currency: String,
    /// Bank that funds the vault
    pub bank_id: Option<i64>,
}

/// Partial update for [`update_vault`]. The amount and bank link cannot be edited.
#[derive(Debug, Clone, Default)]
pub struct VaultUpdate {
    /// New name
    pub name: Option<String>,
    /// New description; `Some(None)` clears it
    pub description: Option<Option<String>>,
    /// New currency tag
    pub currency: Option<String>,
}

/// Bank side of a vault movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BankSnapshot {
    /// Bank that was debited or credited
    pub bank_id: i64,
    /// Bank balance before the movement
    pub before: Decimal,
    /// Bank balance after the movement
    pub after: Decimal,
}

impl BankSnapshot {
    fn from_change(bank_id: i64, change: BalanceChange) -> Self {
        Self {
            bank_id,
            before: change.before,
            after: change.after,
        }
    }
}

/// Result of [`deposit`] and [`withdraw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VaultTransaction {
    /// Vault that was moved
    pub vault_id: i64,
    /// Amount moved
    pub amount: Decimal,
    /// Vault amount before the movement
    pub vault_before: Decimal,
    /// Vault amount after the movement
    pub vault_after: Decimal,
    /// Linked bank's side, `None` for unlinked vaults
    pub bank: Option<BankSnapshot>,
}

/// Creates a vault, moving `initial_amount` out of the linked bank if there is one.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the name is blank or the initial amount is negative
/// - [`Error::NotFound`] if the bank is not the user's
/// - [`Error::InsufficientBalance`] if the bank cannot fund the initial amount
#[instrument(skip(db, new_vault), fields(name = %new_vault.name))]
pub async fn create_vault(
    db: &DatabaseConnection,
    user_id: UserId,
    new_vault: NewVault,
) -> Result<vault::Model> {
    let name = require_name(&new_vault.name, "Vault")?;
    if new_vault.initial_amount < Decimal::ZERO {
        return Err(Error::invalid("Initial amount cannot be negative"));
    }

    let txn = db.begin().await?;

    if let Some(bank_id) = new_vault.bank_id {
        get_bank(&txn, bank_id, user_id).await?;
        if new_vault.initial_amount > Decimal::ZERO {
            balance::debit(&txn, BalanceAccount::Bank(bank_id), new_vault.initial_amount).await?;
        }
    }

    let vault = vault::ActiveModel {
        name: Set(name),
        description: Set(new_vault.description),
        amount: Set(new_vault.initial_amount),
        currency: Set(new_vault.currency),
        bank_id: Set(new_vault.bank_id),
        version: Set(0),
        user_id: Set(user_id.get()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(vault_id = vault.id, amount = %vault.amount, "Vault created");
    Ok(vault)
}

/// Lists the user's vaults alphabetically.
pub async fn list_vaults(db: &DatabaseConnection, user_id: UserId) -> Result<Vec<vault::Model>> {
    Vault::find()
        .filter(vault::Column::UserId.eq(user_id.get()))
        .order_by_asc(vault::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads one of the user's vaults.
///
/// # Errors
/// Returns [`Error::NotFound`] if the vault does not exist or belongs to someone else.
pub async fn get_vault<C>(db: &C, vault_id: i64, user_id: UserId) -> Result<vault::Model>
where
    C: ConnectionTrait,
{
    Vault::find_by_id(vault_id)
        .filter(vault::Column::UserId.eq(user_id.get()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("vault", vault_id))
}

/// Lists the vaults funded by one of the user's banks.
///
/// # Errors
/// Returns [`Error::NotFound`] if the bank is not the user's.
pub async fn list_vaults_by_bank(
    db: &DatabaseConnection,
    bank_id: i64,
    user_id: UserId,
) -> Result<Vec<vault::Model>> {
    get_bank(db, bank_id, user_id).await?;
    Vault::find()
        .filter(vault::Column::UserId.eq(user_id.get()))
        .filter(vault::Column::BankId.eq(bank_id))
        .order_by_asc(vault::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames or re-describes a vault.
#[instrument(skip(db))]
pub async fn update_vault(
    db: &DatabaseConnection,
    vault_id: i64,
    user_id: UserId,
    changes: VaultUpdate,
) -> Result<vault::Model> {
    let vault = get_vault(db, vault_id, user_id).await?;
    let mut active: vault::ActiveModel = vault.into();

    if let Some(name) = changes.name {
        active.name = Set(require_name(&name, "Vault")?);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(currency) = changes.currency {
        active.currency = Set(currency);
    }

    let vault = active.update(db).await?;
    info!(vault_id, "Vault updated");
    Ok(vault)
}

/// Deletes a vault, returning its money to the linked bank.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the vault is unlinked and still holds money
/// - [`Error::NotFound`] if the vault is not the user's
#[instrument(skip(db))]
pub async fn delete_vault(db: &DatabaseConnection, vault_id: i64, user_id: UserId) -> Result<()> {
    let txn = db.begin().await?;

    let vault = get_vault(&txn, vault_id, user_id).await?;
    match vault.bank_id {
        Some(bank_id) if vault.amount > Decimal::ZERO => {
            balance::credit(&txn, BalanceAccount::Bank(bank_id), vault.amount).await?;
        }
        None if vault.amount > Decimal::ZERO => {
            return Err(Error::invalid(format!(
                "Vault {vault_id} still holds {} and has no bank to return it to",
                vault.amount
            )));
        }
        _ => {}
    }

    // Version must match the read above or a concurrent movement won
    let result = Vault::delete_many()
        .filter(vault::Column::Id.eq(vault_id))
        .filter(vault::Column::Version.eq(vault.version))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::ConcurrentModification {
            entity: "vault",
            id: vault_id,
        });
    }

    txn.commit().await?;

    info!(vault_id, refunded = %vault.amount, bank_id = ?vault.bank_id, "Vault deleted");
    Ok(())
}

/// Takes `amount` out of the vault, returning it to the linked bank if there is one.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the amount is not positive
/// - [`Error::NotFound`] if the vault is not the user's
/// - [`Error::InsufficientBalance`] if the vault holds less than `amount`
#[instrument(skip(db))]
pub async fn withdraw(
    db: &DatabaseConnection,
    vault_id: i64,
    amount: Decimal,
    user_id: UserId,
) -> Result<VaultTransaction> {
    ensure_positive(amount, "Withdrawal amount")?;

    let txn = db.begin().await?;

    let vault = get_vault(&txn, vault_id, user_id).await?;
    let vault_change = balance::debit(&txn, BalanceAccount::Vault(vault_id), amount).await?;
    let bank = match vault.bank_id {
        Some(bank_id) => {
            let change = balance::credit(&txn, BalanceAccount::Bank(bank_id), amount).await?;
            Some(BankSnapshot::from_change(bank_id, change))
        }
        None => None,
    };

    txn.commit().await?;

    info!(vault_id, %amount, "Vault withdrawal completed");
    Ok(VaultTransaction {
        vault_id,
        amount,
        vault_before: vault_change.before,
        vault_after: vault_change.after,
        bank,
    })
}

/// Puts `amount` into the vault, taking it from the linked bank if there is one.
///
/// An unlinked vault accepts the deposit as cash from outside the ledger.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the amount is not positive
/// - [`Error::NotFound`] if the vault is not the user's
/// - [`Error::InsufficientBalance`] if the linked bank cannot cover `amount`
#[instrument(skip(db))]
pub async fn deposit(
    db: &DatabaseConnection,
    vault_id: i64,
    amount: Decimal,
    user_id: UserId,
) -> Result<VaultTransaction> {
    ensure_positive(amount, "Deposit amount")?;

    let txn = db.begin().await?;

    let vault = get_vault(&txn, vault_id, user_id).await?;
    let bank = match vault.bank_id {
        Some(bank_id) => {
            let change = balance::debit(&txn, BalanceAccount::Bank(bank_id), amount).await?;
            Some(BankSnapshot::from_change(bank_id, change))
        }
        None => None,
    };
    let vault_change = balance::credit(&txn, BalanceAccount::Vault(vault_id), amount).await?;

    txn.commit().await?;

    info!(vault_id, %amount, "Vault deposit completed");
    Ok(VaultTransaction {
        vault_id,
        amount,
        vault_before: vault_change.before,
        vault_after: vault_change.after,
        bank,
    })
}
