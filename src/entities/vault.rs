//! Vault entity - A savings jar, optionally backed 1:1 by money taken from a bank.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Vault database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vaults")]
pub struct Model {
    /// Unique identifier for the vault
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name (e.g., "Emergency fund")
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Money currently held, never negative
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    /// Currency tag, free text with no conversion semantics
    pub currency: String,
    /// Bank the money came from and returns to
    pub bank_id: Option<i64>,
    /// Optimistic concurrency counter, incremented on every amount write
    pub version: i32,
    /// Owner of the vault
    pub user_id: i64,
}

/// Defines relationships between Vault and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A vault may be backed by one bank
    #[sea_orm(
        belongs_to = "super::bank::Entity",
        from = "Column::BankId",
        to = "super::bank::Column::Id",
        on_delete = "SetNull"
    )]
    Bank,
    /// Each vault belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::bank::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bank.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
