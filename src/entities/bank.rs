//! Bank entity - A bank account whose balance is the main source and sink of money.
//!
//! The balance is only ever written by the balance mutator in `core::balance`,
//! which bumps `version` on every write so concurrent writers can detect each other.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bank database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "banks")]
pub struct Model {
    /// Unique identifier for the bank
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name (e.g., "Checking")
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Current balance, never negative
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub balance: Decimal,
    /// Optimistic concurrency counter, incremented on every balance write
    pub version: i32,
    /// Owner of the bank
    pub user_id: i64,
}

/// Defines relationships between Bank and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bank belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// One bank funds many vaults
    #[sea_orm(has_many = "super::vault::Entity")]
    Vaults,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::vault::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vaults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
