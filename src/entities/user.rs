//! User entity - The owner of every other row in the ledger.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login e-mail, unique across users
    #[sea_orm(unique)]
    pub email: String,
    /// Password hash produced by the identity provider
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Monthly salary
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub salary: Decimal,
    /// When the user was created
    pub created_at: DateTimeUtc,
    /// When the user was last modified
    pub updated_at: DateTimeUtc,
}

/// One user owns many banks, vaults, bills and so on. The foreign keys live on the owned side.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many banks
    #[sea_orm(has_many = "super::bank::Entity")]
    Banks,
}

impl Related<super::bank::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Banks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
