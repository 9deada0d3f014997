//! Expense entity - A recorded outflow that a bill can settle.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short name (e.g., "Rent")
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Positive amount owed
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub value: Decimal,
    /// Date the expense was incurred
    pub expense_date: Date,
    /// Category the expense belongs to
    pub category_id: i64,
    /// Bank the expense is associated with, if any
    pub bank_id: Option<i64>,
    /// Owner of the expense
    pub user_id: i64,
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each expense belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// Deleting a bank removes the expenses linked to it
    #[sea_orm(
        belongs_to = "super::bank::Entity",
        from = "Column::BankId",
        to = "super::bank::Column::Id",
        on_delete = "Cascade"
    )]
    Bank,
    /// Each expense belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
