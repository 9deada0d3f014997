//! Extra income entity - A recorded inflow that a receivable can settle.
//!
//! A bank is required when the income is created. The column stays nullable so a
//! receivable whose income lost its bank can still be settled without a credit.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extra income database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "extra_incomes")]
pub struct Model {
    /// Unique identifier for the income
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short name (e.g., "Freelance")
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Positive amount expected
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    /// Date the income was recorded for
    pub date: Date,
    /// Category the income belongs to
    pub category_id: i64,
    /// Bank that receives the money
    pub bank_id: Option<i64>,
    /// Owner of the income
    pub user_id: i64,
}

/// Defines relationships between `ExtraIncome` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each income belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// Deleting a bank removes the incomes linked to it
    #[sea_orm(
        belongs_to = "super::bank::Entity",
        from = "Column::BankId",
        to = "super::bank::Column::Id",
        on_delete = "Cascade"
    )]
    Bank,
    /// Each income belongs to one user
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
