//! Bill entity - An account payable that settles one expense by a due date.
//!
//! Status moves PENDING -> OVERDUE -> PAID_LATE, or PENDING -> PAID / PAID_LATE.
//! PAID and PAID_LATE are terminal: a bill in either state is never modified again.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::settlement_method::SettlementMethod;

/// Lifecycle state of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(12))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    /// Waiting for payment, due date not yet passed
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Due date passed without payment
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
    /// Paid on or before the due date
    #[sea_orm(string_value = "PAID")]
    Paid,
    /// Paid after the due date
    #[sea_orm(string_value = "PAID_LATE")]
    PaidLate,
}

impl BillStatus {
    /// States that still accept transitions.
    pub const OPEN: [Self; 2] = [Self::Pending, Self::Overdue];

    /// Whether no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::PaidLate)
    }
}

/// Bill database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    /// Unique identifier for the bill
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the bill
    pub user_id: i64,
    /// Expense this bill pays, at most one bill per expense
    #[sea_orm(unique)]
    pub expense_id: i64,
    /// Bank the payment is drawn from
    pub bank_id: Option<i64>,
    /// How the bill is paid
    pub payment_method: SettlementMethod,
    /// Last day the bill can be paid on time
    pub due_date: Date,
    /// Whether the daily job pays the bill from its bank on the due date
    pub auto_pay: bool,
    /// Current lifecycle state
    pub status: BillStatus,
    /// Day the bill was paid, set together with a terminal status
    pub payment_date: Option<Date>,
    /// When the bill was created
    pub created_at: DateTimeUtc,
    /// When the bill was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Bill and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bill settles one expense
    #[sea_orm(
        belongs_to = "super::expense::Entity",
        from = "Column::ExpenseId",
        to = "super::expense::Column::Id",
        on_delete = "Cascade"
    )]
    Expense,
    /// Payment source; a deleted bank leaves the bill without one
    #[sea_orm(
        belongs_to = "super::bank::Entity",
        from = "Column::BankId",
        to = "super::bank::Column::Id",
        on_delete = "SetNull"
    )]
    Bank,
    /// Each bill belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::bank::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bank.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
