//! Receivable entity - An account receivable that collects one extra income by a due date.
//!
//! Mirrors the bill lifecycle with RECEIVED / RECEIVED_LATE as terminal states.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::settlement_method::SettlementMethod;

/// Lifecycle state of a receivable
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(14))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceivableStatus {
    /// Waiting for the money, due date not yet passed
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Due date passed without receipt
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
    /// Received on or before the due date
    #[sea_orm(string_value = "RECEIVED")]
    Received,
    /// Received after the due date
    #[sea_orm(string_value = "RECEIVED_LATE")]
    ReceivedLate,
}

impl ReceivableStatus {
    /// States that still accept transitions.
    pub const OPEN: [Self; 2] = [Self::Pending, Self::Overdue];

    /// Whether no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Received | Self::ReceivedLate)
    }
}

/// Receivable database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receivables")]
pub struct Model {
    /// Unique identifier for the receivable
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the receivable
    pub user_id: i64,
    /// Income this receivable collects, at most one receivable per income
    #[sea_orm(unique)]
    pub extra_income_id: i64,
    /// How the money is collected
    pub receipt_method: SettlementMethod,
    /// Last day the money is expected on time
    pub due_date: Date,
    /// Whether settling the receivable credits the income's bank
    pub automatic_bank_receipt: bool,
    /// Current lifecycle state
    pub status: ReceivableStatus,
    /// Day the money was received, set together with a terminal status
    pub received_date: Option<Date>,
    /// When the receivable was created
    pub created_at: DateTimeUtc,
    /// When the receivable was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Receivable and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each receivable collects one extra income
    #[sea_orm(
        belongs_to = "super::extra_income::Entity",
        from = "Column::ExtraIncomeId",
        to = "super::extra_income::Column::Id",
        on_delete = "Cascade"
    )]
    ExtraIncome,
    /// Each receivable belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::extra_income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExtraIncome.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
