//! How a bill is paid or a receivable is collected.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Settlement channel shared by bills and receivables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementMethod {
    /// Physical cash
    #[sea_orm(string_value = "CASH")]
    Cash,
    /// Debit card
    #[sea_orm(string_value = "DEBIT_CARD")]
    DebitCard,
    /// Credit card
    #[sea_orm(string_value = "CREDIT_CARD")]
    CreditCard,
    /// Wire or account-to-account transfer
    #[sea_orm(string_value = "BANK_TRANSFER")]
    BankTransfer,
    /// Instant payment
    #[sea_orm(string_value = "PIX")]
    Pix,
    /// Printed payment slip
    #[sea_orm(string_value = "BANK_SLIP")]
    BankSlip,
}
