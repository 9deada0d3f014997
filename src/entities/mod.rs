//! Entity module - Contains all SeaORM entity definitions for the ledger store.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bank;
pub mod bill;
pub mod category;
pub mod expense;
pub mod extra_income;
pub mod receivable;
pub mod settlement_method;
pub mod user;
pub mod vault;

// Re-export specific types to avoid conflicts
pub use bank::{Column as BankColumn, Entity as Bank, Model as BankModel};
pub use bill::{BillStatus, Column as BillColumn, Entity as Bill, Model as BillModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use extra_income::{
    Column as ExtraIncomeColumn, Entity as ExtraIncome, Model as ExtraIncomeModel,
};
pub use receivable::{
    Column as ReceivableColumn, Entity as Receivable, Model as ReceivableModel, ReceivableStatus,
};
pub use settlement_method::SettlementMethod;
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use vault::{Column as VaultColumn, Entity as Vault, Model as VaultModel};
