//! Shared test utilities for `LedgerBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*, sea_query::Expr};

use crate::{
    core::{
        UserId, bank, category, expense, extra_income, today,
        user::{self, NewUser},
    },
    entities::{self, BillStatus, ExtraIncome, ReceivableStatus, SettlementMethod},
    errors::Result,
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user identified by `email`.
///
/// # Defaults
/// * name: the part of the email before `@`
/// * salary: 0
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::UserModel> {
    let name = email.split('@').next().unwrap_or(email).to_string();
    user::create_user(
        db,
        NewUser {
            name,
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            salary: Decimal::ZERO,
        },
    )
    .await
}

/// Creates a bank owned by `user_id` with the given opening balance.
pub async fn create_test_bank(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
    balance: Decimal,
) -> Result<entities::BankModel> {
    bank::create_bank(
        db,
        UserId::new(user_id),
        bank::NewBank {
            name: name.to_string(),
            description: None,
            balance,
        },
    )
    .await
}

/// Sets up a test database with user `ana@example.com` and a "Checking" bank.
/// Returns `(db, user, bank)`.
pub async fn setup_with_bank(
    balance: Decimal,
) -> Result<(DatabaseConnection, entities::UserModel, entities::BankModel)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "ana@example.com").await?;
    let bank = create_test_bank(&db, user.id, "Checking", balance).await?;
    Ok((db, user, bank))
}

/// Creates a "Housing" category for the user.
pub async fn create_test_category(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<entities::CategoryModel> {
    category::create_category(db, UserId::new(user_id), "Housing").await
}

/// Creates an expense in a fresh "General" category.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    user_id: i64,
    value: Decimal,
    bank_id: Option<i64>,
) -> Result<entities::ExpenseModel> {
    let category = category::create_category(db, UserId::new(user_id), "General").await?;
    create_custom_expense(db, user_id, category.id, value, bank_id).await
}

/// Creates an expense in the given category.
pub async fn create_custom_expense(
    db: &DatabaseConnection,
    user_id: i64,
    category_id: i64,
    value: Decimal,
    bank_id: Option<i64>,
) -> Result<entities::ExpenseModel> {
    expense::create_expense(
        db,
        UserId::new(user_id),
        expense::NewExpense {
            name: "Test expense".to_string(),
            description: None,
            value,
            expense_date: today(),
            category_id,
            bank_id,
        },
    )
    .await
}

/// Creates an extra income paid into `bank_id`, in a fresh "Side jobs" category.
pub async fn create_test_income(
    db: &DatabaseConnection,
    user_id: i64,
    bank_id: i64,
    amount: Decimal,
) -> Result<entities::ExtraIncomeModel> {
    let category = category::create_category(db, UserId::new(user_id), "Side jobs").await?;
    extra_income::create_extra_income(
        db,
        UserId::new(user_id),
        extra_income::NewExtraIncome {
            name: "Freelance".to_string(),
            description: None,
            amount,
            date: today(),
            category_id: category.id,
            bank_id,
        },
    )
    .await
}

/// Unlinks an income from its bank, as if the link had been lost after creation.
pub async fn detach_income_bank(db: &DatabaseConnection, income_id: i64) -> Result<()> {
    ExtraIncome::update_many()
        .col_expr(
            entities::extra_income::Column::BankId,
            Expr::value(Option::<i64>::None),
        )
        .filter(entities::extra_income::Column::Id.eq(income_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Inserts an auto-pay bill directly, bypassing the due-date and status rules.
/// Use this to stage past-due or already-settled bills.
pub async fn insert_bill(
    db: &DatabaseConnection,
    user_id: i64,
    expense_id: i64,
    bank_id: Option<i64>,
    due_date: NaiveDate,
    status: BillStatus,
) -> Result<entities::BillModel> {
    let now = Utc::now();
    let payment_date = status.is_terminal().then_some(due_date);
    entities::bill::ActiveModel {
        user_id: Set(user_id),
        expense_id: Set(expense_id),
        bank_id: Set(bank_id),
        payment_method: Set(SettlementMethod::BankSlip),
        due_date: Set(due_date),
        auto_pay: Set(true),
        status: Set(status),
        payment_date: Set(payment_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a receivable directly, bypassing the due-date and status rules.
pub async fn insert_receivable(
    db: &DatabaseConnection,
    user_id: i64,
    extra_income_id: i64,
    due_date: NaiveDate,
    status: ReceivableStatus,
    automatic_bank_receipt: bool,
) -> Result<entities::ReceivableModel> {
    let now = Utc::now();
    let received_date = status.is_terminal().then_some(due_date);
    entities::receivable::ActiveModel {
        user_id: Set(user_id),
        extra_income_id: Set(extra_income_id),
        receipt_method: Set(SettlementMethod::BankTransfer),
        due_date: Set(due_date),
        automatic_bank_receipt: Set(automatic_bank_receipt),
        status: Set(status),
        received_date: Set(received_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Makes every UPDATE on `table` fail, to exercise rollback paths.
pub async fn fail_updates_on(db: &DatabaseConnection, table: &str) -> Result<()> {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER fail_{table}_updates BEFORE UPDATE ON {table} \
         BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END;"
    ))
    .await?;
    Ok(())
}

/// Runs `statement` inside every UPDATE on `banks`, as a competing writer that lands
/// between a read and the write that follows the balance change.
pub async fn on_bank_update(db: &DatabaseConnection, statement: &str) -> Result<()> {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER competing_write AFTER UPDATE ON banks BEGIN {statement}; END;"
    ))
    .await?;
    Ok(())
}
