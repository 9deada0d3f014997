//! Bill business logic - accounts payable and their lifecycle.
//!
//! A bill settles one expense by a due date. The daily jobs move PENDING bills to OVERDUE
//! once the due date has passed and pay auto-pay bills from their bank on the due date.
//! Every status change is a compare-and-set on the current status, so a manual payment and
//! the auto-pay job racing on the same bill cannot both succeed.

use chrono::{NaiveDate, Utc};
use sea_orm::{JoinType, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    core::{
        JobReport, Settlement, UserId,
        balance::{self, BalanceAccount},
        bank::get_bank,
        category::get_category,
        ensure_not_past,
        expense::get_expense,
        today, unique_violation_as_invalid,
    },
    entities::{Bank, Bill, BillStatus, Expense, SettlementMethod, bank, bill, expense},
    errors::{Error, Result},
};

/// Input for [`create_bill`].
#[derive(Debug, Clone)]
pub struct NewBill {
    /// One of the user's expenses without a bill yet
    pub expense_id: i64,
    /// One of the user's banks to pay from
    pub bank_id: Option<i64>,
    /// How the bill is paid
    pub payment_method: SettlementMethod,
    /// Due date, today or later
    pub due_date: NaiveDate,
    /// Whether the daily job pays the bill on its due date
    pub auto_pay: bool,
}

/// Partial update for [`update_bill`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct BillUpdate {
    /// New expense to settle
    pub expense_id: Option<i64>,
    /// `Some(None)` removes the bank, `Some(Some(id))` links another one
    pub bank_id: Option<Option<i64>>,
    /// New payment method
    pub payment_method: Option<SettlementMethod>,
    /// New due date, today or later
    pub due_date: Option<NaiveDate>,
    /// New auto-pay flag
    pub auto_pay: Option<bool>,
}

/// Conjunctive filters for [`list_bills`].
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    /// Only bills in this status
    pub status: Option<BillStatus>,
    /// Only bills whose expense is in this category
    pub category_id: Option<i64>,
    /// Only bills paid from this bank
    pub bank_id: Option<i64>,
    /// Only bills due on or after this day
    pub due_from: Option<NaiveDate>,
    /// Only bills due on or before this day
    pub due_to: Option<NaiveDate>,
}

/// Loads one of the user's bills.
///
/// # Errors
/// Returns [`Error::NotFound`] if the bill does not exist or belongs to someone else.
pub async fn get_bill<C>(db: &C, bill_id: i64, user_id: UserId) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    Bill::find_by_id(bill_id)
        .filter(bill::Column::UserId.eq(user_id.get()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("bill", bill_id))
}

async fn ensure_expense_unbilled<C>(db: &C, expense_id: i64, except_bill: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Bill::find().filter(bill::Column::ExpenseId.eq(expense_id));
    if let Some(bill_id) = except_bill {
        query = query.filter(bill::Column::Id.ne(bill_id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::invalid(format!(
            "Expense {expense_id} already has a bill"
        )));
    }
    Ok(())
}

/// Moves a bill from `expected` to `next`, returning `false` if the bill is no longer in
/// `expected` (someone else transitioned it first).
async fn transition<C>(
    db: &C,
    bill_id: i64,
    expected: BillStatus,
    next: BillStatus,
    payment_date: Option<NaiveDate>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut changes = bill::ActiveModel {
        status: Set(next),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(date) = payment_date {
        changes.payment_date = Set(Some(date));
    }

    let result = Bill::update_many()
        .set(changes)
        .filter(bill::Column::Id.eq(bill_id))
        .filter(bill::Column::Status.eq(expected))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Status a manual payment on `today` moves the bill to.
fn paid_status(bill: &bill::Model, today: NaiveDate) -> Result<BillStatus> {
    match bill.status {
        BillStatus::Paid | BillStatus::PaidLate => Err(Error::invalid(format!(
            "Bill {} is already paid",
            bill.id
        ))),
        BillStatus::Overdue => Ok(BillStatus::PaidLate),
        BillStatus::Pending if today <= bill.due_date => Ok(BillStatus::Paid),
        BillStatus::Pending => Ok(BillStatus::PaidLate),
    }
}

/// Creates a PENDING bill for one of the user's expenses.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the due date is in the past or the expense already has a bill
/// - [`Error::NotFound`] if the expense or bank is not the user's
#[instrument(skip(db))]
pub async fn create_bill(
    db: &DatabaseConnection,
    user_id: UserId,
    new_bill: NewBill,
) -> Result<bill::Model> {
    ensure_not_past(new_bill.due_date, today())?;
    crate::core::user::get_user(db, user_id).await?;
    get_expense(db, new_bill.expense_id, user_id).await?;
    if let Some(bank_id) = new_bill.bank_id {
        get_bank(db, bank_id, user_id).await?;
    }
    ensure_expense_unbilled(db, new_bill.expense_id, None).await?;

    let now = Utc::now();
    let bill = bill::ActiveModel {
        user_id: Set(user_id.get()),
        expense_id: Set(new_bill.expense_id),
        bank_id: Set(new_bill.bank_id),
        payment_method: Set(new_bill.payment_method),
        due_date: Set(new_bill.due_date),
        auto_pay: Set(new_bill.auto_pay),
        status: Set(BillStatus::Pending),
        payment_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        unique_violation_as_invalid(e, || {
            format!("Expense {} already has a bill", new_bill.expense_id)
        })
    })?;

    info!(bill_id = bill.id, "Bill created");
    Ok(bill)
}

/// Lists the user's bills matching every filter that is set, ordered by due date.
///
/// # Errors
/// Returns [`Error::NotFound`] if the filter names a category or bank that is not the user's.
#[instrument(skip(db))]
pub async fn list_bills(
    db: &DatabaseConnection,
    user_id: UserId,
    filter: BillFilter,
) -> Result<Vec<bill::Model>> {
    let mut query = Bill::find().filter(bill::Column::UserId.eq(user_id.get()));

    if let Some(status) = filter.status {
        query = query.filter(bill::Column::Status.eq(status));
    }
    if let Some(category_id) = filter.category_id {
        get_category(db, category_id, user_id).await?;
        query = query
            .join(JoinType::InnerJoin, bill::Relation::Expense.def())
            .filter(expense::Column::CategoryId.eq(category_id));
    }
    if let Some(bank_id) = filter.bank_id {
        get_bank(db, bank_id, user_id).await?;
        query = query.filter(bill::Column::BankId.eq(bank_id));
    }
    if let Some(from) = filter.due_from {
        query = query.filter(bill::Column::DueDate.gte(from));
    }
    if let Some(to) = filter.due_to {
        query = query.filter(bill::Column::DueDate.lte(to));
    }

    query
        .order_by_asc(bill::Column::DueDate)
        .order_by_asc(bill::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies the set fields of `changes` to a bill that is not yet paid.
///
/// Nothing is written when every supplied value equals the current one.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the bill is PAID / PAID_LATE, the new due date is in the
///   past, or the new expense already has a bill
/// - [`Error::NotFound`] if the bill, expense or bank is not the user's
#[instrument(skip(db))]
pub async fn update_bill(
    db: &DatabaseConnection,
    bill_id: i64,
    user_id: UserId,
    changes: BillUpdate,
) -> Result<bill::Model> {
    let today = today();
    let txn = db.begin().await?;

    let current = get_bill(&txn, bill_id, user_id).await?;
    if current.status.is_terminal() {
        return Err(Error::invalid(format!(
            "Bill {bill_id} is already paid and cannot be changed"
        )));
    }

    let mut active: bill::ActiveModel = current.clone().into();
    let mut changed = false;

    if let Some(expense_id) = changes.expense_id {
        if expense_id != current.expense_id {
            get_expense(&txn, expense_id, user_id).await?;
            ensure_expense_unbilled(&txn, expense_id, Some(bill_id)).await?;
            active.expense_id = Set(expense_id);
            changed = true;
        }
    }

    match changes.bank_id {
        None => {}
        Some(None) => {
            if current.bank_id.is_some() {
                active.bank_id = Set(None);
                changed = true;
            }
        }
        Some(Some(bank_id)) => {
            if current.bank_id != Some(bank_id) {
                get_bank(&txn, bank_id, user_id).await?;
                active.bank_id = Set(Some(bank_id));
                changed = true;
            }
        }
    }

    if let Some(method) = changes.payment_method {
        if method != current.payment_method {
            active.payment_method = Set(method);
            changed = true;
        }
    }

    if let Some(due_date) = changes.due_date {
        ensure_not_past(due_date, today)?;
        if due_date != current.due_date {
            active.due_date = Set(due_date);
            changed = true;
        }
    }

    if let Some(auto_pay) = changes.auto_pay {
        if auto_pay != current.auto_pay {
            active.auto_pay = Set(auto_pay);
            changed = true;
        }
    }

    if !changed {
        debug!(bill_id, "Bill update carried no changes");
        return Ok(current);
    }
    active.updated_at = Set(Utc::now());

    let result = Bill::update_many()
        .set(active)
        .filter(bill::Column::Id.eq(bill_id))
        .filter(bill::Column::Status.is_in(BillStatus::OPEN))
        .exec(&txn)
        .await
        .map_err(|e| {
            unique_violation_as_invalid(e, || {
                let expense_id = changes.expense_id.unwrap_or(current.expense_id);
                format!("Expense {expense_id} already has a bill")
            })
        })?;
    if result.rows_affected == 0 {
        return Err(Error::invalid(format!(
            "Bill {bill_id} was paid while being updated"
        )));
    }

    let updated = get_bill(&txn, bill_id, user_id).await?;
    txn.commit().await?;

    info!(bill_id, "Bill updated");
    Ok(updated)
}

/// Deletes a bill. The expense and any bank balance are left as they are.
#[instrument(skip(db))]
pub async fn delete_bill(db: &DatabaseConnection, bill_id: i64, user_id: UserId) -> Result<()> {
    let bill = get_bill(db, bill_id, user_id).await?;
    bill.delete(db).await?;
    info!(bill_id, "Bill deleted");
    Ok(())
}

/// Records that the bill was paid outside the system today.
///
/// The bill becomes PAID when paid on or before its due date and PAID_LATE otherwise
/// (always PAID_LATE from OVERDUE). No bank balance is touched.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the bill is already PAID / PAID_LATE
/// - [`Error::NotFound`] if the bill is not the user's
#[instrument(skip(db))]
pub async fn mark_bill_paid(
    db: &DatabaseConnection,
    bill_id: i64,
    user_id: UserId,
) -> Result<bill::Model> {
    let today = today();
    let txn = db.begin().await?;

    let current = get_bill(&txn, bill_id, user_id).await?;
    let next = paid_status(&current, today)?;
    if !transition(&txn, bill_id, current.status, next, Some(today)).await? {
        return Err(Error::invalid(format!(
            "Bill {bill_id} was settled concurrently"
        )));
    }

    let updated = get_bill(&txn, bill_id, user_id).await?;
    txn.commit().await?;

    info!(bill_id, status = ?updated.status, "Bill marked as paid");
    Ok(updated)
}

/// Marks every PENDING bill due before today as OVERDUE.
pub async fn process_overdue_bills(db: &DatabaseConnection) -> Result<JobReport> {
    process_overdue_bills_as_of(db, today()).await
}

/// Marks every PENDING bill due before `today` as OVERDUE.
///
/// Each bill is updated on its own; a failure is logged and counted without stopping the
/// sweep. Bills already OVERDUE or paid are never matched, so re-running is harmless.
#[instrument(skip(db))]
pub async fn process_overdue_bills_as_of(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<JobReport> {
    let candidates = Bill::find()
        .filter(bill::Column::Status.eq(BillStatus::Pending))
        .filter(bill::Column::DueDate.lt(today))
        .all(db)
        .await?;

    let mut report = JobReport {
        examined: candidates.len(),
        ..JobReport::default()
    };

    for bill in candidates {
        match transition(db, bill.id, BillStatus::Pending, BillStatus::Overdue, None).await {
            Ok(true) => {
                debug!(bill_id = bill.id, due_date = %bill.due_date, "Bill is overdue");
                report.processed += 1;
            }
            Ok(false) => report.skipped += 1,
            Err(e) => {
                error!(bill_id = bill.id, "Failed to mark bill as overdue: {e}");
                report.failed += 1;
            }
        }
    }

    info!(?report, "Overdue bill sweep finished");
    Ok(report)
}

/// Pays every auto-pay bill due today from its bank.
pub async fn process_auto_pay_bills(db: &DatabaseConnection) -> Result<JobReport> {
    process_auto_pay_bills_as_of(db, today()).await
}

/// Pays every PENDING auto-pay bill due exactly on `today` from its bank.
///
/// Bills whose bank cannot cover the expense stay PENDING and are picked up again by the
/// next run (unless the overdue sweep gets to them first).
#[instrument(skip(db))]
pub async fn process_auto_pay_bills_as_of(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<JobReport> {
    let candidates = Bill::find()
        .filter(bill::Column::AutoPay.eq(true))
        .filter(bill::Column::Status.eq(BillStatus::Pending))
        .filter(bill::Column::DueDate.eq(today))
        .filter(bill::Column::BankId.is_not_null())
        .all(db)
        .await?;

    let mut report = JobReport {
        examined: candidates.len(),
        ..JobReport::default()
    };

    for bill in candidates {
        match auto_pay_bill(db, bill.id, today).await {
            Ok(Settlement::Settled) => report.processed += 1,
            Ok(Settlement::Skipped) => report.skipped += 1,
            Err(e) => {
                error!(bill_id = bill.id, "Automatic payment failed: {e}");
                report.failed += 1;
            }
        }
    }

    info!(?report, "Auto-pay run finished");
    Ok(report)
}

/// Pays a single bill from its bank: debit and status change commit together or not at all.
pub(crate) async fn auto_pay_bill(
    db: &DatabaseConnection,
    bill_id: i64,
    today: NaiveDate,
) -> Result<Settlement> {
    let txn = db.begin().await?;

    let Some(bill) = Bill::find_by_id(bill_id).one(&txn).await? else {
        return Ok(Settlement::Skipped);
    };
    if bill.status != BillStatus::Pending || !bill.auto_pay || bill.due_date != today {
        debug!(bill_id, status = ?bill.status, "Bill no longer eligible for auto-pay");
        return Ok(Settlement::Skipped);
    }
    let Some(bank_id) = bill.bank_id else {
        warn!(bill_id, "Auto-pay bill has no bank, skipping");
        return Ok(Settlement::Skipped);
    };
    let Some(bank) = Bank::find_by_id(bank_id)
        .filter(bank::Column::UserId.eq(bill.user_id))
        .one(&txn)
        .await?
    else {
        warn!(bill_id, bank_id, "Auto-pay bank no longer exists, skipping");
        return Ok(Settlement::Skipped);
    };
    let expense = Expense::find_by_id(bill.expense_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("expense", bill.expense_id))?;

    if bank.balance < expense.value {
        warn!(
            bill_id,
            bank_id,
            balance = %bank.balance,
            required = %expense.value,
            "Insufficient balance for auto-pay, bill stays pending"
        );
        return Ok(Settlement::Skipped);
    }

    balance::debit(&txn, BalanceAccount::Bank(bank_id), expense.value).await?;
    if !transition(
        &txn,
        bill_id,
        BillStatus::Pending,
        BillStatus::Paid,
        Some(today),
    )
    .await?
    {
        txn.rollback().await?;
        return Ok(Settlement::Skipped);
    }

    txn.commit().await?;
    info!(bill_id, bank_id, amount = %expense.value, "Bill paid automatically");
    Ok(Settlement::Settled)
}
