//! Receivable business logic - accounts receivable and their lifecycle.
//!
//! Mirrors [`crate::core::bill`] for money coming in, with three deliberate differences:
//! - marking a receivable as received credits the income's bank when
//!   `automatic_bank_receipt` is set (marking a bill as paid never touches a bank)
//! - the auto-receipt job settles everything due on or before today, not only today
//! - moving the due date of an OVERDUE receivable back into the future makes it PENDING again

use chrono::{NaiveDate, Utc};
use sea_orm::{JoinType, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    core::{
        JobReport, Page, PageRequest, Settlement, UserId,
        balance::{self, BalanceAccount},
        bank::get_bank,
        category::get_category,
        ensure_not_past,
        extra_income::get_extra_income,
        today, unique_violation_as_invalid,
    },
    entities::{
        Bank, ExtraIncome, Receivable, ReceivableStatus, SettlementMethod, bank, extra_income,
        receivable,
    },
    errors::{Error, Result},
};

/// Input for [`create_receivable`].
#[derive(Debug, Clone)]
pub struct NewReceivable {
    /// One of the user's extra incomes without a receivable yet
    pub extra_income_id: i64,
    /// How the money is collected
    pub receipt_method: SettlementMethod,
    /// Due date, today or later
    pub due_date: NaiveDate,
    /// Whether settling credits the income's bank
    pub automatic_bank_receipt: bool,
}

/// Partial update for [`update_receivable`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ReceivableUpdate {
    /// New extra income to collect
    pub extra_income_id: Option<i64>,
    /// New receipt method
    pub receipt_method: Option<SettlementMethod>,
    /// New due date, today or later
    pub due_date: Option<NaiveDate>,
    /// New automatic-receipt flag
    pub automatic_bank_receipt: Option<bool>,
}

/// Conjunctive filters for [`list_receivables`].
#[derive(Debug, Clone, Default)]
pub struct ReceivableFilter {
    /// Only receivables in this status
    pub status: Option<ReceivableStatus>,
    /// Only receivables whose income is in this category
    pub category_id: Option<i64>,
    /// Only receivables whose income goes to this bank
    pub bank_id: Option<i64>,
    /// Only receivables due on or after this day
    pub due_from: Option<NaiveDate>,
    /// Only receivables due on or before this day
    pub due_to: Option<NaiveDate>,
}

/// Loads one of the user's receivables.
///
/// # Errors
/// Returns [`Error::NotFound`] if the receivable does not exist or belongs to someone else.
pub async fn get_receivable<C>(
    db: &C,
    receivable_id: i64,
    user_id: UserId,
) -> Result<receivable::Model>
where
    C: ConnectionTrait,
{
    Receivable::find_by_id(receivable_id)
        .filter(receivable::Column::UserId.eq(user_id.get()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("receivable", receivable_id))
}

async fn ensure_income_unclaimed<C>(
    db: &C,
    income_id: i64,
    except_receivable: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query =
        Receivable::find().filter(receivable::Column::ExtraIncomeId.eq(income_id));
    if let Some(receivable_id) = except_receivable {
        query = query.filter(receivable::Column::Id.ne(receivable_id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::invalid(format!(
            "Extra income {income_id} already has a receivable"
        )));
    }
    Ok(())
}

async fn transition<C>(
    db: &C,
    receivable_id: i64,
    expected: ReceivableStatus,
    next: ReceivableStatus,
    received_date: Option<NaiveDate>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut changes = receivable::ActiveModel {
        status: Set(next),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(date) = received_date {
        changes.received_date = Set(Some(date));
    }

    let result = Receivable::update_many()
        .set(changes)
        .filter(receivable::Column::Id.eq(receivable_id))
        .filter(receivable::Column::Status.eq(expected))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Credits the income's bank with the income amount.
///
/// Returns `false` without failing when the income has no bank or the bank is gone.
async fn credit_income_bank<C>(db: &C, receivable: &receivable::Model) -> Result<bool>
where
    C: ConnectionTrait,
{
    let income = ExtraIncome::find_by_id(receivable.extra_income_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("extra income", receivable.extra_income_id))?;

    let Some(bank_id) = income.bank_id else {
        warn!(
            receivable_id = receivable.id,
            "Income has no bank, skipping automatic credit"
        );
        return Ok(false);
    };
    let bank = Bank::find_by_id(bank_id)
        .filter(bank::Column::UserId.eq(receivable.user_id))
        .one(db)
        .await?;
    if bank.is_none() {
        warn!(
            receivable_id = receivable.id,
            bank_id, "Income bank no longer exists, skipping automatic credit"
        );
        return Ok(false);
    }

    balance::credit(db, BalanceAccount::Bank(bank_id), income.amount).await?;
    debug!(receivable_id = receivable.id, bank_id, amount = %income.amount, "Bank credited");
    Ok(true)
}

/// Creates a PENDING receivable for one of the user's extra incomes.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the due date is in the past or the income already has a
///   receivable
/// - [`Error::NotFound`] if the income is not the user's
#[instrument(skip(db))]
pub async fn create_receivable(
    db: &DatabaseConnection,
    user_id: UserId,
    new_receivable: NewReceivable,
) -> Result<receivable::Model> {
    ensure_not_past(new_receivable.due_date, today())?;
    crate::core::user::get_user(db, user_id).await?;
    get_extra_income(db, new_receivable.extra_income_id, user_id).await?;
    ensure_income_unclaimed(db, new_receivable.extra_income_id, None).await?;

    let now = Utc::now();
    let receivable = receivable::ActiveModel {
        user_id: Set(user_id.get()),
        extra_income_id: Set(new_receivable.extra_income_id),
        receipt_method: Set(new_receivable.receipt_method),
        due_date: Set(new_receivable.due_date),
        automatic_bank_receipt: Set(new_receivable.automatic_bank_receipt),
        status: Set(ReceivableStatus::Pending),
        received_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        unique_violation_as_invalid(e, || {
            format!(
                "Extra income {} already has a receivable",
                new_receivable.extra_income_id
            )
        })
    })?;

    info!(receivable_id = receivable.id, "Receivable created");
    Ok(receivable)
}

/// Lists one page of the user's receivables matching every filter that is set,
/// ordered by due date.
///
/// # Errors
/// Returns [`Error::NotFound`] if the filter names a category or bank that is not the user's.
#[instrument(skip(db))]
pub async fn list_receivables(
    db: &DatabaseConnection,
    user_id: UserId,
    filter: ReceivableFilter,
    page: PageRequest,
) -> Result<Page<receivable::Model>> {
    let mut query = Receivable::find().filter(receivable::Column::UserId.eq(user_id.get()));

    if let Some(status) = filter.status {
        query = query.filter(receivable::Column::Status.eq(status));
    }
    if filter.category_id.is_some() || filter.bank_id.is_some() {
        query = query.join(JoinType::InnerJoin, receivable::Relation::ExtraIncome.def());
    }
    if let Some(category_id) = filter.category_id {
        get_category(db, category_id, user_id).await?;
        query = query.filter(extra_income::Column::CategoryId.eq(category_id));
    }
    if let Some(bank_id) = filter.bank_id {
        get_bank(db, bank_id, user_id).await?;
        query = query.filter(extra_income::Column::BankId.eq(bank_id));
    }
    if let Some(from) = filter.due_from {
        query = query.filter(receivable::Column::DueDate.gte(from));
    }
    if let Some(to) = filter.due_to {
        query = query.filter(receivable::Column::DueDate.lte(to));
    }

    let paginator = query
        .order_by_asc(receivable::Column::DueDate)
        .order_by_asc(receivable::Column::Id)
        .paginate(db, page.size);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page.page).await?;

    Ok(Page {
        items,
        page: page.page,
        size: page.size,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Applies the set fields of `changes` to a receivable that is not yet received.
///
/// An OVERDUE receivable whose due date moves to today or later becomes PENDING again.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the receivable is RECEIVED / RECEIVED_LATE, the new due
///   date is in the past, or the new income already has a receivable
/// - [`Error::NotFound`] if the receivable or income is not the user's
#[instrument(skip(db))]
pub async fn update_receivable(
    db: &DatabaseConnection,
    receivable_id: i64,
    user_id: UserId,
    changes: ReceivableUpdate,
) -> Result<receivable::Model> {
    let today = today();
    let txn = db.begin().await?;

    let current = get_receivable(&txn, receivable_id, user_id).await?;
    if current.status.is_terminal() {
        return Err(Error::invalid(format!(
            "Receivable {receivable_id} is already received and cannot be changed"
        )));
    }

    let mut active: receivable::ActiveModel = current.clone().into();
    let mut changed = false;

    if let Some(income_id) = changes.extra_income_id {
        if income_id != current.extra_income_id {
            get_extra_income(&txn, income_id, user_id).await?;
            ensure_income_unclaimed(&txn, income_id, Some(receivable_id)).await?;
            active.extra_income_id = Set(income_id);
            changed = true;
        }
    }

    if let Some(method) = changes.receipt_method {
        if method != current.receipt_method {
            active.receipt_method = Set(method);
            changed = true;
        }
    }

    if let Some(due_date) = changes.due_date {
        ensure_not_past(due_date, today)?;
        if due_date != current.due_date {
            active.due_date = Set(due_date);
            if current.status == ReceivableStatus::Overdue {
                active.status = Set(ReceivableStatus::Pending);
                debug!(receivable_id, "Due date extended, receivable is pending again");
            }
            changed = true;
        }
    }

    if let Some(automatic) = changes.automatic_bank_receipt {
        if automatic != current.automatic_bank_receipt {
            active.automatic_bank_receipt = Set(automatic);
            changed = true;
        }
    }

    if !changed {
        debug!(receivable_id, "Receivable update carried no changes");
        return Ok(current);
    }
    active.updated_at = Set(Utc::now());

    let result = Receivable::update_many()
        .set(active)
        .filter(receivable::Column::Id.eq(receivable_id))
        .filter(receivable::Column::Status.eq(current.status))
        .exec(&txn)
        .await
        .map_err(|e| {
            unique_violation_as_invalid(e, || {
                let income_id = changes.extra_income_id.unwrap_or(current.extra_income_id);
                format!("Extra income {income_id} already has a receivable")
            })
        })?;
    if result.rows_affected == 0 {
        return Err(Error::invalid(format!(
            "Receivable {receivable_id} changed status while being updated"
        )));
    }

    let updated = get_receivable(&txn, receivable_id, user_id).await?;
    txn.commit().await?;

    info!(receivable_id, "Receivable updated");
    Ok(updated)
}

/// Records that the money was received today.
///
/// PENDING becomes RECEIVED and OVERDUE becomes RECEIVED_LATE. With
/// `automatic_bank_receipt` set, the income's bank is credited in the same transaction; a
/// missing bank is logged and does not block the status change.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the receivable is already RECEIVED / RECEIVED_LATE
/// - [`Error::NotFound`] if the receivable is not the user's
#[instrument(skip(db))]
pub async fn mark_receivable_received(
    db: &DatabaseConnection,
    receivable_id: i64,
    user_id: UserId,
) -> Result<receivable::Model> {
    let today = today();
    let txn = db.begin().await?;

    let current = get_receivable(&txn, receivable_id, user_id).await?;
    let next = match current.status {
        ReceivableStatus::Received | ReceivableStatus::ReceivedLate => {
            return Err(Error::invalid(format!(
                "Receivable {receivable_id} is already received"
            )));
        }
        ReceivableStatus::Pending => ReceivableStatus::Received,
        ReceivableStatus::Overdue => ReceivableStatus::ReceivedLate,
    };

    // Only a missing bank is skipped; any other credit failure aborts the receipt
    if current.automatic_bank_receipt {
        credit_income_bank(&txn, &current).await?;
    }
    if !transition(&txn, receivable_id, current.status, next, Some(today)).await? {
        return Err(Error::invalid(format!(
            "Receivable {receivable_id} was settled concurrently"
        )));
    }

    let updated = get_receivable(&txn, receivable_id, user_id).await?;
    txn.commit().await?;

    info!(receivable_id, status = ?updated.status, "Receivable marked as received");
    Ok(updated)
}

/// Deletes a receivable. Money already credited to a bank stays there.
#[instrument(skip(db))]
pub async fn delete_receivable(
    db: &DatabaseConnection,
    receivable_id: i64,
    user_id: UserId,
) -> Result<()> {
    let receivable = get_receivable(db, receivable_id, user_id).await?;
    receivable.delete(db).await?;
    info!(receivable_id, "Receivable deleted");
    Ok(())
}

/// Marks every PENDING receivable due before today as OVERDUE.
pub async fn process_overdue_receivables(db: &DatabaseConnection) -> Result<JobReport> {
    process_overdue_receivables_as_of(db, today()).await
}

/// Marks every PENDING receivable due before `today` as OVERDUE, one row at a time.
#[instrument(skip(db))]
pub async fn process_overdue_receivables_as_of(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<JobReport> {
    let candidates = Receivable::find()
        .filter(receivable::Column::Status.eq(ReceivableStatus::Pending))
        .filter(receivable::Column::DueDate.lt(today))
        .all(db)
        .await?;

    let mut report = JobReport {
        examined: candidates.len(),
        ..JobReport::default()
    };

    for receivable in candidates {
        match transition(
            db,
            receivable.id,
            ReceivableStatus::Pending,
            ReceivableStatus::Overdue,
            None,
        )
        .await
        {
            Ok(true) => report.processed += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                error!(
                    receivable_id = receivable.id,
                    "Failed to mark receivable as overdue: {e}"
                );
                report.failed += 1;
            }
        }
    }

    info!(?report, "Overdue receivable sweep finished");
    Ok(report)
}

/// Settles every automatic receivable due on or before today.
pub async fn process_auto_receipts(db: &DatabaseConnection) -> Result<JobReport> {
    process_auto_receipts_as_of(db, today()).await
}

/// Settles every PENDING receivable with `automatic_bank_receipt` due on or before `today`,
/// crediting the income's bank. Receivables without a bank stay PENDING.
#[instrument(skip(db))]
pub async fn process_auto_receipts_as_of(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<JobReport> {
    let candidates = Receivable::find()
        .filter(receivable::Column::Status.eq(ReceivableStatus::Pending))
        .filter(receivable::Column::AutomaticBankReceipt.eq(true))
        .filter(receivable::Column::DueDate.lte(today))
        .all(db)
        .await?;

    let mut report = JobReport {
        examined: candidates.len(),
        ..JobReport::default()
    };

    for receivable in candidates {
        match auto_receive(db, receivable.id, today).await {
            Ok(Settlement::Settled) => report.processed += 1,
            Ok(Settlement::Skipped) => report.skipped += 1,
            Err(e) => {
                error!(receivable_id = receivable.id, "Automatic receipt failed: {e}");
                report.failed += 1;
            }
        }
    }

    info!(?report, "Auto-receipt run finished");
    Ok(report)
}

/// Settles a single receivable: credit and status change commit together or not at all.
pub(crate) async fn auto_receive(
    db: &DatabaseConnection,
    receivable_id: i64,
    today: NaiveDate,
) -> Result<Settlement> {
    let txn = db.begin().await?;

    let Some(receivable) = Receivable::find_by_id(receivable_id).one(&txn).await? else {
        return Ok(Settlement::Skipped);
    };
    if receivable.status != ReceivableStatus::Pending
        || !receivable.automatic_bank_receipt
        || receivable.due_date > today
    {
        debug!(receivable_id, status = ?receivable.status, "Receivable no longer eligible");
        return Ok(Settlement::Skipped);
    }

    if !credit_income_bank(&txn, &receivable).await? {
        return Ok(Settlement::Skipped);
    }
    if !transition(
        &txn,
        receivable_id,
        ReceivableStatus::Pending,
        ReceivableStatus::Received,
        Some(today),
    )
    .await?
    {
        txn.rollback().await?;
        return Ok(Settlement::Skipped);
    }

    txn.commit().await?;
    info!(receivable_id, "Receivable settled automatically");
    Ok(Settlement::Settled)
}
