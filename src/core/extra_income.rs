//! Extra income business logic - recorded inflows that receivables settle.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use tracing::instrument;

use crate::{
    core::{UserId, bank::get_bank, category::get_category},
    entities::{ExtraIncome, extra_income},
    errors::{Error, Result},
};

/// Input for [`create_extra_income`].
#[derive(Debug, Clone)]
pub struct NewExtraIncome {
    /// Short name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Positive amount
    pub amount: Decimal,
    /// Date the income is recorded for
    pub date: NaiveDate,
    /// One of the user's categories
    pub category_id: i64,
    /// One of the user's banks, the destination of the money
    pub bank_id: i64,
}

/// Records an extra income for the user.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the name is blank or the amount is not positive
/// - [`Error::NotFound`] if the category or bank is not the user's
#[instrument(skip(db, new_income), fields(name = %new_income.name))]
pub async fn create_extra_income(
    db: &DatabaseConnection,
    user_id: UserId,
    new_income: NewExtraIncome,
) -> Result<extra_income::Model> {
    let name = crate::core::require_name(&new_income.name, "Extra income")?;
    crate::core::ensure_positive(new_income.amount, "Income amount")?;

    get_category(db, new_income.category_id, user_id).await?;
    get_bank(db, new_income.bank_id, user_id).await?;

    extra_income::ActiveModel {
        name: Set(name),
        description: Set(new_income.description),
        amount: Set(new_income.amount),
        date: Set(new_income.date),
        category_id: Set(new_income.category_id),
        bank_id: Set(Some(new_income.bank_id)),
        user_id: Set(user_id.get()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Loads one of the user's extra incomes.
///
/// # Errors
/// Returns [`Error::NotFound`] if the income does not exist or belongs to someone else.
pub async fn get_extra_income<C>(
    db: &C,
    income_id: i64,
    user_id: UserId,
) -> Result<extra_income::Model>
where
    C: ConnectionTrait,
{
    ExtraIncome::find_by_id(income_id)
        .filter(extra_income::Column::UserId.eq(user_id.get()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("extra income", income_id))
}
