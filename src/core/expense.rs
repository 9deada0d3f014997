//! Expense business logic - recorded outflows that bills settle.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use tracing::instrument;

use crate::{
    core::{UserId, bank::get_bank, category::get_category},
    entities::{Expense, expense},
    errors::{Error, Result},
};

/// Input for [`create_expense`].
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// Short name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Positive amount
    pub value: Decimal,
    /// Date the expense was incurred
    pub expense_date: NaiveDate,
    /// One of the user's categories
    pub category_id: i64,
    /// One of the user's banks, if any
    pub bank_id: Option<i64>,
}

/// Records an expense for the user.
///
/// # Errors
/// - [`Error::InvalidOperation`] if the name is blank or the value is not positive
/// - [`Error::NotFound`] if the category or bank is not the user's
#[instrument(skip(db, new_expense), fields(name = %new_expense.name))]
pub async fn create_expense(
    db: &DatabaseConnection,
    user_id: UserId,
    new_expense: NewExpense,
) -> Result<expense::Model> {
    let name = crate::core::require_name(&new_expense.name, "Expense")?;
    crate::core::ensure_positive(new_expense.value, "Expense value")?;

    get_category(db, new_expense.category_id, user_id).await?;
    if let Some(bank_id) = new_expense.bank_id {
        get_bank(db, bank_id, user_id).await?;
    }

    expense::ActiveModel {
        name: Set(name),
        description: Set(new_expense.description),
        value: Set(new_expense.value),
        expense_date: Set(new_expense.expense_date),
        category_id: Set(new_expense.category_id),
        bank_id: Set(new_expense.bank_id),
        user_id: Set(user_id.get()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Loads one of the user's expenses.
///
/// # Errors
/// Returns [`Error::NotFound`] if the expense does not exist or belongs to someone else.
pub async fn get_expense<C>(db: &C, expense_id: i64, user_id: UserId) -> Result<expense::Model>
where
    C: ConnectionTrait,
{
    Expense::find_by_id(expense_id)
        .filter(expense::Column::UserId.eq(user_id.get()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("expense", expense_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_expense_validation() -> Result<()> {
        let (db, user, bank) = setup_with_bank(dec!(0.00)).await?;
        let category = create_test_category(&db, user.id).await?;

        let mut input = NewExpense {
            name: "Rent".to_string(),
            description: None,
            value: dec!(0.00),
            expense_date: crate::core::today(),
            category_id: category.id,
            bank_id: Some(bank.id),
        };
        let result = create_expense(&db, UserId::new(user.id), input.clone()).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));

        input.value = dec!(950.00);
        input.category_id = 999;
        let result = create_expense(&db, UserId::new(user.id), input.clone()).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "category", .. })));

        input.category_id = category.id;
        let expense = create_expense(&db, UserId::new(user.id), input).await?;
        assert_eq!(expense.value, dec!(950.00));
        assert_eq!(expense.bank_id, Some(bank.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_expense_is_owner_scoped() -> Result<()> {
        let (db, user, bank) = setup_with_bank(dec!(0.00)).await?;
        let expense = create_test_expense(&db, user.id, dec!(10.00), Some(bank.id)).await?;
        let bob = create_test_user(&db, "bob@example.com").await?;

        let result = get_expense(&db, expense.id, UserId::new(bob.id)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "expense", .. })));

        Ok(())
    }
}
