//! Category business logic - owner-scoped grouping of expenses and incomes.

use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::instrument;

use crate::{
    core::UserId,
    entities::{Category, category},
    errors::{Error, Result},
};

/// Creates a category for the user.
#[instrument(skip(db))]
pub async fn create_category(
    db: &DatabaseConnection,
    user_id: UserId,
    name: &str,
) -> Result<category::Model> {
    let name = crate::core::require_name(name, "Category")?;
    category::ActiveModel {
        name: Set(name),
        user_id: Set(user_id.get()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Loads one of the user's categories.
///
/// # Errors
/// Returns [`Error::NotFound`] if the category does not exist or belongs to someone else.
pub async fn get_category<C>(db: &C, category_id: i64, user_id: UserId) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .filter(category::Column::UserId.eq(user_id.get()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))
}

/// Lists the user's categories alphabetically.
pub async fn list_categories(
    db: &DatabaseConnection,
    user_id: UserId,
) -> Result<Vec<category::Model>> {
    Category::find()
        .filter(category::Column::UserId.eq(user_id.get()))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}
