use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{QueryError, RecipeError},
    jwt::SessionData,
    schema::{CartLine, Id},
    shopping_list::ShoppingList,
};

use super::users::get_user_by_id;

pub async fn cart_is_empty(user_id: Id, pool: &Pool<Postgres>) -> Result<bool, RecipeError> {
    let row: (bool,) =
        sqlx::query_as("SELECT NOT EXISTS (SELECT 1 FROM shopping_carts WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row.0)
}

/// One line per ingredient of every recipe in the cart, not yet summed.
pub async fn fetch_cart_lines(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartLine>, RecipeError> {
    let lines: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(lines)
}

pub async fn export_shopping_list(
    session: &SessionData,
    today: NaiveDate,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, RecipeError> {
    if cart_is_empty(session.user_id, pool).await? {
        return Err(RecipeError::EmptyCart);
    }

    let user = get_user_by_id(session.user_id, pool)
        .await?
        .ok_or(RecipeError::Unauthorized)?;
    let lines = fetch_cart_lines(session.user_id, pool).await?;

    let list = ShoppingList::new(user.display_name(), user.username, today, lines);
    log::debug!(
        "Shopping list for {} has {} items",
        session.username,
        list.items.len()
    );

    Ok(list)
}
