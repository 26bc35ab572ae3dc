use sqlx::{Pool, Postgres};

use crate::{
    error::{QueryError, RecipeError},
    pagination::{Page, PageRequest},
    schema::{Id, User},
};

pub async fn get_user_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, RecipeError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_username(
    username: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, RecipeError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn fetch_users(
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<User>, RecipeError> {
    let (total_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2")
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(Page::from_rows(users, total_count, page))
}

/// Authors `user_id` is subscribed to.
pub async fn fetch_subscribed_authors(
    user_id: Id,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<User>, RecipeError> {
    let (total_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

    let users: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(Page::from_rows(users, total_count, page))
}
