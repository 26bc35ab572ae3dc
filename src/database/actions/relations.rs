use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{QueryError, RecipeError},
    jwt::SessionData,
    schema::{Id, RecipeMini, SubscriptionView, Viewer},
};

use super::{
    projection::project_subscription, recipes::get_recipe, users::get_user_by_id,
};

/// User-owned association with a pair-uniqueness constraint. Each one toggles
/// between absent and present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl Relation {
    pub fn table(&self) -> &'static str {
        match self {
            Relation::Favorite => "favorites",
            Relation::ShoppingCart => "shopping_carts",
            Relation::Subscription => "subscriptions",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            Relation::Favorite | Relation::ShoppingCart => "recipe_id",
            Relation::Subscription => "author_id",
        }
    }

    fn target_table(&self) -> &'static str {
        match self {
            Relation::Favorite | Relation::ShoppingCart => "recipes",
            Relation::Subscription => "users",
        }
    }

    fn target_name(&self) -> &'static str {
        match self {
            Relation::Favorite | Relation::ShoppingCart => "Recipe",
            Relation::Subscription => "Author",
        }
    }

    fn present_message(&self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe is already in favorites",
            Relation::ShoppingCart => "Recipe is already in the shopping cart",
            Relation::Subscription => "You are already subscribed to this author",
        }
    }

    fn absent_message(&self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe is not in favorites",
            Relation::ShoppingCart => "Recipe is not in the shopping cart",
            Relation::Subscription => "You are not subscribed to this author",
        }
    }

    /// Rejects pairs that can never exist, whatever the stored state.
    pub fn check_pair(&self, user_id: Id, target_id: Id) -> Result<(), RecipeError> {
        if *self == Relation::Subscription && user_id == target_id {
            return Err(RecipeError::SelfSubscription);
        }
        Ok(())
    }

    /// Outcome of an insert that skips conflicting rows.
    pub fn added(&self, rows_affected: u64) -> Result<(), RecipeError> {
        if rows_affected == 0 {
            return Err(RecipeError::AlreadyExists(self.present_message()));
        }
        Ok(())
    }

    pub fn removed(&self, rows_affected: u64) -> Result<(), RecipeError> {
        if rows_affected == 0 {
            return Err(RecipeError::AlreadyRemoved(self.absent_message()));
        }
        Ok(())
    }
}

async fn ensure_target(relation: Relation, target_id: Id, pool: &Pool<Postgres>) -> Result<(), RecipeError> {
    let row: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
        relation.target_table()
    ))
    .bind(target_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    if !row.0 {
        return Err(RecipeError::NotFound(relation.target_name()));
    }
    Ok(())
}

/// absent -> present. A concurrent duplicate loses on the unique constraint
/// and reports `AlreadyExists` just like a sequential one.
pub async fn add_relation(
    relation: Relation,
    target_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), RecipeError> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    relation.check_pair(session.user_id, target_id)?;
    ensure_target(relation, target_id, pool).await?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        relation.table(),
        relation.target_column()
    ))
    .bind(session.user_id)
    .bind(target_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    relation.added(result.rows_affected())?;
    log::debug!(
        "{} added {:?} {}",
        session.username,
        relation,
        target_id
    );

    Ok(())
}

/// present -> absent.
pub async fn remove_relation(
    relation: Relation,
    target_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), RecipeError> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    relation.check_pair(session.user_id, target_id)?;
    ensure_target(relation, target_id, pool).await?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        relation.table(),
        relation.target_column()
    ))
    .bind(session.user_id)
    .bind(target_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    relation.removed(result.rows_affected())?;
    log::debug!(
        "{} removed {:?} {}",
        session.username,
        relation,
        target_id
    );

    Ok(())
}

/// Favorite or cart add, answered with the reduced recipe view.
pub async fn add_recipe_relation(
    relation: Relation,
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeMini, RecipeError> {
    add_relation(relation, recipe_id, session, pool).await?;

    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or(RecipeError::NotFound("Recipe"))?;

    Ok(recipe.into())
}

pub async fn subscribe(
    author_id: Id,
    session: &SessionData,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, RecipeError> {
    add_relation(Relation::Subscription, author_id, session, pool).await?;

    let author = get_user_by_id(author_id, pool)
        .await?
        .ok_or(RecipeError::NotFound("Author"))?;

    project_subscription(author, Viewer::User(session.user_id), recipes_limit, pool).await
}
