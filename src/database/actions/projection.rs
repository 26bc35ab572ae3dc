use sqlx::{Pool, Postgres};

use crate::{
    error::{QueryError, RecipeError},
    schema::{Id, Recipe, RecipeView, SubscriptionView, User, UserView, Viewer},
};

use super::{
    recipes::{count_author_recipes, list_author_recipes, list_recipe_ingredients, list_recipe_tags},
    users::get_user_by_id,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ViewerFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub async fn fetch_viewer_flags(
    recipe_id: Id,
    viewer: Viewer,
    pool: &Pool<Postgres>,
) -> Result<ViewerFlags, RecipeError> {
    let Some(user_id) = viewer.user_id() else {
        return Ok(ViewerFlags::default());
    };

    let flags: ViewerFlags = sqlx::query_as(
        "
        SELECT
            EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2) AS is_favorited,
            EXISTS (SELECT 1 FROM shopping_carts WHERE user_id = $1 AND recipe_id = $2) AS is_in_shopping_cart
    ",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(flags)
}

pub async fn is_subscribed(
    viewer: Viewer,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, RecipeError> {
    let Some(user_id) = viewer.user_id() else {
        return Ok(false);
    };

    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

pub async fn project_user(
    user: User,
    viewer: Viewer,
    pool: &Pool<Postgres>,
) -> Result<UserView, RecipeError> {
    let subscribed = is_subscribed(viewer, user.id, pool).await?;

    Ok(UserView::new(user, subscribed))
}

/// Full read view of a recipe as seen by `viewer`.
pub async fn project_recipe(
    recipe: Recipe,
    viewer: Viewer,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, RecipeError> {
    let author = get_user_by_id(recipe.author_id, pool)
        .await?
        .ok_or(RecipeError::NotFound("Author"))?;

    let author = project_user(author, viewer, pool).await?;
    let tags = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;
    let flags = fetch_viewer_flags(recipe.id, viewer, pool).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
        is_favorited: flags.is_favorited,
        is_in_shopping_cart: flags.is_in_shopping_cart,
    })
}

pub async fn project_recipes(
    recipes: Vec<Recipe>,
    viewer: Viewer,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, RecipeError> {
    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(project_recipe(recipe, viewer, pool).await?);
    }

    Ok(views)
}

pub async fn project_subscription(
    author: User,
    viewer: Viewer,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, RecipeError> {
    let recipes = list_author_recipes(author.id, recipes_limit, pool).await?;
    let recipes_count = count_author_recipes(author.id, pool).await?;
    let author = project_user(author, viewer, pool).await?;

    Ok(SubscriptionView::new(author, recipes, recipes_count))
}
