use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    error::{QueryError, RecipeError, ValidationErrors},
    form::RecipeFilter,
    images::{store_image, ImageStore},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{
        Id, IngredientAmount, IngredientLine, Recipe, RecipeDraft, RecipeMini,
        RecipePayload, Tag, Viewer,
    },
    validation::{parse_and_validate, unknown_ids, WriteMode},
};

use super::catalog::{existing_ingredient_ids, existing_tag_ids};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, RecipeError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session is allowed to change. Only the author may.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, RecipeError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match get_recipe(id, pool).await? {
        Some(recipe) if recipe.author_id == session.user_id => Ok(recipe),
        Some(_) => Err(RecipeError::Forbidden),
        None => Err(RecipeError::NotFound("Recipe")),
    }
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Tag>, RecipeError> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<IngredientAmount>, RecipeError> {
    let rows: Vec<IngredientAmount> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Recipes of an author, newest first, in the reduced form. `limit` caps the
/// list; `None` returns all of them.
pub async fn list_author_recipes(
    author_id: Id,
    limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeMini>, RecipeError> {
    let limit = limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

    // LIMIT NULL is no limit at all
    let rows: Vec<RecipeMini> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY pub_date DESC, id DESC
        LIMIT $2
    ",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_author_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, RecipeError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.0)
}

fn push_recipe_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter, viewer: Viewer) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    // Viewer-relative filters mean nothing to an anonymous viewer and are skipped.
    if let Some(user_id) = viewer.user_id() {
        if filter.is_favorited {
            query
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query
                .push(" AND EXISTS (SELECT 1 FROM shopping_carts sc WHERE sc.recipe_id = r.id AND sc.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    viewer: Viewer,
    pool: &Pool<Postgres>,
) -> Result<Page<Recipe>, RecipeError> {
    let mut count_query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut count_query, filter, viewer);

    let (total_count,): (i64,) = count_query
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT r.* FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut query, filter, viewer);

    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let recipes: Vec<Recipe> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(Page::from_rows(recipes, total_count, page))
}

/// Rejects drafts referencing tags or ingredients that do not exist.
async fn check_references(draft: &RecipeDraft, conn: &mut PgConnection) -> Result<(), RecipeError> {
    let ingredient_ids: Vec<Id> = draft.ingredients.iter().map(|i| i.id).collect();

    let existing_tags = existing_tag_ids(&draft.tags, conn).await?;
    let existing_ingredients = existing_ingredient_ids(&ingredient_ids, conn).await?;

    let mut errors = ValidationErrors::new();
    for id in unknown_ids(&draft.tags, &existing_tags) {
        errors.add("tags", format!("Tag {id} does not exist"));
    }
    for id in unknown_ids(&ingredient_ids, &existing_ingredients) {
        errors.add("ingredients", format!("Ingredient {id} does not exist"));
    }

    errors.into_result(())
}

/// Drops every tag link of the recipe and inserts `tags` in their place.
async fn replace_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut PgConnection,
) -> Result<(), RecipeError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if !tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

/// Drops every ingredient line of the recipe and bulk inserts `ingredients`.
async fn replace_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientLine],
    conn: &mut PgConnection,
) -> Result<(), RecipeError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if !ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );

        query_builder.push_values(ingredients.iter(), |mut b, line| {
            b.push_bind(recipe_id)
                .push_bind(line.id)
                .push_bind(line.amount);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

pub async fn create_recipe(
    payload: RecipePayload,
    session: &SessionData,
    images: &Arc<dyn ImageStore>,
    pool: &Pool<Postgres>,
) -> Result<Recipe, RecipeError> {
    session.authenticate(ActionType::CreateRecipes)?;
    let draft = parse_and_validate(payload, WriteMode::Create)?;

    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    check_references(&draft, &mut conn).await?;
    drop(conn);

    let encoded = draft
        .image
        .clone()
        .ok_or_else(|| RecipeError::validation("image", "This field is required"))?;
    let image = store_image(images.clone(), encoded).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(session.user_id)
    .bind(&draft.name)
    .bind(image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_tags(recipe.id, &draft.tags, &mut tr).await?;
    replace_recipe_ingredients(recipe.id, &draft.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {} created by {}", recipe.id, session.username);
    Ok(recipe)
}

/// Overwrites a recipe. Tags and ingredients are replaced wholesale; the
/// author never changes and the image is kept when none is supplied.
pub async fn update_recipe(
    id: Id,
    payload: RecipePayload,
    session: &SessionData,
    images: &Arc<dyn ImageStore>,
    pool: &Pool<Postgres>,
) -> Result<Recipe, RecipeError> {
    let current = get_recipe_mut(id, session, pool).await?;
    let draft = parse_and_validate(payload, WriteMode::Update)?;

    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    check_references(&draft, &mut conn).await?;
    drop(conn);

    let image = match draft.image.clone() {
        Some(encoded) => store_image(images.clone(), encoded).await?,
        None => current.image,
    };

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(&draft.name)
    .bind(image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(current.id)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_tags(recipe.id, &draft.tags, &mut tr).await?;
    replace_recipe_ingredients(recipe.id, &draft.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {} updated by {}", recipe.id, session.username);
    Ok(recipe)
}

/// Join rows, favorites and cart entries go with it through `ON DELETE CASCADE`.
pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), RecipeError> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("Recipe {} deleted by {}", recipe.id, session.username);
    Ok(())
}
