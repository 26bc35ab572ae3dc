use chrono::Utc;
use warp::{http::StatusCode, reject::Rejection, reply, Reply};

use crate::{
    actions::{self, Relation},
    error::RecipeError,
    form::{recipes_limit, Form, RecipeFilter},
    jwt::SessionData,
    pagination::PageRequest,
    schema::{Id, IngredientPayload, RecipePayload, TagPayload, Viewer},
};

use super::routes::AppState;

fn no_content() -> impl Reply {
    reply::with_status(reply(), StatusCode::NO_CONTENT)
}

// Catalog

pub async fn list_tags(state: AppState) -> Result<impl Reply, Rejection> {
    let tags = actions::list_tags(&state.pool).await?;
    Ok(reply::json(&tags))
}

pub async fn get_tag(id: Id, state: AppState) -> Result<impl Reply, Rejection> {
    let tag = actions::get_tag(id, &state.pool)
        .await?
        .ok_or(RecipeError::NotFound("Tag"))?;
    Ok(reply::json(&tag))
}

pub async fn create_tag(
    session: SessionData,
    payload: TagPayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let tag = actions::create_tag(payload, &session, &state.pool).await?;
    Ok(reply::with_status(reply::json(&tag), StatusCode::CREATED))
}

pub async fn list_ingredients(form: Form, state: AppState) -> Result<impl Reply, Rejection> {
    let ingredients = actions::list_ingredients(form.get_str("name"), &state.pool).await?;
    Ok(reply::json(&ingredients))
}

pub async fn get_ingredient(id: Id, state: AppState) -> Result<impl Reply, Rejection> {
    let ingredient = actions::get_ingredient(id, &state.pool)
        .await?
        .ok_or(RecipeError::NotFound("Ingredient"))?;
    Ok(reply::json(&ingredient))
}

pub async fn create_ingredient(
    session: SessionData,
    payload: IngredientPayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let ingredient = actions::create_ingredient(payload, &session, &state.pool).await?;
    Ok(reply::with_status(reply::json(&ingredient), StatusCode::CREATED))
}

// Recipes

pub async fn list_recipes(
    viewer: Viewer,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let filter = RecipeFilter::from(&form);
    let mut page = actions::fetch_recipes(&filter, PageRequest::from_form(&form), viewer, &state.pool)
        .await?;

    let recipes = std::mem::take(&mut page.results);
    let views = actions::project_recipes(recipes, viewer, &state.pool).await?;

    Ok(reply::json(&page.with_results(views)))
}

pub async fn get_recipe(id: Id, viewer: Viewer, state: AppState) -> Result<impl Reply, Rejection> {
    let recipe = actions::get_recipe(id, &state.pool)
        .await?
        .ok_or(RecipeError::NotFound("Recipe"))?;
    let view = actions::project_recipe(recipe, viewer, &state.pool).await?;

    Ok(reply::json(&view))
}

pub async fn create_recipe(
    session: SessionData,
    payload: RecipePayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe =
        actions::create_recipe(payload, &session, &state.images, &state.pool).await?;
    let view = actions::project_recipe(recipe, Viewer::User(session.user_id), &state.pool).await?;

    Ok(reply::with_status(reply::json(&view), StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Id,
    session: SessionData,
    payload: RecipePayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe =
        actions::update_recipe(id, payload, &session, &state.images, &state.pool).await?;
    let view = actions::project_recipe(recipe, Viewer::User(session.user_id), &state.pool).await?;

    Ok(reply::json(&view))
}

pub async fn delete_recipe(
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    actions::delete_recipe(id, &session, &state.pool).await?;
    Ok(no_content())
}

pub async fn add_recipe_relation(
    relation: Relation,
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::add_recipe_relation(relation, id, &session, &state.pool).await?;
    Ok(reply::with_status(reply::json(&recipe), StatusCode::CREATED))
}

pub async fn remove_relation(
    relation: Relation,
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    actions::remove_relation(relation, id, &session, &state.pool).await?;
    Ok(no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let list = actions::export_shopping_list(&session, Utc::now().date_naive(), &state.pool).await?;
    let disposition = format!("attachment; filename={}", list.filename());

    Ok(reply::with_header(
        list.render(),
        "content-disposition",
        disposition,
    ))
}

// Users

pub async fn list_users(viewer: Viewer, form: Form, state: AppState) -> Result<impl Reply, Rejection> {
    let mut page = actions::fetch_users(PageRequest::from_form(&form), &state.pool).await?;

    let mut views = Vec::with_capacity(page.results.len());
    for user in std::mem::take(&mut page.results) {
        views.push(actions::project_user(user, viewer, &state.pool).await?);
    }

    Ok(reply::json(&page.with_results(views)))
}

pub async fn get_user(id: Id, viewer: Viewer, state: AppState) -> Result<impl Reply, Rejection> {
    let user = actions::get_user_by_id(id, &state.pool)
        .await?
        .ok_or(RecipeError::NotFound("User"))?;
    let view = actions::project_user(user, viewer, &state.pool).await?;

    Ok(reply::json(&view))
}

pub async fn me(session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    let user = actions::get_user_by_id(session.user_id, &state.pool)
        .await?
        .ok_or(RecipeError::NotFound("User"))?;
    let view = actions::project_user(user, Viewer::User(session.user_id), &state.pool).await?;

    Ok(reply::json(&view))
}

pub async fn list_subscriptions(
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let viewer = Viewer::User(session.user_id);
    let limit = recipes_limit(&form);
    let mut page =
        actions::fetch_subscribed_authors(session.user_id, PageRequest::from_form(&form), &state.pool)
            .await?;

    let mut views = Vec::with_capacity(page.results.len());
    for author in std::mem::take(&mut page.results) {
        views.push(actions::project_subscription(author, viewer, limit, &state.pool).await?);
    }

    Ok(reply::json(&page.with_results(views)))
}

pub async fn subscribe(
    id: Id,
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let view = actions::subscribe(id, &session, recipes_limit(&form), &state.pool).await?;
    Ok(reply::with_status(reply::json(&view), StatusCode::CREATED))
}
