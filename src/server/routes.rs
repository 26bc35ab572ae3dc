use std::{convert::Infallible, path::PathBuf, sync::Arc};

use serde::de::DeserializeOwned;
use sqlx::{Pool, Postgres};
use warp::{filters::BoxedFilter, reject::Rejection, reply::Response, Filter, Reply};

use crate::{
    actions::Relation,
    constants::MAX_BODY_BYTES,
    form::{Form, FormData},
    images::ImageStore,
    middleware::{with_session, with_viewer},
    schema::Id,
};

use super::{handlers, rejection::handle_rejection};

/// Everything a handler needs besides the request itself.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub secret: Arc<str>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, secret: &str, images: impl ImageStore + 'static) -> Self {
        Self {
            pool,
            secret: Arc::from(secret),
            images: Arc::new(images),
        }
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn query_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<FormData>().map(Form::from_data)
}

fn catalog(state: &AppState) -> BoxedFilter<(Response,)> {
    let list_tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_tags);

    let get_tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_tag);

    let create_tag = warp::path!("api" / "tags")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_tag);

    let list_ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(query_form())
        .and(with_state(state.clone()))
        .and_then(handlers::list_ingredients);

    let get_ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_ingredient);

    let create_ingredient = warp::path!("api" / "ingredients")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_ingredient);

    list_tags
        .or(get_tag)
        .or(create_tag)
        .or(list_ingredients)
        .or(get_ingredient)
        .or(create_ingredient)
        .map(Reply::into_response)
        .boxed()
}

fn recipe_relation(state: &AppState, relation: Relation, segment: &'static str) -> BoxedFilter<(Response,)> {
    let base = warp::path("api")
        .and(warp::path("recipes"))
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = base
        .clone()
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(move |id, session, state| {
            handlers::add_recipe_relation(relation, id, session, state)
        });

    let remove = base
        .and(warp::delete())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(move |id, session, state| handlers::remove_relation(relation, id, session, state));

    add.or(remove).map(Reply::into_response).boxed()
}

fn recipes(state: &AppState) -> BoxedFilter<(Response,)> {
    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::download_shopping_cart);

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_viewer(state.secret.clone()))
        .and(query_form())
        .and(with_state(state.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_recipe);

    let get = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_viewer(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_recipe);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(state.secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::delete_recipe);

    download
        .or(list)
        .or(create)
        .or(get)
        .or(update)
        .or(delete)
        .map(Reply::into_response)
        .boxed()
        .or(recipe_relation(state, Relation::Favorite, "favorite"))
        .unify()
        .or(recipe_relation(state, Relation::ShoppingCart, "shopping_cart"))
        .unify()
        .boxed()
}

fn users(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_viewer(state.secret.clone()))
        .and(query_form())
        .and(with_state(state.clone()))
        .and_then(handlers::list_users);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::me);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(state.secret.clone()))
        .and(query_form())
        .and(with_state(state.clone()))
        .and_then(handlers::list_subscriptions);

    let get = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_viewer(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_user);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(query_form())
        .and(with_state(state.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(|id, session, state| {
            handlers::remove_relation(Relation::Subscription, id, session, state)
        });

    list.or(me)
        .or(subscriptions)
        .or(get)
        .or(subscribe)
        .or(unsubscribe)
        .map(Reply::into_response)
        .boxed()
}

/// The API route tree without error recovery.
pub fn api(state: AppState) -> BoxedFilter<(Response,)> {
    catalog(&state)
        .or(recipes(&state))
        .unify()
        .or(users(&state))
        .unify()
        .boxed()
}

/// Uploaded images, served from the media root.
pub fn media(root: PathBuf) -> BoxedFilter<(Response,)> {
    warp::path("media")
        .and(warp::fs::dir(root))
        .map(Reply::into_response)
        .boxed()
}

/// API and media routes with every rejection turned into a JSON error reply.
pub fn app(
    state: AppState,
    media_root: PathBuf,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    api(state)
        .or(media(media_root))
        .unify()
        .recover(handle_rejection)
}
