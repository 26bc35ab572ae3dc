use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{constants::SESSION_COOKIE, error::RecipeError, schema::Viewer};

use super::jwt::{verify_jwt_session, SessionData};

/// Picks the session token from the cookie, falling back to an
/// `Authorization: Token <jwt>` (or `Bearer`) header.
fn pick_token(cookie: Option<String>, header: Option<String>) -> Option<String> {
    cookie.or_else(|| {
        header.and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            match scheme {
                "Token" | "Bearer" if !token.trim().is_empty() => Some(token.trim().to_owned()),
                _ => None,
            }
        })
    })
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional(SESSION_COOKIE)
        .and(warp::header::optional("authorization"))
        .and_then(move |cookie: Option<String>, header: Option<String>| {
            let secret = secret.clone();
            async move {
                let token = pick_token(cookie, header).ok_or(RecipeError::Unauthorized)?;
                let session = verify_jwt_session(&token, &secret)?;

                Ok::<SessionData, Rejection>(session.into())
            }
        })
}

/// Never rejects on credentials: a missing or invalid token is an anonymous viewer.
pub fn with_viewer(secret: Arc<str>) -> impl Filter<Extract = (Viewer,), Error = Rejection> + Clone {
    warp::cookie::optional(SESSION_COOKIE)
        .and(warp::header::optional("authorization"))
        .and_then(move |cookie: Option<String>, header: Option<String>| {
            let secret = secret.clone();
            async move {
                let session = pick_token(cookie, header)
                    .and_then(|token| verify_jwt_session(&token, &secret).ok())
                    .map(SessionData::from);

                Ok::<Viewer, Rejection>(Viewer::from(session))
            }
        })
}
