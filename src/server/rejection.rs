use std::convert::Infallible;

use serde_json::{json, Value};
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection},
    reply, Reply,
};

use crate::error::RecipeError;

/// Body for a domain error. Validation errors answer with the field map
/// itself, everything else with a single message.
pub fn error_body(error: &RecipeError) -> Value {
    match error {
        RecipeError::Validation(errors) => json!(errors),
        error if error.is_internal() => {
            json!({ "errors": "Internal server error", "code": error.code() })
        }
        error => json!({ "errors": error.to_string(), "code": error.code() }),
    }
}

fn message(status: StatusCode, text: impl Into<String>) -> (StatusCode, Value) {
    (status, json!({ "errors": text.into() }))
}

/// Single recovery point for the whole route tree.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(error) = err.find::<RecipeError>() {
        if error.is_internal() {
            log::error!("{error}");
        }
        (error.status(), error_body(error))
    } else if err.is_not_found() {
        message(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(error) = err.find::<BodyDeserializeError>() {
        message(StatusCode::BAD_REQUEST, format!("Malformed request body: {error}"))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        message(StatusCode::BAD_REQUEST, "Malformed query string")
    } else if err.find::<PayloadTooLarge>().is_some() {
        message(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
    } else if err.find::<LengthRequired>().is_some() {
        message(StatusCode::LENGTH_REQUIRED, "Content-Length header is required")
    } else if err.find::<MethodNotAllowed>().is_some() {
        message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(reply::with_status(reply::json(&body), status))
}
