use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug)]
pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                unique_violation: e.code().map_or(false, |code| code == UNIQUE_VIOLATION),
                info: format!("{e}"),
            },
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

/// Field-level problems found in a write payload. Serializes as
/// `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// Returns `value` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, RecipeError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(RecipeError::Validation(self))
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<String>>();

        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("invalid payload ({0})")]
    Validation(ValidationErrors),
    #[error("{0}")]
    AlreadyExists(&'static str),
    #[error("{0}")]
    AlreadyRemoved(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("You can't subscribe to yourself")]
    SelfSubscription,
    #[error("Shopping cart is empty")]
    EmptyCart,
    #[error("Authentication credentials were not provided")]
    Unauthorized,
    #[error("You don't have permission to perform this action")]
    Forbidden,
    #[error("Query failed: {0}")]
    Query(QueryError),
    #[error("Image store failed: {0}")]
    Image(String),
}

impl RecipeError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::AlreadyExists(_)
            | Self::AlreadyRemoved(_)
            | Self::SelfSubscription
            | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Query(_) | Self::Image(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::AlreadyExists(_) => "already_exists",
            Self::AlreadyRemoved(_) => "already_removed",
            Self::NotFound(_) => "not_found",
            Self::SelfSubscription => "self_subscription",
            Self::EmptyCart => "empty_cart",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Query(_) => "query_error",
            Self::Image(_) => "image_error",
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<QueryError> for RecipeError {
    fn from(value: QueryError) -> Self {
        if value.is_unique_violation() {
            Self::AlreadyExists("Record already exists")
        } else {
            Self::Query(value)
        }
    }
}

impl warp::reject::Reject for RecipeError {}
