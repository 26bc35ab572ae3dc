mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod server {
    pub mod handlers;
    pub mod rejection;
    pub mod routes;
}
mod config;
mod constants;
mod images;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use images::*;
pub use server::*;
