pub mod cart;
pub mod catalog;
pub mod projection;
pub mod recipes;
pub mod relations;
pub mod users;

pub use cart::*;
pub use catalog::*;
pub use projection::*;
pub use recipes::*;
pub use relations::*;
pub use users::*;
