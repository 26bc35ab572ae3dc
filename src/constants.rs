pub const PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32000;

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32000;

pub const RECIPE_NAME_MAX_LENGTH: usize = 255;
pub const TAG_NAME_MAX_LENGTH: usize = 60;
pub const TAG_SLUG_MAX_LENGTH: usize = 100;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 50;

pub const SHOPPING_LIST_BRAND: &str = "Foodgram";
pub const SHOPPING_LIST_SUFFIX: &str = "_shopping_list.txt";

pub const SESSION_COOKIE: &str = "session";
pub const MEDIA_URL: &str = "/media";

pub const TRUTHY_VALUES: &[&str] = &["1", "true", "yes", "on"];

/// Recipe bodies carry the image inline as base64.
pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;
