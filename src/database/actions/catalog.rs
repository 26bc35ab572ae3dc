use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::{INGREDIENT_NAME_MAX_LENGTH, TAG_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH},
    error::{QueryError, RecipeError, ValidationErrors},
    jwt::SessionData,
    schema::{Id, Ingredient, IngredientPayload, Tag, TagPayload},
};

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value.chars().skip(1).all(|c| c.is_ascii_hexdigit())
}

fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_length(value: &str, field: &str, max_length: usize, errors: &mut ValidationErrors) {
    if value.is_empty() {
        errors.add(field, "This field is required");
    } else if value.chars().count() > max_length {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_length} characters"),
        );
    }
}

pub fn validate_tag(payload: TagPayload) -> Result<TagPayload, RecipeError> {
    let payload = TagPayload {
        name: payload.name.trim().to_owned(),
        color: payload.color.trim().to_uppercase(),
        slug: payload.slug.trim().to_owned(),
    };
    let mut errors = ValidationErrors::new();

    check_length(&payload.name, "name", TAG_NAME_MAX_LENGTH, &mut errors);
    check_length(&payload.slug, "slug", TAG_SLUG_MAX_LENGTH, &mut errors);
    if !payload.slug.is_empty() && !is_slug(&payload.slug) {
        errors.add("slug", "Use only letters, numbers, underscores or hyphens");
    }
    if !is_hex_color(&payload.color) {
        errors.add("color", "Enter a HEX color such as #E26C2D");
    }

    errors.into_result(payload)
}

pub fn validate_ingredient(payload: IngredientPayload) -> Result<IngredientPayload, RecipeError> {
    let payload = IngredientPayload {
        name: payload.name.trim().to_owned(),
        measurement_unit: payload.measurement_unit.trim().to_owned(),
    };
    let mut errors = ValidationErrors::new();

    check_length(&payload.name, "name", INGREDIENT_NAME_MAX_LENGTH, &mut errors);
    check_length(
        &payload.measurement_unit,
        "measurement_unit",
        INGREDIENT_NAME_MAX_LENGTH,
        &mut errors,
    );

    errors.into_result(payload)
}

/// Escapes `LIKE` wildcards so user input only ever matches literally.
fn escape_like(value: &str) -> String {
    value
        .chars()
        .flat_map(|c| match c {
            '%' | '_' | '\\' => vec!['\\', c],
            c => vec![c],
        })
        .collect()
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, RecipeError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id DESC")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, RecipeError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn create_tag(
    payload: TagPayload,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Tag, RecipeError> {
    session.authenticate(ActionType::ManageCatalog)?;
    let payload = validate_tag(payload)?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&payload.name)
    .bind(&payload.color)
    .bind(&payload.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let tag = tag.ok_or(RecipeError::AlreadyExists(
        "Tag with this name, color or slug already exists",
    ))?;
    log::info!("Tag {} ({}) created by {}", tag.id, tag.slug, session.username);

    Ok(tag)
}

pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, RecipeError> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE name ILIKE $1 ESCAPE '\\' ORDER BY name, measurement_unit",
        )
        .bind(format!("{}%", escape_like(name)))
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, measurement_unit")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, RecipeError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    payload: IngredientPayload,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, RecipeError> {
    session.authenticate(ActionType::ManageCatalog)?;
    let payload = validate_ingredient(payload)?;

    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(&payload.name)
    .bind(&payload.measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let row = row.ok_or(RecipeError::AlreadyExists(
        "Ingredient with this name and unit already exists",
    ))?;
    log::info!("Ingredient {} created by {}", row.id, session.username);

    Ok(row)
}

/// Subset of `ids` present in the ingredient catalog.
pub async fn existing_ingredient_ids(
    ids: &[Id],
    conn: &mut PgConnection,
) -> Result<Vec<Id>, RecipeError> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Subset of `ids` present among the tags.
pub async fn existing_tag_ids(ids: &[Id], conn: &mut PgConnection) -> Result<Vec<Id>, RecipeError> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tag(name: &str, color: &str, slug: &str) -> TagPayload {
        TagPayload {
            name: name.to_owned(),
            color: color.to_owned(),
            slug: slug.to_owned(),
        }
    }

    #[rstest]
    fn normalizes_valid_tag() {
        let payload = validate_tag(tag(" Breakfast ", "#e26c2d", "breakfast")).unwrap();

        assert_eq!(payload.name, "Breakfast");
        assert_eq!(payload.color, "#E26C2D");
    }

    #[rstest]
    #[case(tag("Lunch", "E26C2D", "lunch"), "color")]
    #[case(tag("Lunch", "#GGGGGG", "lunch"), "color")]
    #[case(tag("Lunch", "#49B64E", "late lunch"), "slug")]
    #[case(tag("", "#49B64E", "lunch"), "name")]
    fn rejects_invalid_tag(#[case] payload: TagPayload, #[case] field: &str) {
        assert!(matches!(
            validate_tag(payload),
            Err(RecipeError::Validation(errors)) if errors.field(field).is_some()
        ));
    }

    #[rstest]
    fn ingredient_needs_unit() {
        let payload = IngredientPayload {
            name: String::from("Salt"),
            measurement_unit: String::from("  "),
        };

        assert!(validate_ingredient(payload).is_err());
    }

    #[rstest]
    #[case("sal", "sal")]
    #[case("50%", "50\\%")]
    #[case("a_b", "a\\_b")]
    fn escapes_like_wildcards(#[case] input: &str, #[case] escaped: &str) {
        assert_eq!(escape_like(input), escaped);
    }
}
