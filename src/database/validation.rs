use std::collections::HashSet;

use crate::{
    constants::{
        MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT, MIN_COOKING_TIME, RECIPE_NAME_MAX_LENGTH,
    },
    error::{RecipeError, ValidationErrors},
    schema::{Id, IngredientLine, RecipeDraft, RecipePayload},
};

const REQUIRED: &str = "This field is required";
const EMPTY_LIST: &str = "This list may not be empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

fn required_text(
    value: Option<String>,
    field: &str,
    max_length: Option<usize>,
    errors: &mut ValidationErrors,
) -> String {
    let value = value.map(|v| v.trim().to_owned()).unwrap_or_default();

    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if let Some(max_length) = max_length {
        if value.chars().count() > max_length {
            errors.add(
                field,
                format!("Ensure this field has no more than {max_length} characters"),
            );
        }
    }

    value
}

/// Narrows a client number, `None` when it falls outside `min..=max`.
fn in_range(value: i64, min: i32, max: i32) -> Option<i32> {
    i32::try_from(value)
        .ok()
        .filter(|value| (min..=max).contains(value))
}

fn duplicates(ids: impl Iterator<Item = Id>) -> Vec<Id> {
    let mut seen = HashSet::new();
    let mut repeated = vec![];

    for id in ids {
        if !seen.insert(id) && !repeated.contains(&id) {
            repeated.push(id);
        }
    }

    repeated
}

/// Checks everything about a recipe write that can be decided without the
/// catalog: presence, ranges and duplicate references. All problems are
/// reported together.
pub fn parse_and_validate(
    payload: RecipePayload,
    mode: WriteMode,
) -> Result<RecipeDraft, RecipeError> {
    let mut errors = ValidationErrors::new();

    let name = required_text(
        payload.name,
        "name",
        Some(RECIPE_NAME_MAX_LENGTH),
        &mut errors,
    );
    let text = required_text(payload.text, "text", None, &mut errors);

    let cooking_time = match payload
        .cooking_time
        .map(|time| in_range(time, MIN_COOKING_TIME, MAX_COOKING_TIME))
    {
        Some(Some(time)) => time,
        Some(None) => {
            errors.add(
                "cooking_time",
                format!("Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"),
            );
            0
        }
        None => {
            errors.add("cooking_time", REQUIRED);
            0
        }
    };

    let image = payload
        .image
        .map(|image| image.trim().to_owned())
        .filter(|image| !image.is_empty());
    if image.is_none() && mode == WriteMode::Create {
        errors.add("image", REQUIRED);
    }

    let tags = payload.tags.unwrap_or_default();
    if tags.is_empty() {
        errors.add("tags", EMPTY_LIST);
    }
    for id in duplicates(tags.iter().copied()) {
        errors.add("tags", format!("Tag {id} is listed more than once"));
    }

    let ingredients = payload.ingredients.unwrap_or_default();
    if ingredients.is_empty() {
        errors.add("ingredients", EMPTY_LIST);
    }
    for id in duplicates(ingredients.iter().map(|i| i.id)) {
        errors.add("ingredients", format!("Ingredient {id} is listed more than once"));
    }
    let ingredients: Vec<IngredientLine> = ingredients
        .iter()
        .map(|line| {
            let amount = in_range(line.amount, MIN_AMOUNT, MAX_AMOUNT).unwrap_or_else(|| {
                errors.add(
                    "ingredients",
                    format!(
                        "Amount of ingredient {} must be between {MIN_AMOUNT} and {MAX_AMOUNT}",
                        line.id
                    ),
                );
                0
            });

            IngredientLine {
                id: line.id,
                amount,
            }
        })
        .collect();

    errors.into_result(RecipeDraft {
        name,
        text,
        cooking_time,
        image,
        tags,
        ingredients,
    })
}

/// Ids from `requested` that are missing from `existing`, in request order.
pub fn unknown_ids(requested: &[Id], existing: &[Id]) -> Vec<Id> {
    let existing: HashSet<&Id> = existing.iter().collect();

    requested
        .iter()
        .filter(|id| !existing.contains(id))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IngredientAmountPayload;
    use rstest::{fixture, rstest};

    fn line(id: Id, amount: i64) -> IngredientAmountPayload {
        IngredientAmountPayload { id, amount }
    }

    #[fixture]
    fn payload() -> RecipePayload {
        RecipePayload {
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(20),
            image: Some(String::from("data:image/png;base64,iVBORw0KGgo=")),
            tags: Some(vec![1, 2]),
            ingredients: Some(vec![line(10, 200), line(11, 2)]),
        }
    }

    fn field_errors(result: Result<RecipeDraft, RecipeError>, field: &str) -> Vec<String> {
        match result {
            Err(RecipeError::Validation(errors)) => {
                errors.field(field).map(<[String]>::to_vec).unwrap_or_default()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[rstest]
    fn accepts_complete_payload(payload: RecipePayload) {
        let draft = parse_and_validate(payload, WriteMode::Create).unwrap();

        assert_eq!(draft.name, "Pancakes");
        assert_eq!(draft.tags, vec![1, 2]);
        assert_eq!(
            draft.ingredients,
            vec![
                IngredientLine { id: 10, amount: 200 },
                IngredientLine { id: 11, amount: 2 },
            ]
        );
    }

    #[rstest]
    fn rejects_empty_tags(mut payload: RecipePayload) {
        payload.tags = Some(vec![]);

        assert_eq!(
            field_errors(parse_and_validate(payload, WriteMode::Create), "tags"),
            vec![EMPTY_LIST]
        );
    }

    #[rstest]
    fn rejects_missing_ingredients(mut payload: RecipePayload) {
        payload.ingredients = None;

        assert_eq!(
            field_errors(parse_and_validate(payload, WriteMode::Update), "ingredients"),
            vec![EMPTY_LIST]
        );
    }

    #[rstest]
    fn rejects_duplicate_ingredient(mut payload: RecipePayload) {
        payload.ingredients = Some(vec![line(10, 1), line(10, 5), line(10, 7)]);

        assert_eq!(
            field_errors(parse_and_validate(payload, WriteMode::Create), "ingredients"),
            vec!["Ingredient 10 is listed more than once"]
        );
    }

    #[rstest]
    fn rejects_duplicate_tag(mut payload: RecipePayload) {
        payload.tags = Some(vec![3, 3]);

        assert_eq!(
            field_errors(parse_and_validate(payload, WriteMode::Create), "tags").len(),
            1
        );
    }

    #[rstest]
    #[case(0)]
    #[case(-5)]
    #[case(i64::from(MAX_AMOUNT) + 1)]
    #[case(5_000_000_000)]
    #[case(i64::MIN)]
    fn rejects_amount_out_of_range(mut payload: RecipePayload, #[case] amount: i64) {
        payload.ingredients = Some(vec![line(10, amount)]);

        assert_eq!(
            field_errors(parse_and_validate(payload, WriteMode::Create), "ingredients").len(),
            1
        );
    }

    #[rstest]
    #[case(MIN_COOKING_TIME.into(), true)]
    #[case(MAX_COOKING_TIME.into(), true)]
    #[case(i64::from(MIN_COOKING_TIME) - 1, false)]
    #[case(i64::from(MAX_COOKING_TIME) + 1, false)]
    #[case(5_000_000_000, false)]
    #[case(-5_000_000_000, false)]
    fn cooking_time_bounds(mut payload: RecipePayload, #[case] time: i64, #[case] valid: bool) {
        payload.cooking_time = Some(time);

        assert_eq!(parse_and_validate(payload, WriteMode::Create).is_ok(), valid);
    }

    #[rstest]
    fn oversized_cooking_time_is_a_field_error(mut payload: RecipePayload) {
        payload.cooking_time = Some(5_000_000_000);

        assert_eq!(
            field_errors(parse_and_validate(payload, WriteMode::Create), "cooking_time"),
            vec![format!(
                "Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"
            )]
        );
    }

    #[rstest]
    fn image_required_only_on_create(mut payload: RecipePayload) {
        payload.image = Some(String::from("   "));

        assert_eq!(
            field_errors(parse_and_validate(payload.clone(), WriteMode::Create), "image"),
            vec![REQUIRED]
        );

        let draft = parse_and_validate(payload, WriteMode::Update).unwrap();
        assert_eq!(draft.image, None);
    }

    #[rstest]
    fn reports_every_field_at_once() {
        match parse_and_validate(RecipePayload::default(), WriteMode::Create) {
            Err(RecipeError::Validation(errors)) => {
                for field in ["name", "text", "cooking_time", "image", "tags", "ingredients"] {
                    assert!(errors.field(field).is_some(), "{field} not reported");
                }
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[rstest]
    fn rejects_overlong_name(mut payload: RecipePayload) {
        payload.name = Some("x".repeat(RECIPE_NAME_MAX_LENGTH + 1));

        assert_eq!(
            field_errors(parse_and_validate(payload, WriteMode::Create), "name").len(),
            1
        );
    }

    #[rstest]
    fn unknown_ids_keep_request_order() {
        assert_eq!(unknown_ids(&[4, 1, 9, 2], &[1, 2]), vec![4, 9]);
        assert!(unknown_ids(&[1], &[1, 2]).is_empty());
    }
}
