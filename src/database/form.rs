use std::str::FromStr;

use crate::{constants::TRUTHY_VALUES, schema::Id};

pub type FormData = Vec<(String, String)>;

/// Query string pairs in request order; keys may repeat.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner
            .iter()
            .filter(|(k, value)| k == key && !value.is_empty())
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Absent and unparsable values both come back as `None`.
    pub fn get_number<T>(&self, key: &str) -> Option<T>
    where
        T: FromStr,
    {
        self.get_str(key).and_then(|value| value.trim().parse().ok())
    }

    pub fn get_flag(&self, key: &str) -> bool {
        self.get_str(key)
            .map(|value| TRUTHY_VALUES.contains(&value.trim().to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub tags: Vec<String>,
    pub author: Option<Id>,
}

impl From<&Form> for RecipeFilter {
    fn from(form: &Form) -> Self {
        Self {
            is_favorited: form.get_flag("is_favorited"),
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart"),
            tags: form.get_all("tags").into_iter().map(str::to_owned).collect(),
            author: form.get_number("author"),
        }
    }
}

/// Cap on the recipes embedded in a subscription view. Anything that is not
/// a non-negative integer means no cap.
pub fn recipes_limit(form: &Form) -> Option<usize> {
    form.get_number::<usize>("recipes_limit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[rstest]
    fn recipe_filter_collects_repeated_tags() {
        let filter = RecipeFilter::from(&form(&[
            ("tags", "breakfast"),
            ("is_favorited", "1"),
            ("tags", "dinner"),
            ("author", "3"),
            ("tags", ""),
        ]));

        assert_eq!(filter.tags, vec!["breakfast", "dinner"]);
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
        assert_eq!(filter.author, Some(3));
    }

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("True", true)]
    #[case("0", false)]
    #[case("false", false)]
    #[case("", false)]
    fn flags(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(form(&[("is_in_shopping_cart", value)]).get_flag("is_in_shopping_cart"), expected);
    }

    #[rstest]
    #[case(&[("recipes_limit", "2")], Some(2))]
    #[case(&[("recipes_limit", "0")], Some(0))]
    #[case(&[("recipes_limit", "abc")], None)]
    #[case(&[("recipes_limit", "-1")], None)]
    #[case(&[], None)]
    fn recipes_limit_parsing(#[case] pairs: &[(&str, &str)], #[case] expected: Option<usize>) {
        assert_eq!(recipes_limit(&form(pairs)), expected);
    }

    #[rstest]
    fn unparsable_author_is_ignored() {
        assert_eq!(RecipeFilter::from(&form(&[("author", "me")])).author, None);
    }
}
