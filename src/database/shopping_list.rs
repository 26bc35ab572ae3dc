use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    constants::{SHOPPING_LIST_BRAND, SHOPPING_LIST_SUFFIX},
    schema::CartLine,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per (name, unit). Output is ordered by name, then unit.
pub fn aggregate(lines: impl IntoIterator<Item = CartLine>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ShoppingList {
    pub owner: String,
    pub username: String,
    pub date: NaiveDate,
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn new(
        owner: String,
        username: String,
        date: NaiveDate,
        lines: impl IntoIterator<Item = CartLine>,
    ) -> Self {
        Self {
            owner,
            username,
            date,
            items: aggregate(lines),
        }
    }

    pub fn filename(&self) -> String {
        format!("{}{SHOPPING_LIST_SUFFIX}", self.username)
    }

    pub fn render(&self) -> String {
        let lines = self
            .items
            .iter()
            .map(|item| {
                format!(
                    "- {} ({}) - {}",
                    item.name, item.measurement_unit, item.amount
                )
            })
            .collect::<Vec<String>>()
            .join("\n");

        format!(
            "Shopping list for: {}\n\nDate: {}\n\n{lines}\n\n{SHOPPING_LIST_BRAND} ({})",
            self.owner,
            self.date.format("%Y-%m-%d"),
            self.date.year()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    #[fixture]
    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[rstest]
    fn sums_same_ingredient_across_recipes() {
        let items = aggregate(vec![line("Salt", "g", 5), line("Salt", "g", 3)]);

        assert_eq!(
            items,
            vec![ShoppingListItem {
                name: String::from("Salt"),
                measurement_unit: String::from("g"),
                amount: 8,
            }]
        );
    }

    #[rstest]
    fn keeps_units_apart() {
        let items = aggregate(vec![
            line("Sugar", "g", 100),
            line("Sugar", "tbsp", 2),
            line("Sugar", "g", 50),
        ]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].amount, 150);
        assert_eq!(items[1].measurement_unit, "tbsp");
    }

    #[rstest]
    fn orders_by_name() {
        let items = aggregate(vec![
            line("Yeast", "g", 7),
            line("Butter", "g", 30),
            line("Milk", "ml", 250),
        ]);
        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();

        assert_eq!(names, vec!["Butter", "Milk", "Yeast"]);
    }

    #[rstest]
    fn renders_report(date: NaiveDate) {
        let list = ShoppingList::new(
            String::from("Julia Child"),
            String::from("julia"),
            date,
            vec![line("Salt", "g", 5), line("Flour", "g", 500), line("Salt", "g", 3)],
        );

        assert_eq!(
            list.render(),
            "Shopping list for: Julia Child\n\n\
             Date: 2024-03-09\n\n\
             - Flour (g) - 500\n\
             - Salt (g) - 8\n\n\
             Foodgram (2024)"
        );
        assert_eq!(list.filename(), "julia_shopping_list.txt");
    }
}
