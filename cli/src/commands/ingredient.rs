use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use larder_core::service::LarderService;

use super::helpers::{exit_empty, print_json, truncate};

pub(crate) fn cmd_ingredient_search(
    svc: &LarderService,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
    }

    let ingredients = svc.search_ingredients(query, limit)?;
    if ingredients.is_empty() {
        let message = if query.trim().is_empty() {
            "No ingredients in the catalog yet".to_string()
        } else {
            format!("No ingredients matching '{query}'")
        };
        exit_empty(&message, json);
    }

    if json {
        return print_json(&ingredients);
    }

    let rows: Vec<IngredientRow> = ingredients
        .iter()
        .map(|i| IngredientRow {
            id: i.id,
            name: truncate(&i.name, 40),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}
