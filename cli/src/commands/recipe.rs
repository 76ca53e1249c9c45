use anyhow::{Context, Result, bail};
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::info;

use larder_core::merge::format_quantity;
use larder_core::models::{NewRecipe, RecipeDetail};
use larder_core::service::LarderService;

use super::helpers::{
    exit_empty, exit_not_found, format_date, print_json, quantity_with_unit, truncate,
};

pub(crate) fn cmd_recipe_create(
    svc: &LarderService,
    title: String,
    description: Option<String>,
    instructions: Option<String>,
    json: bool,
) -> Result<()> {
    let recipe = svc.create_recipe(&NewRecipe {
        title,
        description,
        instructions,
    })?;
    if json {
        print_json(&recipe)?;
    } else {
        let id = recipe.id;
        println!("Created recipe: {} (id: {id})", recipe.title);
        println!("Add ingredients with: larder recipe add-ingredient {id} <name> [quantity] --unit <unit>");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_add_ingredient(
    svc: &LarderService,
    recipe_id: i64,
    name: &str,
    quantity: &str,
    unit: Option<&str>,
    optional: bool,
    json: bool,
) -> Result<()> {
    let recipe = svc.database().get_recipe(recipe_id)?;
    let ingredient = svc.add_recipe_ingredient(recipe.id, name, quantity, unit, optional)?;

    if json {
        print_json(&ingredient)?;
    } else {
        let what = quantity_with_unit(&ingredient.quantity, ingredient.display_unit());
        let ing_name = ingredient.display_name();
        let title = &recipe.title;
        if what.is_empty() {
            println!("Added {ing_name} to {title}");
        } else {
            println!("Added {what} {ing_name} to {title}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_remove_ingredient(
    svc: &LarderService,
    recipe_id: i64,
    ingredient_id: i64,
    json: bool,
) -> Result<()> {
    if !svc.remove_recipe_ingredient(recipe_id, ingredient_id)? {
        exit_not_found(
            &format!("Ingredient line {ingredient_id} not found in recipe {recipe_id}"),
            json,
        );
    }
    if json {
        println!("{}", serde_json::json!({ "removed": ingredient_id }));
    } else {
        println!("Removed ingredient line {ingredient_id} from recipe {recipe_id}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &LarderService, recipe_id: i64, json: bool) -> Result<()> {
    let detail = svc.get_recipe_detail(recipe_id)?;
    if json {
        return print_json(&detail);
    }
    print_recipe(&detail);
    Ok(())
}

fn print_recipe(detail: &RecipeDetail) {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Optional")]
        optional: String,
    }

    let recipe = &detail.recipe;
    println!("=== {} ===", recipe.title);
    if let Some(ref d) = recipe.description {
        println!("  {d}");
    }
    println!();

    if detail.ingredients.is_empty() {
        println!("  No ingredients yet");
    } else {
        let rows: Vec<IngredientRow> = detail
            .ingredients
            .iter()
            .map(|ing| IngredientRow {
                id: ing.id,
                name: truncate(ing.display_name(), 30),
                quantity: ing.quantity.clone(),
                unit: ing.display_unit().to_string(),
                optional: if ing.optional { "yes".into() } else { String::new() },
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    if let Some(ref steps) = recipe.instructions {
        println!("\n  INSTRUCTIONS:");
        for line in steps.lines() {
            println!("    {line}");
        }
    }
}

pub(crate) fn cmd_recipe_list(svc: &LarderService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Updated")]
        updated: String,
    }

    let recipes = svc.list_recipes()?;
    if recipes.is_empty() {
        exit_empty("No recipes found", json);
    }

    if json {
        return print_json(&recipes);
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            title: truncate(&r.title, 40),
            updated: format_date(&r.updated_at),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &LarderService, recipe_id: i64, json: bool) -> Result<()> {
    if !svc.delete_recipe(recipe_id)? {
        exit_not_found(&format!("Recipe {recipe_id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe_id }));
    } else {
        println!("Deleted recipe {recipe_id}");
    }
    Ok(())
}

/// One ingredient as read from a Cooklang file, before catalog resolution.
#[derive(Debug, PartialEq)]
struct ImportedIngredient {
    name: String,
    quantity: String,
    unit: Option<String>,
}

pub(crate) fn cmd_recipe_import(
    svc: &LarderService,
    file: &Path,
    title_override: Option<String>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let (metadata_title, ingredients) = parse_cooklang(&input)?;
    let title = title_override
        .or(metadata_title)
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe title. Use --title to specify one")?;

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let recipe = svc.create_recipe(&NewRecipe {
        title,
        description: None,
        instructions: None,
    })?;
    for ing in &ingredients {
        svc.add_recipe_ingredient(
            recipe.id,
            &ing.name,
            &ing.quantity,
            ing.unit.as_deref(),
            false,
        )
        .with_context(|| format!("Failed to add '{}'", ing.name))?;
    }

    let detail = svc.get_recipe_detail(recipe.id)?;
    info!(
        recipe_id = recipe.id,
        ingredients = detail.ingredients.len(),
        file = %file.display(),
        "imported Cooklang recipe"
    );
    if json {
        print_json(&detail)?;
    } else {
        let rtitle = &detail.recipe.title;
        let id = detail.recipe.id;
        let ing_count = detail.ingredients.len();
        println!("Imported recipe: {rtitle} (id: {id}, {ing_count} ingredients)");
    }
    Ok(())
}

fn parse_cooklang(input: &str) -> Result<(Option<String>, Vec<ImportedIngredient>)> {
    let (recipe_data, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let converter = cooklang::Converter::default();
    let grouped = recipe_data.group_ingredients(&converter);
    let ingredients = grouped
        .iter()
        .map(cooklang_ingredient_to_line)
        .collect();

    Ok((recipe_data.metadata.title().map(String::from), ingredients))
}

fn cooklang_ingredient_to_line(
    gi: &cooklang::ingredient_list::GroupedIngredient<'_>,
) -> ImportedIngredient {
    // Quantities stay text; only the first grouped quantity is kept
    let (quantity, unit) = gi.quantity.iter().next().map_or(
        (String::new(), None),
        |qty: &cooklang::Quantity| {
            let value = match qty.value() {
                cooklang::Value::Number(n) => format_quantity(n.value()),
                cooklang::Value::Range { start, end } => format!(
                    "{}-{}",
                    format_quantity(start.value()),
                    format_quantity(end.value())
                ),
                cooklang::Value::Text(t) => t.clone(),
            };
            (value, qty.unit().map(String::from))
        },
    );

    ImportedIngredient {
        name: gi.ingredient.display_name().to_string(),
        quantity,
        unit,
    }
}
