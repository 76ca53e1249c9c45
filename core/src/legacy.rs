//! Promotion of free-text ingredient rows to catalog references.

use anyhow::Result;
use tracing::{info, warn};

use crate::catalog::{Catalog, default_unit};
use crate::db::{Database, LegacyRow};
use crate::models::LegacyMigrationSummary;

/// Rewrite every recipe ingredient and shopping list line that still stores
/// its ingredient as text so that it references the catalog instead.
///
/// Blank unit labels resolve to the default `unit` entry. Rows without a name
/// are left alone and counted as skipped. Everything runs in one transaction.
pub fn promote_legacy_entries(db: &Database) -> Result<LegacyMigrationSummary> {
    db.transaction(|db| {
        let mut summary = LegacyMigrationSummary::default();

        for row in db.legacy_recipe_ingredients()? {
            match resolve(db, &row)? {
                Some((ingredient_id, unit_id)) => {
                    db.promote_recipe_ingredient(row.id, ingredient_id, Some(unit_id))?;
                    summary.recipe_ingredients_promoted += 1;
                }
                None => summary.skipped += 1,
            }
        }

        for row in db.legacy_shopping_list_items()? {
            match resolve(db, &row)? {
                Some((ingredient_id, unit_id)) => {
                    db.promote_shopping_list_item(row.id, ingredient_id, Some(unit_id))?;
                    summary.shopping_items_promoted += 1;
                }
                None => summary.skipped += 1,
            }
        }

        info!(
            recipe_ingredients = summary.recipe_ingredients_promoted,
            shopping_items = summary.shopping_items_promoted,
            skipped = summary.skipped,
            "promoted legacy entries"
        );
        Ok(summary)
    })
}

fn resolve(db: &Database, row: &LegacyRow) -> Result<Option<(i64, i64)>> {
    let Some(ingredient) = db.get_or_create_ingredient(&row.name)? else {
        warn!(row_id = row.id, "legacy row has no ingredient name, skipping");
        return Ok(None);
    };
    let unit = match db.get_or_create_unit(&row.unit)? {
        Some(unit) => unit,
        None => default_unit(db)?,
    };
    Ok(Some((ingredient.id, unit.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{Candidate, LineItem, WorkingList};
    use crate::models::{LineKey, NewRecipe, NewRecipeIngredient};

    fn legacy_line(name: &str, unit: &str, qty: &str) -> NewRecipeIngredient {
        NewRecipeIngredient {
            key: LineKey::legacy(name, unit),
            quantity: qty.to_string(),
            optional: false,
        }
    }

    #[test]
    fn test_promote_recipe_and_list_rows() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db
            .create_recipe(&NewRecipe {
                title: "Stew".to_string(),
                description: None,
                instructions: None,
            })
            .unwrap();
        db.add_recipe_ingredient(recipe.id, &legacy_line("Carrot", "", "3"))
            .unwrap();
        db.add_recipe_ingredient(recipe.id, &legacy_line(" carrot ", "g", "100"))
            .unwrap();
        db.add_recipe_ingredient(recipe.id, &legacy_line("  ", "g", "1"))
            .unwrap();

        let mut working = WorkingList::new();
        working.merge(Candidate::new(LineKey::legacy("CARROT", "G"), "5"));
        let list = db.create_shopping_list_with_items("Old list", &working).unwrap();

        let summary = promote_legacy_entries(&db).unwrap();
        assert_eq!(summary.recipe_ingredients_promoted, 2);
        assert_eq!(summary.shopping_items_promoted, 1);
        assert_eq!(summary.skipped, 1);

        let ingredients = db.get_recipe_ingredients(recipe.id).unwrap();
        let carrot = ingredients[0].ingredient.canonical_id().unwrap();
        assert_eq!(ingredients[1].ingredient.canonical_id(), Some(carrot));
        assert_eq!(ingredients[0].unit_label.as_deref(), Some("ea"));
        assert_eq!(ingredients[1].unit_label.as_deref(), Some("g"));
        assert!(ingredients[2].line_key().is_legacy());

        // The promoted list line now merges with canonical candidates
        let items = db.get_shopping_list_items(list.id).unwrap();
        assert_eq!(items[0].line_key(), ingredients[1].line_key());
        let mut working = WorkingList::from_items(items.iter().map(LineItem::from).collect());
        working.merge(Candidate::new(ingredients[1].line_key(), "100"));
        assert_eq!(working.items()[0].quantity, "105");
    }

    #[test]
    fn test_promote_with_nothing_to_do() {
        let db = Database::open_in_memory().unwrap();
        let summary = promote_legacy_entries(&db).unwrap();
        assert_eq!(summary.recipe_ingredients_promoted, 0);
        assert_eq!(summary.shopping_items_promoted, 0);
        assert_eq!(summary.skipped, 0);
    }
}
