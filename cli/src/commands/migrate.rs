use anyhow::Result;

use larder_core::service::LarderService;

use super::helpers::print_json;

pub(crate) fn cmd_migrate_legacy(svc: &LarderService, json: bool) -> Result<()> {
    let summary = svc.promote_legacy_entries()?;
    if json {
        return print_json(&summary);
    }

    let recipes = summary.recipe_ingredients_promoted;
    let items = summary.shopping_items_promoted;
    println!("Promoted {recipes} recipe ingredients and {items} shopping list items");
    if summary.skipped > 0 {
        let skipped = summary.skipped;
        eprintln!("Skipped {skipped} rows with no ingredient name");
    }
    Ok(())
}
