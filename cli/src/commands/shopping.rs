use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::info;

use larder_core::export::write_shopping_list_csv;
use larder_core::models::ShoppingListDetail;
use larder_core::service::LarderService;

use super::helpers::{
    exit_empty, exit_not_found, format_date, print_json, quantity_with_unit, truncate,
};

pub(super) fn print_shopping_list(detail: &ShoppingListDetail) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Done")]
        checked: &'static str,
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let list = &detail.list;
    let total = detail.items.len();
    let done = detail.checked_count();
    println!("=== {} ===  ({done}/{total} checked)", list.name);

    if detail.items.is_empty() {
        println!("  Nothing on this list yet");
        return;
    }

    let rows: Vec<ItemRow> = detail
        .items
        .iter()
        .map(|item| ItemRow {
            id: item.id,
            checked: if item.checked { "[x]" } else { "[ ]" },
            name: truncate(item.display_name(), 30),
            quantity: truncate(&item.quantity, 24),
            unit: item.display_unit().to_string(),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn show_or_print(detail: &ShoppingListDetail, json: bool) -> Result<()> {
    if json {
        return print_json(detail);
    }
    print_shopping_list(detail);
    Ok(())
}

pub(crate) fn cmd_list_create(svc: &LarderService, name: &str, json: bool) -> Result<()> {
    let list = svc.create_shopping_list(name)?;
    if json {
        print_json(&list)?;
    } else {
        let id = list.id;
        println!("Created shopping list: {} (id: {id})", list.name);
    }
    Ok(())
}

pub(crate) fn cmd_list_ls(svc: &LarderService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ListRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Updated")]
        updated: String,
    }

    let lists = svc.list_shopping_lists()?;
    if lists.is_empty() {
        exit_empty("No shopping lists found", json);
    }

    if json {
        return print_json(&lists);
    }

    let rows: Vec<ListRow> = lists
        .iter()
        .map(|l| ListRow {
            id: l.id,
            name: truncate(&l.name, 40),
            updated: format_date(&l.updated_at),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_list_show(svc: &LarderService, list_id: i64, json: bool) -> Result<()> {
    let detail = svc.get_shopping_list_detail(list_id)?;
    show_or_print(&detail, json)
}

pub(crate) fn cmd_list_from_recipe(
    svc: &LarderService,
    recipe_id: i64,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let detail = svc.shopping_list_from_recipe(recipe_id, name)?;
    if !json {
        let id = detail.list.id;
        println!("Created shopping list {id} from recipe {recipe_id}\n");
    }
    show_or_print(&detail, json)
}

pub(crate) fn cmd_list_add_recipe(
    svc: &LarderService,
    list_id: i64,
    recipe_id: i64,
    json: bool,
) -> Result<()> {
    let detail = svc.add_recipe_to_shopping_list(list_id, recipe_id)?;
    if !json {
        println!("Merged recipe {recipe_id} into shopping list {list_id}\n");
    }
    show_or_print(&detail, json)
}

pub(crate) fn cmd_list_add_item(
    svc: &LarderService,
    list_id: i64,
    name: &str,
    quantity: &str,
    unit: Option<&str>,
    json: bool,
) -> Result<()> {
    let item = svc.add_shopping_list_item(list_id, name, quantity, unit)?;
    if json {
        print_json(&item)?;
    } else {
        let what = quantity_with_unit(&item.quantity, item.display_unit());
        let item_name = item.display_name();
        let id = item.id;
        if what.is_empty() {
            println!("Added {item_name} (id: {id})");
        } else {
            println!("Added {what} {item_name} (id: {id})");
        }
    }
    Ok(())
}

pub(crate) fn cmd_list_toggle(
    svc: &LarderService,
    list_id: i64,
    item_id: i64,
    json: bool,
) -> Result<()> {
    let checked = svc.toggle_shopping_list_item(list_id, item_id)?;
    if json {
        println!("{}", serde_json::json!({ "id": item_id, "checked": checked }));
    } else if checked {
        println!("Checked item {item_id}");
    } else {
        println!("Unchecked item {item_id}");
    }
    Ok(())
}

pub(crate) fn cmd_list_remove_item(
    svc: &LarderService,
    list_id: i64,
    item_id: i64,
    json: bool,
) -> Result<()> {
    if !svc.remove_shopping_list_item(list_id, item_id)? {
        exit_not_found(
            &format!("Item {item_id} not found in shopping list {list_id}"),
            json,
        );
    }
    if json {
        println!("{}", serde_json::json!({ "removed": item_id }));
    } else {
        println!("Removed item {item_id}");
    }
    Ok(())
}

pub(crate) fn cmd_list_delete(svc: &LarderService, list_id: i64, json: bool) -> Result<()> {
    if !svc.delete_shopping_list(list_id)? {
        exit_not_found(&format!("Shopping list {list_id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": list_id }));
    } else {
        println!("Deleted shopping list {list_id}");
    }
    Ok(())
}

pub(crate) fn cmd_list_export(
    svc: &LarderService,
    list_id: i64,
    output: Option<&Path>,
) -> Result<()> {
    let detail = svc.get_shopping_list_detail(list_id)?;
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create file: {}", path.display()))?;
            write_shopping_list_csv(&detail, BufWriter::new(file))?;
            info!(
                list_id,
                items = detail.items.len(),
                path = %path.display(),
                "exported shopping list"
            );
        }
        None => write_shopping_list_csv(&detail, io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_to_file() {
        let svc = LarderService::new_in_memory().unwrap();
        let list = svc.create_shopping_list("Market").unwrap();
        svc.add_shopping_list_item(list.id, "Leeks", "3", None)
            .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("market.csv");
        cmd_list_export(&svc, list.id, Some(&path)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "ingredient,quantity,unit,checked\nLeeks,3,,false\n");
    }

    #[test]
    fn test_export_missing_list() {
        let svc = LarderService::new_in_memory().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("none.csv");
        assert!(cmd_list_export(&svc, 42, Some(&path)).is_err());
        assert!(!path.exists());
    }
}
