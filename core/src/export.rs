use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::ShoppingListDetail;

#[derive(Serialize)]
struct CsvRow<'a> {
    ingredient: &'a str,
    quantity: &'a str,
    unit: &'a str,
    checked: bool,
}

/// Write one CSV row per shopping list line, in list order.
pub fn write_shopping_list_csv<W: Write>(detail: &ShoppingListDetail, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if detail.items.is_empty() {
        wtr.write_record(["ingredient", "quantity", "unit", "checked"])?;
    }
    for item in &detail.items {
        wtr.serialize(CsvRow {
            ingredient: item.display_name(),
            quantity: &item.quantity,
            unit: item.display_unit(),
            checked: item.checked,
        })
        .with_context(|| format!("Failed to write line {}", item.id))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::merge::{Candidate, WorkingList};
    use crate::models::LineKey;

    fn export(db: &Database, list_id: i64) -> String {
        let detail = db.get_shopping_list_detail(list_id).unwrap();
        let mut out = Vec::new();
        write_shopping_list_csv(&detail, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_export_rows() {
        let db = Database::open_in_memory().unwrap();
        let mut working = WorkingList::new();
        working.merge(Candidate::new(LineKey::legacy("Flour", "g"), "200"));
        working.merge(Candidate::new(LineKey::legacy("Salt, sea", ""), "al gusto"));
        let list = db.create_shopping_list_with_items("Weekend", &working).unwrap();

        let items = db.get_shopping_list_items(list.id).unwrap();
        db.toggle_shopping_list_item(list.id, items[0].id).unwrap();

        let csv = export(&db, list.id);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ingredient,quantity,unit,checked");
        assert_eq!(lines[1], "Flour,200,g,true");
        assert_eq!(lines[2], "\"Salt, sea\",al gusto,,false");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_export_empty_list_has_header() {
        let db = Database::open_in_memory().unwrap();
        let list = db.create_shopping_list("Empty").unwrap();
        assert_eq!(export(&db, list.id), "ingredient,quantity,unit,checked\n");
    }
}
