use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use larder_core::service::LarderService;

use super::helpers::{exit_empty, print_json};

pub(crate) fn cmd_unit_list(svc: &LarderService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct UnitRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Symbol")]
        symbol: String,
    }

    let units = svc.list_units()?;
    if units.is_empty() {
        exit_empty("No units found. Add the built-in set with: larder unit seed", json);
    }

    if json {
        return print_json(&units);
    }

    let rows: Vec<UnitRow> = units
        .into_iter()
        .map(|u| UnitRow {
            id: u.id,
            name: u.name,
            symbol: u.symbol,
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_unit_add(
    svc: &LarderService,
    name: &str,
    symbol: Option<&str>,
    json: bool,
) -> Result<()> {
    let unit = svc.add_unit(name, symbol)?;
    if json {
        print_json(&unit)?;
    } else {
        let id = unit.id;
        println!("Unit: {} ({}) (id: {id})", unit.name, unit.symbol);
    }
    Ok(())
}

pub(crate) fn cmd_unit_seed(svc: &LarderService, json: bool) -> Result<()> {
    let added = svc.seed_default_units()?;
    if json {
        println!("{}", serde_json::json!({ "added": added }));
    } else if added == 0 {
        println!("All built-in units are already present");
    } else {
        println!("Added {added} units");
    }
    Ok(())
}
