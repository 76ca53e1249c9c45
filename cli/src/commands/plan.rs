use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::service::LarderService;

use super::helpers::{exit_empty, exit_not_found, format_date, print_json, truncate};
use super::shopping::print_shopping_list;

pub(crate) fn cmd_plan_create(svc: &LarderService, name: &str, json: bool) -> Result<()> {
    let plan = svc.create_meal_plan(name)?;
    if json {
        print_json(&plan)?;
    } else {
        let id = plan.id;
        println!("Created meal plan: {} (id: {id})", plan.name);
        println!("Add recipes with: larder plan add-recipe {id} <recipe-id>");
    }
    Ok(())
}

pub(crate) fn cmd_plan_list(svc: &LarderService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Updated")]
        updated: String,
    }

    let plans = svc.list_meal_plans()?;
    if plans.is_empty() {
        exit_empty("No meal plans found", json);
    }

    if json {
        return print_json(&plans);
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            id: p.id,
            name: truncate(&p.name, 40),
            updated: format_date(&p.updated_at),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_plan_show(svc: &LarderService, plan_id: i64, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct PlanRecipeRow {
        #[tabled(rename = "Recipe ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Times")]
        count: u32,
    }

    let detail = svc.get_meal_plan_detail(plan_id)?;
    if json {
        return print_json(&detail);
    }

    println!("=== {} ===", detail.plan.name);
    if detail.recipes.is_empty() {
        println!("  No recipes in this plan yet");
        return Ok(());
    }

    let rows: Vec<PlanRecipeRow> = detail
        .recipes
        .iter()
        .map(|r| PlanRecipeRow {
            id: r.recipe_id,
            title: truncate(r.recipe_title.as_deref().unwrap_or("?"), 40),
            count: r.count,
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_plan_add_recipe(
    svc: &LarderService,
    plan_id: i64,
    recipe_id: i64,
    json: bool,
) -> Result<()> {
    let count = svc.add_recipe_to_meal_plan(plan_id, recipe_id)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "meal_plan_id": plan_id, "recipe_id": recipe_id, "count": count })
        );
    } else {
        println!("Recipe {recipe_id} is now in plan {plan_id} ({count}x)");
    }
    Ok(())
}

pub(crate) fn cmd_plan_set_count(
    svc: &LarderService,
    plan_id: i64,
    recipe_id: i64,
    count: i64,
    json: bool,
) -> Result<()> {
    let stored = svc.set_meal_plan_recipe_count(plan_id, recipe_id, count)?;
    if i64::from(stored) != count && !json {
        eprintln!("Count {count} is out of range, storing {stored}");
    }
    if json {
        println!(
            "{}",
            serde_json::json!({ "meal_plan_id": plan_id, "recipe_id": recipe_id, "count": stored })
        );
    } else {
        println!("Recipe {recipe_id} will be cooked {stored}x in plan {plan_id}");
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove_recipe(
    svc: &LarderService,
    plan_id: i64,
    recipe_id: i64,
    json: bool,
) -> Result<()> {
    if !svc.remove_recipe_from_meal_plan(plan_id, recipe_id)? {
        exit_not_found(
            &format!("Recipe {recipe_id} is not in meal plan {plan_id}"),
            json,
        );
    }
    if json {
        println!("{}", serde_json::json!({ "removed": recipe_id }));
    } else {
        println!("Removed recipe {recipe_id} from plan {plan_id}");
    }
    Ok(())
}

pub(crate) fn cmd_plan_delete(svc: &LarderService, plan_id: i64, json: bool) -> Result<()> {
    if !svc.delete_meal_plan(plan_id)? {
        exit_not_found(&format!("Meal plan {plan_id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": plan_id }));
    } else {
        println!("Deleted meal plan {plan_id}");
    }
    Ok(())
}

pub(crate) fn cmd_plan_shop(svc: &LarderService, plan_id: i64, json: bool) -> Result<()> {
    let detail = svc.shopping_list_from_meal_plan(plan_id)?;
    if json {
        return print_json(&detail);
    }
    let id = detail.list.id;
    println!("Created shopping list {id} from meal plan {plan_id}\n");
    print_shopping_list(&detail);
    Ok(())
}
