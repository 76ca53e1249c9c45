mod helpers;
mod ingredient;
mod migrate;
mod plan;
mod recipe;
mod shopping;
mod unit;

pub(crate) use ingredient::cmd_ingredient_search;
pub(crate) use migrate::cmd_migrate_legacy;
pub(crate) use plan::{
    cmd_plan_add_recipe, cmd_plan_create, cmd_plan_delete, cmd_plan_list, cmd_plan_remove_recipe,
    cmd_plan_set_count, cmd_plan_shop, cmd_plan_show,
};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_import,
    cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show,
};
pub(crate) use shopping::{
    cmd_list_add_item, cmd_list_add_recipe, cmd_list_create, cmd_list_delete, cmd_list_export,
    cmd_list_from_recipe, cmd_list_ls, cmd_list_remove_item, cmd_list_show, cmd_list_toggle,
};
pub(crate) use unit::{cmd_unit_add, cmd_unit_list, cmd_unit_seed};
