use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::{self, Catalog};
use crate::db::Database;
use crate::legacy;
use crate::merge::{Candidate, LineItem, WorkingList};
use crate::models::{
    Ingredient, LegacyMigrationSummary, LineKey, MealPlan, MealPlanDetail, NewRecipe,
    NewRecipeIngredient, Recipe, RecipeDetail, RecipeIngredient, ShoppingList,
    ShoppingListDetail, ShoppingListItem, Unit, validate_name,
};

pub struct LarderService {
    db: Database,
}

impl LarderService {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Catalog ---

    pub fn list_units(&self) -> Result<Vec<Unit>> {
        self.db.list_units()
    }

    pub fn add_unit(&self, name: &str, symbol: Option<&str>) -> Result<Unit> {
        let name = validate_name("Unit", name)?;
        if let Some(existing) = self.db.find_unit_by_name(&name)? {
            return Ok(existing);
        }
        let symbol = symbol
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| catalog::default_symbol(&name), String::from);
        self.db.insert_unit(&name, &symbol)
    }

    pub fn seed_default_units(&self) -> Result<usize> {
        catalog::seed_default_units(&self.db)
    }

    pub fn search_ingredients(&self, query: &str, limit: usize) -> Result<Vec<Ingredient>> {
        self.db.search_ingredients(query, limit)
    }

    /// Resolve free-text ingredient and unit names to a canonical line key.
    pub fn resolve_line_key(&self, name: &str, unit: Option<&str>) -> Result<LineKey> {
        let name = validate_name("Ingredient", name)?;
        let ingredient = self
            .db
            .get_or_create_ingredient(&name)?
            .context("Ingredient name must not be empty")?;
        let unit = match unit {
            Some(label) => self.db.get_or_create_unit(label)?,
            None => None,
        };
        Ok(LineKey::canonical(ingredient.id, unit.map(|u| u.id)))
    }

    // --- Recipes ---

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let title = validate_name("Recipe", &recipe.title)?;
        self.db.create_recipe(&NewRecipe {
            title,
            description: recipe.description.clone(),
            instructions: recipe.instructions.clone(),
        })
    }

    pub fn add_recipe_ingredient(
        &self,
        recipe_id: i64,
        name: &str,
        quantity: &str,
        unit: Option<&str>,
        optional: bool,
    ) -> Result<RecipeIngredient> {
        let key = self.resolve_line_key(name, unit)?;
        self.db.add_recipe_ingredient(
            recipe_id,
            &NewRecipeIngredient {
                key,
                quantity: quantity.trim().to_string(),
                optional,
            },
        )
    }

    pub fn remove_recipe_ingredient(&self, recipe_id: i64, ingredient_row_id: i64) -> Result<bool> {
        self.db.remove_recipe_ingredient(recipe_id, ingredient_row_id)
    }

    pub fn get_recipe_detail(&self, recipe_id: i64) -> Result<RecipeDetail> {
        self.db.get_recipe_detail(recipe_id)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.db.list_recipes()
    }

    pub fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        self.db.delete_recipe(recipe_id)
    }

    // --- Meal plans ---

    pub fn create_meal_plan(&self, name: &str) -> Result<MealPlan> {
        let name = validate_name("Meal plan", name)?;
        self.db.create_meal_plan(&name)
    }

    pub fn list_meal_plans(&self) -> Result<Vec<MealPlan>> {
        self.db.list_meal_plans()
    }

    pub fn get_meal_plan_detail(&self, plan_id: i64) -> Result<MealPlanDetail> {
        self.db.get_meal_plan_detail(plan_id)
    }

    pub fn add_recipe_to_meal_plan(&self, plan_id: i64, recipe_id: i64) -> Result<u32> {
        self.db.add_recipe_to_meal_plan(plan_id, recipe_id)
    }

    pub fn set_meal_plan_recipe_count(
        &self,
        plan_id: i64,
        recipe_id: i64,
        count: i64,
    ) -> Result<u32> {
        self.db.set_meal_plan_recipe_count(plan_id, recipe_id, count)
    }

    pub fn remove_recipe_from_meal_plan(&self, plan_id: i64, recipe_id: i64) -> Result<bool> {
        self.db.remove_recipe_from_meal_plan(plan_id, recipe_id)
    }

    pub fn delete_meal_plan(&self, plan_id: i64) -> Result<bool> {
        self.db.delete_meal_plan(plan_id)
    }

    // --- Shopping lists ---

    pub fn create_shopping_list(&self, name: &str) -> Result<ShoppingList> {
        let name = validate_name("Shopping list", name)?;
        self.db.create_shopping_list(&name)
    }

    pub fn list_shopping_lists(&self) -> Result<Vec<ShoppingList>> {
        self.db.list_shopping_lists()
    }

    pub fn get_shopping_list_detail(&self, list_id: i64) -> Result<ShoppingListDetail> {
        self.db.get_shopping_list_detail(list_id)
    }

    pub fn delete_shopping_list(&self, list_id: i64) -> Result<bool> {
        self.db.delete_shopping_list(list_id)
    }

    /// Append a hand-entered line. Manual additions are never merged.
    pub fn add_shopping_list_item(
        &self,
        list_id: i64,
        name: &str,
        quantity: &str,
        unit: Option<&str>,
    ) -> Result<ShoppingListItem> {
        self.db.get_shopping_list(list_id)?;
        let key = self.resolve_line_key(name, unit)?;
        self.db.insert_shopping_list_item(
            list_id,
            &LineItem {
                id: None,
                key,
                quantity: quantity.trim().to_string(),
                checked: false,
            },
        )
    }

    pub fn toggle_shopping_list_item(&self, list_id: i64, item_id: i64) -> Result<bool> {
        self.db.toggle_shopping_list_item(list_id, item_id)
    }

    pub fn remove_shopping_list_item(&self, list_id: i64, item_id: i64) -> Result<bool> {
        self.db.remove_shopping_list_item(list_id, item_id)
    }

    // --- Shopping list generation ---

    fn recipe_candidates(&self, recipe_id: i64, count: u32) -> Result<Vec<Candidate>> {
        let ingredients = self.db.get_recipe_ingredients(recipe_id)?;
        Ok(ingredients
            .iter()
            .map(|ri| Candidate::new(ri.line_key(), ri.quantity.clone()).scaled(count))
            .collect())
    }

    /// Build a new list from one recipe's ingredients.
    pub fn shopping_list_from_recipe(
        &self,
        recipe_id: i64,
        name: Option<&str>,
    ) -> Result<ShoppingListDetail> {
        let recipe = self.db.get_recipe(recipe_id)?;
        let name = match name {
            Some(n) => validate_name("Shopping list", n)?,
            None => recipe.title.clone(),
        };

        let mut working = WorkingList::new();
        working.merge_all(self.recipe_candidates(recipe.id, 1)?);

        let list = self.db.create_shopping_list_with_items(&name, &working)?;
        info!(
            list_id = list.id,
            recipe_id,
            lines = working.len(),
            "created shopping list from recipe"
        );
        self.db.get_shopping_list_detail(list.id)
    }

    /// Build a new list from every recipe in a meal plan, each scaled by its
    /// repeat count. The list is named after the plan.
    pub fn shopping_list_from_meal_plan(&self, plan_id: i64) -> Result<ShoppingListDetail> {
        let detail = self.db.get_meal_plan_detail(plan_id)?;

        let mut working = WorkingList::new();
        for link in &detail.recipes {
            working.merge_all(self.recipe_candidates(link.recipe_id, link.count)?);
        }

        let list = self
            .db
            .create_shopping_list_with_items(&detail.plan.name, &working)?;
        info!(
            list_id = list.id,
            plan_id,
            recipes = detail.recipes.len(),
            lines = working.len(),
            "created shopping list from meal plan"
        );
        self.db.get_shopping_list_detail(list.id)
    }

    /// Merge a recipe's ingredients into an existing list.
    pub fn add_recipe_to_shopping_list(
        &self,
        list_id: i64,
        recipe_id: i64,
    ) -> Result<ShoppingListDetail> {
        let existing = self.db.get_shopping_list_items(list_id)?;
        self.db.get_recipe(recipe_id)?;

        let mut working = WorkingList::from_items(existing.iter().map(LineItem::from).collect());
        working.merge_all(self.recipe_candidates(recipe_id, 1)?);

        self.db.save_working_list(list_id, &working)?;
        self.db.get_shopping_list_detail(list_id)
    }

    // --- Legacy data ---

    pub fn promote_legacy_entries(&self) -> Result<LegacyMigrationSummary> {
        legacy::promote_legacy_entries(&self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(svc: &LarderService, title: &str) -> Recipe {
        svc.create_recipe(&NewRecipe {
            title: title.to_string(),
            description: None,
            instructions: None,
        })
        .unwrap()
    }

    fn quantities(detail: &ShoppingListDetail) -> Vec<(String, String, String)> {
        detail
            .items
            .iter()
            .map(|i| {
                (
                    i.display_name().to_string(),
                    i.quantity.clone(),
                    i.display_unit().to_string(),
                )
            })
            .collect()
    }

    fn row(name: &str, qty: &str, unit: &str) -> (String, String, String) {
        (name.to_string(), qty.to_string(), unit.to_string())
    }

    #[test]
    fn test_shopping_list_from_recipe() {
        let svc = LarderService::new_in_memory().unwrap();
        let r = recipe(&svc, "Pancakes");
        svc.add_recipe_ingredient(r.id, "Flour", "200", Some("g"), false)
            .unwrap();
        svc.add_recipe_ingredient(r.id, "flour", "50", Some("g"), false)
            .unwrap();
        svc.add_recipe_ingredient(r.id, "Flour", "2", Some("cup"), false)
            .unwrap();
        svc.add_recipe_ingredient(r.id, "Salt", "a pinch", None, true)
            .unwrap();

        let detail = svc.shopping_list_from_recipe(r.id, None).unwrap();
        assert_eq!(detail.list.name, "Pancakes");
        assert_eq!(
            quantities(&detail),
            vec![
                row("Flour", "250", "g"),
                row("Flour", "2", "cup"),
                row("Salt", "a pinch", ""),
            ]
        );
    }

    #[test]
    fn test_shopping_list_from_recipe_custom_name() {
        let svc = LarderService::new_in_memory().unwrap();
        let r = recipe(&svc, "Pancakes");
        let detail = svc
            .shopping_list_from_recipe(r.id, Some("Saturday"))
            .unwrap();
        assert_eq!(detail.list.name, "Saturday");
        assert!(detail.items.is_empty());
    }

    #[test]
    fn test_shopping_list_from_meal_plan_scales_counts() {
        let svc = LarderService::new_in_memory().unwrap();
        let pancakes = recipe(&svc, "Pancakes");
        svc.add_recipe_ingredient(pancakes.id, "Egg", "2", None, false)
            .unwrap();
        svc.add_recipe_ingredient(pancakes.id, "Butter", "to taste", None, false)
            .unwrap();
        let omelette = recipe(&svc, "Omelette");
        svc.add_recipe_ingredient(omelette.id, "egg", "3", None, false)
            .unwrap();
        svc.add_recipe_ingredient(omelette.id, "Butter", "1", Some("tbsp"), false)
            .unwrap();

        let plan = svc.create_meal_plan("Week 12").unwrap();
        svc.add_recipe_to_meal_plan(plan.id, pancakes.id).unwrap();
        svc.add_recipe_to_meal_plan(plan.id, omelette.id).unwrap();
        svc.set_meal_plan_recipe_count(plan.id, pancakes.id, 3)
            .unwrap();

        let detail = svc.shopping_list_from_meal_plan(plan.id).unwrap();
        assert_eq!(detail.list.name, "Week 12");
        assert_eq!(
            quantities(&detail),
            vec![
                row("Egg", "9", ""),
                row("Butter", "to taste × 3", ""),
                row("Butter", "1", "tbsp"),
            ]
        );
    }

    #[test]
    fn test_shopping_list_from_empty_meal_plan() {
        let svc = LarderService::new_in_memory().unwrap();
        let plan = svc.create_meal_plan("Empty").unwrap();
        let detail = svc.shopping_list_from_meal_plan(plan.id).unwrap();
        assert!(detail.items.is_empty());
    }

    #[test]
    fn test_add_recipe_to_existing_list_accumulates() {
        let svc = LarderService::new_in_memory().unwrap();
        let r = recipe(&svc, "Bread");
        svc.add_recipe_ingredient(r.id, "Flour", "500", Some("g"), false)
            .unwrap();
        svc.add_recipe_ingredient(r.id, "Yeast", "1", Some("packet"), false)
            .unwrap();

        let list = svc.create_shopping_list("Groceries").unwrap();
        let manual = svc
            .add_shopping_list_item(list.id, "flour", "100", Some("g"))
            .unwrap();
        svc.toggle_shopping_list_item(list.id, manual.id).unwrap();

        let detail = svc.add_recipe_to_shopping_list(list.id, r.id).unwrap();
        assert_eq!(
            quantities(&detail),
            vec![row("Flour", "600", "g"), row("Yeast", "1", "packet")]
        );
        assert!(detail.items[0].checked);
        assert_eq!(detail.checked_count(), 1);

        let detail = svc.add_recipe_to_shopping_list(list.id, r.id).unwrap();
        assert_eq!(
            quantities(&detail),
            vec![row("Flour", "1100", "g"), row("Yeast", "2", "packet")]
        );
    }

    #[test]
    fn test_add_recipe_to_missing_list() {
        let svc = LarderService::new_in_memory().unwrap();
        let r = recipe(&svc, "Bread");
        assert!(svc.add_recipe_to_shopping_list(42, r.id).is_err());
    }

    #[test]
    fn test_manual_items_are_not_merged() {
        let svc = LarderService::new_in_memory().unwrap();
        let list = svc.create_shopping_list("Groceries").unwrap();
        svc.add_shopping_list_item(list.id, "Milk", "1", Some("L"))
            .unwrap();
        svc.add_shopping_list_item(list.id, "milk", "1", Some("l"))
            .unwrap();
        let detail = svc.get_shopping_list_detail(list.id).unwrap();
        assert_eq!(detail.items.len(), 2);
    }

    #[test]
    fn test_blank_names_rejected() {
        let svc = LarderService::new_in_memory().unwrap();
        let list = svc.create_shopping_list("Groceries").unwrap();
        assert!(svc.add_shopping_list_item(list.id, "  ", "1", None).is_err());
        assert!(svc.create_meal_plan("").is_err());
        assert!(svc.create_shopping_list(" ").is_err());
    }

    #[test]
    fn test_legacy_ingredients_merge_in_generated_lists() {
        let svc = LarderService::new_in_memory().unwrap();
        let r = recipe(&svc, "Old favourite");
        for (name, unit, qty) in [("Flour", "g", "100"), ("flour", " G ", "20")] {
            svc.database()
                .add_recipe_ingredient(
                    r.id,
                    &NewRecipeIngredient {
                        key: LineKey::legacy(name, unit),
                        quantity: qty.to_string(),
                        optional: false,
                    },
                )
                .unwrap();
        }

        let detail = svc.shopping_list_from_recipe(r.id, None).unwrap();
        assert_eq!(quantities(&detail), vec![row("Flour", "120", "g")]);
    }

    #[test]
    fn test_add_unit_uses_existing() {
        let svc = LarderService::new_in_memory().unwrap();
        let a = svc.add_unit("Sprig", None).unwrap();
        let b = svc.add_unit("sprig", Some("spr")).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.symbol, "Sprig");

        let c = svc.add_unit("Handful", Some("hf")).unwrap();
        assert_eq!(c.symbol, "hf");
    }
}
