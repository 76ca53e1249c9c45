use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use crate::merge::{LineItem, WorkingList};
use crate::models::{
    Ingredient, IngredientKey, LineKey, MealPlan, MealPlanDetail, MealPlanRecipe, NewRecipe,
    NewRecipeIngredient, Recipe, RecipeDetail, RecipeIngredient, ShoppingList,
    ShoppingListDetail, ShoppingListItem, Unit, UnitKey, MAX_REPEAT_COUNT, clamp_repeat_count,
};

pub struct Database {
    conn: Connection,
}

/// A row still referencing its ingredient by free text.
#[derive(Debug, Clone)]
pub struct LegacyRow {
    pub id: i64,
    pub name: String,
    pub unit: String,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS units (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    symbol TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    description TEXT,
                    instructions TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    ingredient_id INTEGER REFERENCES ingredients(id),
                    legacy_name TEXT,
                    unit_id INTEGER REFERENCES units(id),
                    legacy_unit TEXT,
                    quantity TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS meal_plans (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plan_recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_plan_id INTEGER NOT NULL REFERENCES meal_plans(id) ON DELETE CASCADE,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    count INTEGER NOT NULL DEFAULT 1 CHECK (count >= 1),
                    UNIQUE (meal_plan_id, recipe_id)
                );

                CREATE TABLE IF NOT EXISTS shopping_lists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS shopping_list_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    shopping_list_id INTEGER NOT NULL REFERENCES shopping_lists(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    ingredient_id INTEGER REFERENCES ingredients(id),
                    legacy_name TEXT,
                    unit_id INTEGER REFERENCES units(id),
                    legacy_unit TEXT,
                    quantity TEXT NOT NULL DEFAULT '',
                    checked INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_meal_plan_recipes_plan ON meal_plan_recipes(meal_plan_id);
                CREATE INDEX IF NOT EXISTS idx_shopping_list_items_list ON shopping_list_items(shopping_list_id);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "ALTER TABLE recipe_ingredients ADD COLUMN optional INTEGER NOT NULL DEFAULT 0;
                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    /// Run `f` inside one transaction. Any error rolls everything back.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // --- Row mapping helpers ---

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ingredient> {
        Ok(Ingredient {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn unit_from_row(row: &rusqlite::Row) -> rusqlite::Result<Unit> {
        Ok(Unit {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            symbol: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get(0)?,
            uuid: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            instructions: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn meal_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealPlan> {
        Ok(MealPlan {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn shopping_list_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingList> {
        Ok(ShoppingList {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    /// Rebuild a key from its four storage columns, starting at `first`:
    /// `ingredient_id, legacy_name, unit_id, legacy_unit`.
    fn line_key_from_row(row: &rusqlite::Row, first: usize) -> rusqlite::Result<LineKey> {
        let ingredient_id: Option<i64> = row.get(first)?;
        let legacy_name: Option<String> = row.get(first + 1)?;
        let unit_id: Option<i64> = row.get(first + 2)?;
        let legacy_unit: Option<String> = row.get(first + 3)?;
        let ingredient = match ingredient_id {
            Some(id) => IngredientKey::Canonical { id },
            None => IngredientKey::Legacy {
                name: legacy_name.unwrap_or_default(),
            },
        };
        let unit = match legacy_unit {
            Some(label) => UnitKey::Legacy { label },
            None => UnitKey::Canonical { id: unit_id },
        };
        Ok(LineKey { ingredient, unit })
    }

    /// Split a key into `(ingredient_id, legacy_name, unit_id, legacy_unit)`.
    fn line_key_columns(key: &LineKey) -> (Option<i64>, Option<&str>, Option<i64>, Option<&str>) {
        (
            key.ingredient.canonical_id(),
            key.ingredient.legacy_name(),
            key.unit.canonical_id(),
            key.unit.legacy_label(),
        )
    }

    // Expects columns:
    // 0: ri.id, 1: ri.uuid, 2: ri.recipe_id, 3: ri.position,
    // 4: ri.ingredient_id, 5: ri.legacy_name, 6: ri.unit_id, 7: ri.legacy_unit,
    // 8: ri.quantity, 9: ri.optional, 10: i.name, 11: u.symbol
    fn recipe_ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeIngredient> {
        let key = Self::line_key_from_row(row, 4)?;
        Ok(RecipeIngredient {
            id: row.get(0)?,
            uuid: row.get(1)?,
            recipe_id: row.get(2)?,
            position: row.get(3)?,
            ingredient: key.ingredient,
            unit: key.unit,
            quantity: row.get(8)?,
            optional: row.get(9)?,
            ingredient_name: row.get(10)?,
            unit_label: row.get(11)?,
        })
    }

    // Same layout as recipe ingredients with `checked` in place of `optional`.
    fn shopping_list_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingListItem> {
        let key = Self::line_key_from_row(row, 4)?;
        Ok(ShoppingListItem {
            id: row.get(0)?,
            uuid: row.get(1)?,
            shopping_list_id: row.get(2)?,
            position: row.get(3)?,
            ingredient: key.ingredient,
            unit: key.unit,
            quantity: row.get(8)?,
            checked: row.get(9)?,
            ingredient_name: row.get(10)?,
            unit_label: row.get(11)?,
        })
    }

    // --- Ingredients ---

    pub fn insert_ingredient(&self, name: &str) -> Result<Ingredient> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO ingredients (uuid, name, created_at) VALUES (?1, ?2, ?3)",
            params![uuid, name, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_ingredient(id)
    }

    pub fn get_ingredient(&self, id: i64) -> Result<Ingredient> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, created_at FROM ingredients WHERE id = ?1",
                params![id],
                Self::ingredient_from_row,
            )
            .context("Ingredient not found")
    }

    pub fn find_ingredient_by_name(&self, name: &str) -> Result<Option<Ingredient>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, uuid, name, created_at FROM ingredients WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                Self::ingredient_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub(crate) fn search_ingredients_local(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Ingredient>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, created_at FROM ingredients
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY name COLLATE NOCASE LIMIT ?2",
        )?;
        let ingredients = stmt
            .query_map(params![pattern, limit], Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    // --- Units ---

    pub fn insert_unit(&self, name: &str, symbol: &str) -> Result<Unit> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO units (uuid, name, symbol, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![uuid, name.trim(), symbol.trim(), now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_unit(id)
    }

    pub fn get_unit(&self, id: i64) -> Result<Unit> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, symbol, created_at FROM units WHERE id = ?1",
                params![id],
                Self::unit_from_row,
            )
            .context("Unit not found")
    }

    pub fn find_unit_by_name(&self, name: &str) -> Result<Option<Unit>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, uuid, name, symbol, created_at FROM units WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                Self::unit_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Match a label against unit names first, then symbols.
    pub fn find_unit(&self, label: &str) -> Result<Option<Unit>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, uuid, name, symbol, created_at FROM units
                 WHERE LOWER(name) = LOWER(?1) OR LOWER(symbol) = LOWER(?1)
                 ORDER BY LOWER(name) = LOWER(?1) DESC, id
                 LIMIT 1",
                params![label.trim()],
                Self::unit_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub(crate) fn list_units_by_name(&self) -> Result<Vec<Unit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, symbol, created_at FROM units ORDER BY name COLLATE NOCASE",
        )?;
        let units = stmt
            .query_map([], Self::unit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    // --- Recipes ---

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO recipes (uuid, title, description, instructions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid,
                recipe.title,
                recipe.description,
                recipe.instructions,
                now,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_recipe(id)
    }

    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        self.conn
            .query_row(
                "SELECT id, uuid, title, description, instructions, created_at, updated_at
                 FROM recipes WHERE id = ?1",
                params![id],
                Self::recipe_from_row,
            )
            .context("Recipe not found")
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, title, description, instructions, created_at, updated_at
             FROM recipes ORDER BY title COLLATE NOCASE, id",
        )?;
        let recipes = stmt
            .query_map([], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn delete_recipe(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn touch_recipe(&self, id: i64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE recipes SET updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    pub fn add_recipe_ingredient(
        &self,
        recipe_id: i64,
        ingredient: &NewRecipeIngredient,
    ) -> Result<RecipeIngredient> {
        // Surface a readable error instead of a foreign key failure
        self.get_recipe(recipe_id)?;

        let uuid = Uuid::new_v4().to_string();
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM recipe_ingredients WHERE recipe_id = ?1",
            params![recipe_id],
            |row| row.get(0),
        )?;
        let (ingredient_id, legacy_name, unit_id, legacy_unit) =
            Self::line_key_columns(&ingredient.key);
        self.conn.execute(
            "INSERT INTO recipe_ingredients
                (uuid, recipe_id, position, ingredient_id, legacy_name, unit_id, legacy_unit, quantity, optional)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                uuid,
                recipe_id,
                position,
                ingredient_id,
                legacy_name,
                unit_id,
                legacy_unit,
                ingredient.quantity,
                ingredient.optional,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.touch_recipe(recipe_id)?;
        self.get_recipe_ingredient(id)
    }

    const RECIPE_INGREDIENT_SELECT: &'static str = "SELECT ri.id, ri.uuid, ri.recipe_id, ri.position,
                ri.ingredient_id, ri.legacy_name, ri.unit_id, ri.legacy_unit,
                ri.quantity, ri.optional, i.name, u.symbol
         FROM recipe_ingredients ri
         LEFT JOIN ingredients i ON i.id = ri.ingredient_id
         LEFT JOIN units u ON u.id = ri.unit_id";

    pub fn get_recipe_ingredient(&self, id: i64) -> Result<RecipeIngredient> {
        self.conn
            .query_row(
                &format!("{} WHERE ri.id = ?1", Self::RECIPE_INGREDIENT_SELECT),
                params![id],
                Self::recipe_ingredient_from_row,
            )
            .context("Recipe ingredient not found")
    }

    pub fn get_recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE ri.recipe_id = ?1 ORDER BY ri.position, ri.id",
            Self::RECIPE_INGREDIENT_SELECT
        ))?;
        let ingredients = stmt
            .query_map(params![recipe_id], Self::recipe_ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    pub fn remove_recipe_ingredient(&self, recipe_id: i64, ingredient_row_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1 AND id = ?2",
            params![recipe_id, ingredient_row_id],
        )?;
        if rows > 0 {
            self.touch_recipe(recipe_id)?;
        }
        Ok(rows > 0)
    }

    pub fn get_recipe_detail(&self, recipe_id: i64) -> Result<RecipeDetail> {
        let recipe = self.get_recipe(recipe_id)?;
        let ingredients = self.get_recipe_ingredients(recipe_id)?;
        Ok(RecipeDetail {
            recipe,
            ingredients,
        })
    }

    // --- Meal plans ---

    pub fn create_meal_plan(&self, name: &str) -> Result<MealPlan> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO meal_plans (uuid, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![uuid, name, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_meal_plan(id)
    }

    pub fn get_meal_plan(&self, id: i64) -> Result<MealPlan> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, created_at, updated_at FROM meal_plans WHERE id = ?1",
                params![id],
                Self::meal_plan_from_row,
            )
            .context("Meal plan not found")
    }

    pub fn list_meal_plans(&self) -> Result<Vec<MealPlan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, created_at, updated_at FROM meal_plans
             ORDER BY created_at DESC, id DESC",
        )?;
        let plans = stmt
            .query_map([], Self::meal_plan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    pub fn delete_meal_plan(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meal_plans WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn touch_meal_plan(&self, id: i64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE meal_plans SET updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    /// Add a recipe to a plan, or bump its count if it is already there.
    /// The count stops at [`MAX_REPEAT_COUNT`]. Returns the resulting count.
    pub fn add_recipe_to_meal_plan(&self, plan_id: i64, recipe_id: i64) -> Result<u32> {
        self.get_meal_plan(plan_id)?;
        self.get_recipe(recipe_id)?;
        self.conn.execute(
            "INSERT INTO meal_plan_recipes (meal_plan_id, recipe_id, count) VALUES (?1, ?2, 1)
             ON CONFLICT (meal_plan_id, recipe_id) DO UPDATE SET count = MIN(count + 1, ?3)",
            params![plan_id, recipe_id, MAX_REPEAT_COUNT],
        )?;
        self.touch_meal_plan(plan_id)?;
        self.get_meal_plan_recipe_count(plan_id, recipe_id)?
            .context("Recipe is not in this meal plan")
    }

    /// Store a new repeat count for a recipe in a plan; counts below one become one.
    pub fn set_meal_plan_recipe_count(
        &self,
        plan_id: i64,
        recipe_id: i64,
        count: i64,
    ) -> Result<u32> {
        let count = clamp_repeat_count(count);
        let rows = self.conn.execute(
            "UPDATE meal_plan_recipes SET count = ?1 WHERE meal_plan_id = ?2 AND recipe_id = ?3",
            params![count, plan_id, recipe_id],
        )?;
        if rows == 0 {
            bail!("Recipe {recipe_id} is not in meal plan {plan_id}");
        }
        self.touch_meal_plan(plan_id)?;
        Ok(count)
    }

    pub fn get_meal_plan_recipe_count(&self, plan_id: i64, recipe_id: i64) -> Result<Option<u32>> {
        let count = self
            .conn
            .query_row(
                "SELECT count FROM meal_plan_recipes WHERE meal_plan_id = ?1 AND recipe_id = ?2",
                params![plan_id, recipe_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count)
    }

    pub fn remove_recipe_from_meal_plan(&self, plan_id: i64, recipe_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM meal_plan_recipes WHERE meal_plan_id = ?1 AND recipe_id = ?2",
            params![plan_id, recipe_id],
        )?;
        if rows > 0 {
            self.touch_meal_plan(plan_id)?;
        }
        Ok(rows > 0)
    }

    /// Recipes in a plan, in the order they were first added.
    pub fn get_meal_plan_recipes(&self, plan_id: i64) -> Result<Vec<MealPlanRecipe>> {
        let mut stmt = self.conn.prepare(
            "SELECT mpr.meal_plan_id, mpr.recipe_id, mpr.count, r.title
             FROM meal_plan_recipes mpr
             JOIN recipes r ON r.id = mpr.recipe_id
             WHERE mpr.meal_plan_id = ?1
             ORDER BY mpr.id",
        )?;
        let links = stmt
            .query_map(params![plan_id], |row| {
                Ok(MealPlanRecipe {
                    meal_plan_id: row.get(0)?,
                    recipe_id: row.get(1)?,
                    count: row.get(2)?,
                    recipe_title: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    pub fn get_meal_plan_detail(&self, plan_id: i64) -> Result<MealPlanDetail> {
        let plan = self.get_meal_plan(plan_id)?;
        let recipes = self.get_meal_plan_recipes(plan_id)?;
        Ok(MealPlanDetail { plan, recipes })
    }

    // --- Shopping lists ---

    pub fn create_shopping_list(&self, name: &str) -> Result<ShoppingList> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO shopping_lists (uuid, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![uuid, name, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_shopping_list(id)
    }

    pub fn get_shopping_list(&self, id: i64) -> Result<ShoppingList> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, created_at, updated_at FROM shopping_lists WHERE id = ?1",
                params![id],
                Self::shopping_list_from_row,
            )
            .context("Shopping list not found")
    }

    pub fn list_shopping_lists(&self) -> Result<Vec<ShoppingList>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, created_at, updated_at FROM shopping_lists
             ORDER BY created_at DESC, id DESC",
        )?;
        let lists = stmt
            .query_map([], Self::shopping_list_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lists)
    }

    pub fn delete_shopping_list(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM shopping_lists WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn touch_shopping_list(&self, id: i64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE shopping_lists SET updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    const SHOPPING_ITEM_SELECT: &'static str = "SELECT si.id, si.uuid, si.shopping_list_id, si.position,
                si.ingredient_id, si.legacy_name, si.unit_id, si.legacy_unit,
                si.quantity, si.checked, i.name, u.symbol
         FROM shopping_list_items si
         LEFT JOIN ingredients i ON i.id = si.ingredient_id
         LEFT JOIN units u ON u.id = si.unit_id";

    pub fn get_shopping_list_item(&self, list_id: i64, item_id: i64) -> Result<ShoppingListItem> {
        self.conn
            .query_row(
                &format!(
                    "{} WHERE si.shopping_list_id = ?1 AND si.id = ?2",
                    Self::SHOPPING_ITEM_SELECT
                ),
                params![list_id, item_id],
                Self::shopping_list_item_from_row,
            )
            .context("Shopping list item not found")
    }

    pub fn get_shopping_list_items(&self, list_id: i64) -> Result<Vec<ShoppingListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE si.shopping_list_id = ?1 ORDER BY si.position, si.id",
            Self::SHOPPING_ITEM_SELECT
        ))?;
        let items = stmt
            .query_map(params![list_id], Self::shopping_list_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn get_shopping_list_detail(&self, list_id: i64) -> Result<ShoppingListDetail> {
        let list = self.get_shopping_list(list_id)?;
        let items = self.get_shopping_list_items(list_id)?;
        Ok(ShoppingListDetail { list, items })
    }

    /// Append one line to the end of a list, without merging.
    pub fn insert_shopping_list_item(
        &self,
        list_id: i64,
        item: &LineItem,
    ) -> Result<ShoppingListItem> {
        let uuid = Uuid::new_v4().to_string();
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM shopping_list_items WHERE shopping_list_id = ?1",
            params![list_id],
            |row| row.get(0),
        )?;
        let (ingredient_id, legacy_name, unit_id, legacy_unit) = Self::line_key_columns(&item.key);
        self.conn.execute(
            "INSERT INTO shopping_list_items
                (uuid, shopping_list_id, position, ingredient_id, legacy_name, unit_id, legacy_unit, quantity, checked)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                uuid,
                list_id,
                position,
                ingredient_id,
                legacy_name,
                unit_id,
                legacy_unit,
                item.quantity,
                item.checked,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.touch_shopping_list(list_id)?;
        self.get_shopping_list_item(list_id, id)
    }

    /// Flip the checked flag. Returns the new state.
    pub fn toggle_shopping_list_item(&self, list_id: i64, item_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE shopping_list_items SET checked = NOT checked
             WHERE shopping_list_id = ?1 AND id = ?2",
            params![list_id, item_id],
        )?;
        if rows == 0 {
            bail!("Shopping list item {item_id} not found in list {list_id}");
        }
        self.touch_shopping_list(list_id)?;
        Ok(self.get_shopping_list_item(list_id, item_id)?.checked)
    }

    pub fn remove_shopping_list_item(&self, list_id: i64, item_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM shopping_list_items WHERE shopping_list_id = ?1 AND id = ?2",
            params![list_id, item_id],
        )?;
        if rows > 0 {
            self.touch_shopping_list(list_id)?;
        }
        Ok(rows > 0)
    }

    fn write_working_list(&self, list_id: i64, working: &WorkingList) -> Result<()> {
        let mut updated = 0;
        for item in working.touched() {
            let Some(id) = item.id else { continue };
            self.conn.execute(
                "UPDATE shopping_list_items SET quantity = ?1 WHERE shopping_list_id = ?2 AND id = ?3",
                params![item.quantity, list_id, id],
            )?;
            updated += 1;
        }
        let mut inserted = 0;
        for item in working.new_items() {
            self.insert_shopping_list_item(list_id, item)?;
            inserted += 1;
        }
        self.touch_shopping_list(list_id)?;
        info!(list_id, updated, inserted, "saved shopping list merge");
        Ok(())
    }

    /// Persist the outcome of a merge pass against an existing list.
    pub fn save_working_list(&self, list_id: i64, working: &WorkingList) -> Result<()> {
        self.get_shopping_list(list_id)?;
        self.transaction(|db| db.write_working_list(list_id, working))
    }

    /// Create a list and its merged lines together, or nothing at all.
    pub fn create_shopping_list_with_items(
        &self,
        name: &str,
        working: &WorkingList,
    ) -> Result<ShoppingList> {
        self.transaction(|db| {
            let list = db.create_shopping_list(name)?;
            db.write_working_list(list.id, working)?;
            db.get_shopping_list(list.id)
        })
    }

    // --- Legacy rows ---

    pub fn legacy_recipe_ingredients(&self) -> Result<Vec<LegacyRow>> {
        self.legacy_rows("recipe_ingredients")
    }

    pub fn legacy_shopping_list_items(&self) -> Result<Vec<LegacyRow>> {
        self.legacy_rows("shopping_list_items")
    }

    fn legacy_rows(&self, table: &str) -> Result<Vec<LegacyRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, COALESCE(legacy_name, ''), COALESCE(legacy_unit, '')
             FROM {table} WHERE ingredient_id IS NULL ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LegacyRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn promote_recipe_ingredient(
        &self,
        row_id: i64,
        ingredient_id: i64,
        unit_id: Option<i64>,
    ) -> Result<()> {
        self.promote_row("recipe_ingredients", row_id, ingredient_id, unit_id)
    }

    pub fn promote_shopping_list_item(
        &self,
        row_id: i64,
        ingredient_id: i64,
        unit_id: Option<i64>,
    ) -> Result<()> {
        self.promote_row("shopping_list_items", row_id, ingredient_id, unit_id)
    }

    fn promote_row(
        &self,
        table: &str,
        row_id: i64,
        ingredient_id: i64,
        unit_id: Option<i64>,
    ) -> Result<()> {
        self.conn.execute(
            &format!(
                "UPDATE {table}
                 SET ingredient_id = ?1, unit_id = ?2, legacy_name = NULL, legacy_unit = NULL
                 WHERE id = ?3"
            ),
            params![ingredient_id, unit_id, row_id],
        )?;
        Ok(())
    }
}
