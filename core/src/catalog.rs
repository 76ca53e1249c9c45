use anyhow::Result;
use tracing::info;

use crate::db::Database;
use crate::models::{Ingredient, Unit};

/// Upper bound on ingredient search results.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Unit assigned to promoted legacy rows that had no unit label.
pub const DEFAULT_UNIT: (&str, &str) = ("unit", "ea");

/// Units every fresh database starts with, as `(name, symbol)`.
pub const DEFAULT_UNITS: &[(&str, &str)] = &[
    DEFAULT_UNIT,
    ("tablespoon", "tbsp"),
    ("teaspoon", "tsp"),
    ("cup", "cup"),
    ("gram", "g"),
    ("kilogram", "kg"),
    ("milliliter", "ml"),
    ("liter", "L"),
    ("pound", "lb"),
    ("ounce", "oz"),
    ("pinch", "pinch"),
    ("leaf", "leaf"),
    ("clove", "clove"),
    ("slice", "slice"),
    ("stalk", "stalk"),
    ("bunch", "bunch"),
    ("packet", "packet"),
];

/// Shared ingredient and unit catalog.
///
/// Shopping list and recipe code resolves free text through this interface
/// before handing identities to the merge engine, which never looks anything up
/// on its own.
pub trait Catalog {
    /// Find an ingredient by case-insensitive name, creating it when missing.
    /// Blank names resolve to `None`.
    fn get_or_create_ingredient(&self, name: &str) -> Result<Option<Ingredient>>;

    /// Find a unit whose name or symbol matches case-insensitively, creating it
    /// when missing. Blank labels resolve to `None`.
    fn get_or_create_unit(&self, label: &str) -> Result<Option<Unit>>;

    fn search_ingredients(&self, query: &str, limit: usize) -> Result<Vec<Ingredient>>;

    fn list_units(&self) -> Result<Vec<Unit>>;
}

impl Catalog for Database {
    fn get_or_create_ingredient(&self, name: &str) -> Result<Option<Ingredient>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(existing) = self.find_ingredient_by_name(name)? {
            return Ok(Some(existing));
        }
        self.insert_ingredient(name).map(Some)
    }

    fn get_or_create_unit(&self, label: &str) -> Result<Option<Unit>> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(None);
        }
        if let Some(existing) = self.find_unit(label)? {
            return Ok(Some(existing));
        }
        self.insert_unit(label, &default_symbol(label)).map(Some)
    }

    fn search_ingredients(&self, query: &str, limit: usize) -> Result<Vec<Ingredient>> {
        self.search_ingredients_local(query.trim(), limit.clamp(1, MAX_SEARCH_LIMIT))
    }

    fn list_units(&self) -> Result<Vec<Unit>> {
        self.list_units_by_name()
    }
}

/// Symbols default to the first ten characters of the name.
#[must_use]
pub fn default_symbol(name: &str) -> String {
    name.trim().chars().take(10).collect()
}

/// The catalog's generic `unit` entry, created on first use.
pub fn default_unit(db: &Database) -> Result<Unit> {
    let (name, symbol) = DEFAULT_UNIT;
    match db.find_unit_by_name(name)? {
        Some(unit) => Ok(unit),
        None => db.insert_unit(name, symbol),
    }
}

/// Insert any of [`DEFAULT_UNITS`] that are not in the catalog yet.
/// Returns how many were added.
pub fn seed_default_units(db: &Database) -> Result<usize> {
    let mut added = 0;
    for (name, symbol) in DEFAULT_UNITS {
        if db.find_unit_by_name(name)?.is_none() {
            db.insert_unit(name, symbol)?;
            added += 1;
        }
    }
    info!(added, "seeded default units");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_ingredient_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        let a = db.get_or_create_ingredient("Flour").unwrap().unwrap();
        let b = db.get_or_create_ingredient("  flour ").unwrap().unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.name, "Flour");
    }

    #[test]
    fn test_get_or_create_ingredient_blank() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_or_create_ingredient("   ").unwrap().is_none());
    }

    #[test]
    fn test_get_or_create_unit_matches_symbol() {
        let db = Database::open_in_memory().unwrap();
        seed_default_units(&db).unwrap();
        let by_symbol = db.get_or_create_unit("TBSP").unwrap().unwrap();
        let by_name = db.get_or_create_unit("tablespoon").unwrap().unwrap();
        assert_eq!(by_symbol.id, by_name.id);
        assert_eq!(by_symbol.symbol, "tbsp");
    }

    #[test]
    fn test_get_or_create_unit_creates_with_default_symbol() {
        let db = Database::open_in_memory().unwrap();
        let unit = db
            .get_or_create_unit("handfuls of something")
            .unwrap()
            .unwrap();
        assert_eq!(unit.name, "handfuls of something");
        assert_eq!(unit.symbol, "handfuls o");
        assert!(db.get_or_create_unit("").unwrap().is_none());
    }

    #[test]
    fn test_seed_default_units_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(seed_default_units(&db).unwrap(), DEFAULT_UNITS.len());
        assert_eq!(seed_default_units(&db).unwrap(), 0);
        assert_eq!(db.list_units().unwrap().len(), DEFAULT_UNITS.len());
    }

    #[test]
    fn test_search_ingredients() {
        let db = Database::open_in_memory().unwrap();
        for name in ["Brown Rice", "Rice Flour", "Onion", "100% juice"] {
            db.get_or_create_ingredient(name).unwrap();
        }

        let hits = db.search_ingredients("rice", 20).unwrap();
        let names: Vec<_> = hits.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Brown Rice", "Rice Flour"]);

        // LIKE wildcards in the query are literal
        let hits = db.search_ingredients("%", 20).unwrap();
        assert_eq!(hits.len(), 1);

        // Empty query lists by name, honoring the limit
        let hits = db.search_ingredients("", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "100% juice");
    }

    #[test]
    fn test_default_unit_created_once() {
        let db = Database::open_in_memory().unwrap();
        let a = default_unit(&db).unwrap();
        let b = default_unit(&db).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.symbol, "ea");
    }

    #[test]
    fn test_default_symbol() {
        assert_eq!(default_symbol("g"), "g");
        assert_eq!(default_symbol("cucharadita"), "cucharadit");
    }
}
