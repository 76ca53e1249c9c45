use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

// --- Line identity ---

/// Identity of an ingredient on a recipe or shopping list line.
///
/// `Canonical` references a deduplicated catalog ingredient. `Legacy` holds the
/// free-text name stored by records that predate the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngredientKey {
    Canonical { id: i64 },
    Legacy { name: String },
}

impl IngredientKey {
    /// Canonical keys match by id, legacy keys by trimmed case-insensitive name.
    /// Keys of different variants never match.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Canonical { id: a }, Self::Canonical { id: b }) => a == b,
            (Self::Legacy { name: a }, Self::Legacy { name: b }) => {
                normalize_label(a) == normalize_label(b)
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn canonical_id(&self) -> Option<i64> {
        match self {
            Self::Canonical { id } => Some(*id),
            Self::Legacy { .. } => None,
        }
    }

    #[must_use]
    pub fn legacy_name(&self) -> Option<&str> {
        match self {
            Self::Canonical { .. } => None,
            Self::Legacy { name } => Some(name),
        }
    }
}

/// Identity of a unit. A canonical line may have no unit at all (`id: None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitKey {
    Canonical { id: Option<i64> },
    Legacy { label: String },
}

impl UnitKey {
    #[must_use]
    pub fn none() -> Self {
        Self::Canonical { id: None }
    }

    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Canonical { id: a }, Self::Canonical { id: b }) => a == b,
            (Self::Legacy { label: a }, Self::Legacy { label: b }) => {
                normalize_label(a) == normalize_label(b)
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn canonical_id(&self) -> Option<i64> {
        match self {
            Self::Canonical { id } => *id,
            Self::Legacy { .. } => None,
        }
    }

    #[must_use]
    pub fn legacy_label(&self) -> Option<&str> {
        match self {
            Self::Canonical { .. } => None,
            Self::Legacy { label } => Some(label),
        }
    }
}

/// The (ingredient, unit) pair that identifies one shopping list line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineKey {
    pub ingredient: IngredientKey,
    pub unit: UnitKey,
}

impl LineKey {
    #[must_use]
    pub fn canonical(ingredient_id: i64, unit_id: Option<i64>) -> Self {
        Self {
            ingredient: IngredientKey::Canonical { id: ingredient_id },
            unit: UnitKey::Canonical { id: unit_id },
        }
    }

    #[must_use]
    pub fn legacy(name: &str, unit: &str) -> Self {
        Self {
            ingredient: IngredientKey::Legacy {
                name: name.to_string(),
            },
            unit: UnitKey::Legacy {
                label: unit.to_string(),
            },
        }
    }

    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.ingredient.matches(&other.ingredient) && self.unit.matches(&other.unit)
    }

    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(self.ingredient, IngredientKey::Legacy { .. })
    }
}

fn normalize_label(s: &str) -> String {
    s.trim().to_lowercase()
}

// --- Catalog ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub symbol: String,
    pub created_at: String,
}

// --- Recipes ---

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub recipe_id: i64,
    pub position: i64,
    pub ingredient: IngredientKey,
    pub unit: UnitKey,
    pub quantity: String,
    pub optional: bool,
    // Joined fields for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_label: Option<String>,
}

impl RecipeIngredient {
    #[must_use]
    pub fn line_key(&self) -> LineKey {
        LineKey {
            ingredient: self.ingredient.clone(),
            unit: self.unit.clone(),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.ingredient_name
            .as_deref()
            .or_else(|| self.ingredient.legacy_name())
            .unwrap_or("?")
    }

    #[must_use]
    pub fn display_unit(&self) -> &str {
        self.unit_label
            .as_deref()
            .or_else(|| self.unit.legacy_label())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipeIngredient {
    pub key: LineKey,
    pub quantity: String,
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
}

// --- Meal plans ---

#[derive(Debug, Clone, Serialize)]
pub struct MealPlan {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A recipe included in a meal plan `count` times.
#[derive(Debug, Clone, Serialize)]
pub struct MealPlanRecipe {
    pub meal_plan_id: i64,
    pub recipe_id: i64,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlanDetail {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub recipes: Vec<MealPlanRecipe>,
}

// --- Shopping lists ---

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingList {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingListItem {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub shopping_list_id: i64,
    pub position: i64,
    pub ingredient: IngredientKey,
    pub unit: UnitKey,
    pub quantity: String,
    pub checked: bool,
    // Joined fields for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_label: Option<String>,
}

impl ShoppingListItem {
    #[must_use]
    pub fn line_key(&self) -> LineKey {
        LineKey {
            ingredient: self.ingredient.clone(),
            unit: self.unit.clone(),
        }
    }

    /// Name to show for the line: catalog name, else the legacy text.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.ingredient_name
            .as_deref()
            .or_else(|| self.ingredient.legacy_name())
            .unwrap_or("?")
    }

    #[must_use]
    pub fn display_unit(&self) -> &str {
        self.unit_label
            .as_deref()
            .or_else(|| self.unit.legacy_label())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingListDetail {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingListDetail {
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.items.iter().filter(|i| i.checked).count()
    }
}

// --- Legacy promotion ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyMigrationSummary {
    pub recipe_ingredients_promoted: i64,
    pub shopping_items_promoted: i64,
    pub skipped: i64,
}

// --- Validation ---

/// Trim a user-supplied name, rejecting blank input.
pub fn validate_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("{kind} name must not be empty");
    }
    Ok(trimmed.to_string())
}

/// Largest repeat count a meal plan link can hold.
pub const MAX_REPEAT_COUNT: u32 = 999;

/// Repeat counts are stored within `1..=MAX_REPEAT_COUNT`.
#[must_use]
pub fn clamp_repeat_count(count: i64) -> u32 {
    u32::try_from(count.clamp(1, i64::from(MAX_REPEAT_COUNT))).unwrap_or(MAX_REPEAT_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_ingredient_matches_by_id() {
        let a = IngredientKey::Canonical { id: 1 };
        assert!(a.matches(&IngredientKey::Canonical { id: 1 }));
        assert!(!a.matches(&IngredientKey::Canonical { id: 2 }));
    }

    #[test]
    fn test_legacy_ingredient_matches_case_insensitive() {
        let a = IngredientKey::Legacy {
            name: "Flour".to_string(),
        };
        let b = IngredientKey::Legacy {
            name: "  flour ".to_string(),
        };
        assert!(a.matches(&b));
    }

    #[test]
    fn test_mixed_variants_never_match() {
        let canonical = IngredientKey::Canonical { id: 1 };
        let legacy = IngredientKey::Legacy {
            name: "1".to_string(),
        };
        assert!(!canonical.matches(&legacy));
        assert!(!legacy.matches(&canonical));

        assert!(!UnitKey::none().matches(&UnitKey::Legacy {
            label: String::new()
        }));
    }

    #[test]
    fn test_unit_none_matches_none() {
        assert!(UnitKey::none().matches(&UnitKey::none()));
        assert!(!UnitKey::none().matches(&UnitKey::Canonical { id: Some(3) }));
    }

    #[test]
    fn test_line_key_legacy_case_and_whitespace() {
        let a = LineKey::legacy("Flour", "g");
        let b = LineKey::legacy("flour", " G ");
        assert!(a.matches(&b));
        assert!(!a.matches(&LineKey::legacy("flour", "cup")));
    }

    #[test]
    fn test_line_key_serializes_tagged() {
        let key = LineKey::canonical(4, None);
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["ingredient"]["kind"], "canonical");
        assert_eq!(json["ingredient"]["id"], 4);
        assert!(json["unit"]["id"].is_null());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("Recipe", "  Soup ").unwrap(), "Soup");
        assert!(validate_name("Recipe", "   ").is_err());
    }

    #[test]
    fn test_clamp_repeat_count() {
        assert_eq!(clamp_repeat_count(-4), 1);
        assert_eq!(clamp_repeat_count(0), 1);
        assert_eq!(clamp_repeat_count(3), 3);
        assert_eq!(clamp_repeat_count(i64::MAX), MAX_REPEAT_COUNT);
    }
}
