mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_ingredient_search, cmd_list_add_item, cmd_list_add_recipe, cmd_list_create,
    cmd_list_delete, cmd_list_export, cmd_list_from_recipe, cmd_list_ls, cmd_list_remove_item,
    cmd_list_show, cmd_list_toggle, cmd_migrate_legacy, cmd_plan_add_recipe, cmd_plan_create,
    cmd_plan_delete, cmd_plan_list, cmd_plan_remove_recipe, cmd_plan_set_count, cmd_plan_shop,
    cmd_plan_show, cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete,
    cmd_recipe_import, cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show,
    cmd_unit_add, cmd_unit_list, cmd_unit_seed,
};
use crate::config::Config;
use larder_core::db::Database;
use larder_core::service::LarderService;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "Recipes, meal plans, and shopping lists that add themselves up"
)]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "LARDER_DB")]
    db: Option<PathBuf>,
    /// Log every merge decision
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the unit catalog
    Unit {
        #[command(subcommand)]
        command: UnitCommands,
    },
    /// Browse the ingredient catalog
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage meal plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Manage shopping lists
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Point free-text ingredient rows at the catalog
    MigrateLegacy {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum UnitCommands {
    /// List all units
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a unit to the catalog
    Add {
        /// Unit name (e.g. "tablespoon")
        name: String,
        /// Short symbol (defaults to the first 10 characters of the name)
        #[arg(long)]
        symbol: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Insert the built-in units that are missing
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// Search ingredients by name
    Search {
        /// Substring to match (empty lists everything)
        #[arg(default_value = "")]
        query: String,
        /// Maximum number of results (capped at 50)
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe title
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        instructions: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient to a recipe
    AddIngredient {
        /// Recipe ID
        recipe: i64,
        /// Ingredient name
        name: String,
        /// Quantity, numeric or free text (e.g. "200", "a pinch")
        #[arg(default_value = "")]
        quantity: String,
        /// Unit name or symbol
        #[arg(short, long)]
        unit: Option<String>,
        /// Mark the ingredient as optional
        #[arg(long)]
        optional: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient line from a recipe
    RemoveIngredient {
        /// Recipe ID
        recipe: i64,
        /// Ingredient line ID (see `recipe show`)
        ingredient: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe and its ingredients
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe
    Delete {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Title override (defaults to metadata title or filename)
        #[arg(long)]
        title: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Create a new meal plan
    Create {
        /// Plan name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all meal plans
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a meal plan and its recipes
    Show {
        /// Meal plan ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a recipe to a plan, or bump its count if already present
    AddRecipe {
        /// Meal plan ID
        plan: i64,
        /// Recipe ID
        recipe: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set how many times a recipe is cooked in a plan
    SetCount {
        /// Meal plan ID
        plan: i64,
        /// Recipe ID
        recipe: i64,
        /// Repeat count (stored within 1..=999)
        #[arg(allow_hyphen_values = true)]
        count: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a recipe from a plan
    RemoveRecipe {
        /// Meal plan ID
        plan: i64,
        /// Recipe ID
        recipe: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal plan
    Delete {
        /// Meal plan ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a shopping list from every recipe in the plan
    Shop {
        /// Meal plan ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ListCommands {
    /// Create an empty shopping list
    Create {
        /// List name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all shopping lists
    Ls {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a shopping list
    Show {
        /// Shopping list ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a shopping list from one recipe
    FromRecipe {
        /// Recipe ID
        recipe: i64,
        /// List name (defaults to the recipe title)
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge a recipe's ingredients into an existing list
    AddRecipe {
        /// Shopping list ID
        list: i64,
        /// Recipe ID
        recipe: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Append an item by hand (not merged with existing lines)
    AddItem {
        /// Shopping list ID
        list: i64,
        /// Ingredient name
        name: String,
        /// Quantity, numeric or free text
        #[arg(default_value = "")]
        quantity: String,
        /// Unit name or symbol
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check or uncheck an item
    Toggle {
        /// Shopping list ID
        list: i64,
        /// Item ID
        item: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an item from a list
    RemoveItem {
        /// Shopping list ID
        list: i64,
        /// Item ID
        item: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a shopping list
    Delete {
        /// Shopping list ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a shopping list as CSV
    Export {
        /// Shopping list ID
        id: i64,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    let svc = LarderService::from_database(Database::open(&config.db_path)?);

    match cli.command {
        Commands::Unit { command } => match command {
            UnitCommands::List { json } => cmd_unit_list(&svc, json),
            UnitCommands::Add { name, symbol, json } => {
                cmd_unit_add(&svc, &name, symbol.as_deref(), json)
            }
            UnitCommands::Seed { json } => cmd_unit_seed(&svc, json),
        },
        Commands::Ingredient { command } => match command {
            IngredientCommands::Search { query, limit, json } => {
                cmd_ingredient_search(&svc, &query, limit, json)
            }
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create {
                title,
                description,
                instructions,
                json,
            } => cmd_recipe_create(&svc, title, description, instructions, json),
            RecipeCommands::AddIngredient {
                recipe,
                name,
                quantity,
                unit,
                optional,
                json,
            } => cmd_recipe_add_ingredient(
                &svc,
                recipe,
                &name,
                &quantity,
                unit.as_deref(),
                optional,
                json,
            ),
            RecipeCommands::RemoveIngredient {
                recipe,
                ingredient,
                json,
            } => cmd_recipe_remove_ingredient(&svc, recipe, ingredient, json),
            RecipeCommands::Show { id, json } => cmd_recipe_show(&svc, id, json),
            RecipeCommands::List { json } => cmd_recipe_list(&svc, json),
            RecipeCommands::Delete { id, json } => cmd_recipe_delete(&svc, id, json),
            RecipeCommands::Import { file, title, json } => {
                cmd_recipe_import(&svc, &file, title, json)
            }
        },
        Commands::Plan { command } => match command {
            PlanCommands::Create { name, json } => cmd_plan_create(&svc, &name, json),
            PlanCommands::List { json } => cmd_plan_list(&svc, json),
            PlanCommands::Show { id, json } => cmd_plan_show(&svc, id, json),
            PlanCommands::AddRecipe { plan, recipe, json } => {
                cmd_plan_add_recipe(&svc, plan, recipe, json)
            }
            PlanCommands::SetCount {
                plan,
                recipe,
                count,
                json,
            } => cmd_plan_set_count(&svc, plan, recipe, count, json),
            PlanCommands::RemoveRecipe { plan, recipe, json } => {
                cmd_plan_remove_recipe(&svc, plan, recipe, json)
            }
            PlanCommands::Delete { id, json } => cmd_plan_delete(&svc, id, json),
            PlanCommands::Shop { id, json } => cmd_plan_shop(&svc, id, json),
        },
        Commands::List { command } => match command {
            ListCommands::Create { name, json } => cmd_list_create(&svc, &name, json),
            ListCommands::Ls { json } => cmd_list_ls(&svc, json),
            ListCommands::Show { id, json } => cmd_list_show(&svc, id, json),
            ListCommands::FromRecipe { recipe, name, json } => {
                cmd_list_from_recipe(&svc, recipe, name.as_deref(), json)
            }
            ListCommands::AddRecipe { list, recipe, json } => {
                cmd_list_add_recipe(&svc, list, recipe, json)
            }
            ListCommands::AddItem {
                list,
                name,
                quantity,
                unit,
                json,
            } => cmd_list_add_item(&svc, list, &name, &quantity, unit.as_deref(), json),
            ListCommands::Toggle { list, item, json } => cmd_list_toggle(&svc, list, item, json),
            ListCommands::RemoveItem { list, item, json } => {
                cmd_list_remove_item(&svc, list, item, json)
            }
            ListCommands::Delete { id, json } => cmd_list_delete(&svc, id, json),
            ListCommands::Export { id, output } => cmd_list_export(&svc, id, output.as_deref()),
        },
        Commands::MigrateLegacy { json } => cmd_migrate_legacy(&svc, json),
    }
}
