//! Craft Tree
//!
//! Browse crafting recipes as material trees and total up what a craft needs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use rusqlite::Connection;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use craft_tree::CraftError;
use craft_tree::config::Settings;
use craft_tree::db;
use craft_tree::models::{GameId, ItemId, ItemType, RecipeDraft, RecipeId};
use craft_tree::report::{self, TreeReport};
use craft_tree::sample;

#[derive(Parser)]
#[command(name = "craft-tree", version)]
#[command(about = "Recipe trees and material totals for game crafting data")]
struct Cli {
    /// Settings file (defaults to ./craft-tree.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(long)]
    database: Option<PathBuf>,

    /// Deepest level a recipe tree is expanded to
    #[arg(long)]
    max_depth: Option<usize>,

    /// Log verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Replace the database contents with a small demo game
    LoadSample,

    /// Add a game
    AddGame {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List all games
    Games,

    /// Rename a game and replace its description
    UpdateGame {
        id: GameId,

        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a game with all of its items and recipes
    DeleteGame { id: GameId },

    /// Add an item to a game
    AddItem {
        game: GameId,

        name: String,

        /// FACILITY, MATERIAL or OTHER
        #[arg(short = 't', long = "type", default_value = "MATERIAL")]
        item_type: ItemType,
    },

    /// List the items of a game
    Items {
        game: GameId,

        /// Only items whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show an item and its recipe
    Item { id: ItemId },

    /// Rename or retype an item
    UpdateItem {
        id: ItemId,

        #[arg(long)]
        name: Option<String>,

        /// FACILITY, MATERIAL or OTHER
        #[arg(short = 't', long = "type")]
        item_type: Option<ItemType>,
    },

    /// Delete an item and its recipe
    DeleteItem { id: ItemId },

    /// Define the recipe for an item
    AddRecipe {
        item: ItemId,

        /// Seconds per craft cycle
        #[arg(long, default_value_t = 0)]
        craft_time: u32,

        /// Units produced per craft cycle
        #[arg(long, default_value_t = 1)]
        output_count: u32,

        /// Facility item required to craft
        #[arg(long)]
        facility: Option<ItemId>,

        /// Material as ITEM_ID:QUANTITY (quantity defaults to 1), repeatable
        #[arg(short, long = "material", required = true)]
        materials: Vec<MaterialArg>,
    },

    /// Replace the craft time, output, facility and materials of a recipe
    UpdateRecipe {
        id: RecipeId,

        /// Seconds per craft cycle
        #[arg(long, default_value_t = 0)]
        craft_time: u32,

        /// Units produced per craft cycle
        #[arg(long, default_value_t = 1)]
        output_count: u32,

        /// Facility item required to craft
        #[arg(long)]
        facility: Option<ItemId>,

        /// Material as ITEM_ID:QUANTITY (quantity defaults to 1), repeatable
        #[arg(short, long = "material", required = true)]
        materials: Vec<MaterialArg>,
    },

    /// Delete a recipe
    DeleteRecipe { id: RecipeId },

    /// Expand a recipe into its material tree and total the materials
    Tree {
        recipe: RecipeId,

        /// Units of the recipe's item to craft
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        quantity: u64,

        /// Leave an item (and everything under it) out of the totals, repeatable
        #[arg(long = "hide")]
        hide: Vec<ItemId>,

        /// Print the tree and summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct MaterialArg {
    item: ItemId,
    quantity: u32,
}

impl FromStr for MaterialArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (item, quantity) = match s.split_once(':') {
            Some((item, quantity)) => (item, quantity),
            None => (s, "1"),
        };
        let item = item
            .parse()
            .map_err(|e| format!("invalid item id '{item}': {e}"))?;
        let quantity = quantity
            .trim()
            .parse()
            .map_err(|e| format!("invalid quantity '{quantity}': {e}"))?;
        Ok(MaterialArg { item, quantity })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let not_found = err
                .downcast_ref::<CraftError>()
                .is_some_and(CraftError::is_not_found);
            if not_found {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if verbosity == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(database) = cli.database {
        settings.database = database;
    }
    if let Some(max_depth) = cli.max_depth {
        settings.max_depth = max_depth;
    }
    debug!(?settings, "settings resolved");

    let conn = Connection::open(&settings.database)
        .with_context(|| format!("failed to open {}", settings.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", settings.database.display());
        }

        Commands::LoadSample => {
            let stats = sample::load_sample(&conn)?;
            println!(
                "Loaded game '{}' (id {}) with {} items and {} recipes",
                stats.game.name, stats.game.id, stats.items, stats.recipes
            );
        }

        Commands::AddGame { name, description } => {
            let game = db::insert_game(&conn, &name, description.as_deref())?;
            println!("Created game {} ({})", game.id, game.name);
        }

        Commands::Games => {
            let games = db::list_games(&conn)?;
            if games.is_empty() {
                println!("No games in database. Run 'add-game' or 'load-sample' first.");
            } else {
                println!("{:>6}  {}", "ID", "Game");
                println!("{}", "-".repeat(40));
                for g in games {
                    match g.description {
                        Some(description) => println!("{:>6}  {} - {}", g.id, g.name, description),
                        None => println!("{:>6}  {}", g.id, g.name),
                    }
                }
            }
        }

        Commands::UpdateGame {
            id,
            name,
            description,
        } => {
            let game = db::update_game(&conn, id, &name, description.as_deref())?;
            println!("Updated game {} ({})", game.id, game.name);
        }

        Commands::DeleteGame { id } => {
            db::delete_game(&conn, id)?;
            println!("Deleted game {}", id);
        }

        Commands::AddItem {
            game,
            name,
            item_type,
        } => {
            let item = db::insert_item(&conn, game, &name, item_type)?;
            println!("Created item {} ({}, {})", item.id, item.name, item.item_type);
        }

        Commands::Items { game, search } => {
            if db::find_game(&conn, game)?.is_none() {
                return Err(CraftError::GameNotFound(game).into());
            }
            let items = db::list_items(&conn, game, search.as_deref())?;
            if items.is_empty() {
                println!("No items found.");
            } else {
                println!("{:>6}  {:<30} {:<10} {}", "ID", "Item", "Type", "Recipe");
                println!("{}", "-".repeat(56));
                for listing in items {
                    println!(
                        "{:>6}  {:<30} {:<10} {}",
                        listing.item.id,
                        listing.item.name,
                        listing.item.item_type,
                        if listing.has_recipe { "yes" } else { "-" }
                    );
                }
            }
        }

        Commands::Item { id } => {
            let item = db::find_item(&conn, id)?.ok_or(CraftError::ItemNotFound(id))?;
            println!("Item: {}", item.name);
            println!("  ID: {}", item.id);
            println!("  Game: {}", item.game_id);
            println!("  Type: {}", item.item_type);

            match db::find_recipe_by_item(&conn, id)? {
                Some(recipe) => {
                    println!("  Recipe {}:", recipe.id);
                    println!("    Craft time: {}s", recipe.craft_time);
                    println!("    Output: {} per cycle", recipe.output_count);
                    if let Some(facility) = &recipe.required_facility {
                        println!("    Facility: {}", facility.name);
                    }
                    println!("    Materials:");
                    for m in &recipe.materials {
                        println!("      {} x {}", m.material_item.name, m.quantity);
                    }
                }
                None => println!("  No recipe (raw material)"),
            }
        }

        Commands::UpdateItem {
            id,
            name,
            item_type,
        } => {
            let current = db::find_item(&conn, id)?.ok_or(CraftError::ItemNotFound(id))?;
            let item = db::update_item(
                &conn,
                id,
                name.as_deref().unwrap_or(&current.name),
                item_type.unwrap_or(current.item_type),
            )?;
            println!("Updated item {} ({}, {})", item.id, item.name, item.item_type);
        }

        Commands::DeleteItem { id } => {
            db::delete_item(&conn, id)?;
            println!("Deleted item {}", id);
        }

        Commands::AddRecipe {
            item,
            craft_time,
            output_count,
            facility,
            materials,
        } => {
            let recipe = db::create_recipe(
                &conn,
                &RecipeDraft {
                    item_id: item,
                    craft_time,
                    output_count,
                    required_facility_id: facility,
                    materials: materials.iter().map(|m| (m.item, m.quantity)).collect(),
                },
            )?;
            println!(
                "Created recipe {} for item {} with {} materials",
                recipe.id,
                recipe.item_id,
                recipe.materials.len()
            );
        }

        Commands::UpdateRecipe {
            id,
            craft_time,
            output_count,
            facility,
            materials,
        } => {
            let current = db::find_recipe(&conn, id)?.ok_or(CraftError::RecipeNotFound(id))?;
            let recipe = db::update_recipe(
                &conn,
                id,
                &RecipeDraft {
                    item_id: current.item_id,
                    craft_time,
                    output_count,
                    required_facility_id: facility,
                    materials: materials.iter().map(|m| (m.item, m.quantity)).collect(),
                },
            )?;
            println!(
                "Updated recipe {} for item {} with {} materials",
                recipe.id,
                recipe.item_id,
                recipe.materials.len()
            );
        }

        Commands::DeleteRecipe { id } => {
            db::delete_recipe(&conn, id)?;
            println!("Deleted recipe {}", id);
        }

        Commands::Tree {
            recipe,
            quantity,
            hide,
            json,
        } => {
            let mut tree = report::tree_for_recipe(&conn, recipe, quantity, settings.max_depth)?;
            for item in hide {
                let touched = tree.set_visibility(item, false);
                if item == tree.item.id {
                    tree.is_visible = true;
                    warn!(%item, "the root item is always shown and counted");
                } else if touched == 0 {
                    warn!(%item, "hidden item does not appear in the tree");
                }
            }

            let tree_report = TreeReport::from_tree(tree);
            if json {
                println!("{}", serde_json::to_string_pretty(&tree_report)?);
            } else {
                print!("{}", tree_report.render_text());
            }
        }
    }

    Ok(())
}
