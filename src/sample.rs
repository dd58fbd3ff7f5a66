//! Demo data for trying the CLI without entering a game by hand

use rusqlite::Connection;

use crate::db;
use crate::error::{CraftError, Result};
use crate::models::{Game, ItemId, ItemType, RecipeDraft};

/// Counts of what [`load_sample`] wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleStats {
    pub game: Game,
    pub items: usize,
    pub recipes: usize,
}

struct SampleRecipe {
    item: &'static str,
    craft_time: u32,
    output_count: u32,
    facility: Option<&'static str>,
    materials: &'static [(&'static str, u32)],
}

const ITEMS: &[(&str, ItemType)] = &[
    ("Furnace", ItemType::Facility),
    ("Assembler", ItemType::Facility),
    ("Iron Ore", ItemType::Material),
    ("Copper Ore", ItemType::Material),
    ("Coal", ItemType::Material),
    ("Iron Plate", ItemType::Material),
    ("Copper Plate", ItemType::Material),
    ("Copper Wire", ItemType::Material),
    ("Steel", ItemType::Material),
    ("Circuit", ItemType::Material),
    ("Motor", ItemType::Other),
    // Seed and Crystal craft into each other
    ("Crystal Seed", ItemType::Material),
    ("Crystal", ItemType::Material),
];

const RECIPES: &[SampleRecipe] = &[
    SampleRecipe {
        item: "Iron Plate",
        craft_time: 3,
        output_count: 1,
        facility: Some("Furnace"),
        materials: &[("Iron Ore", 1)],
    },
    SampleRecipe {
        item: "Copper Plate",
        craft_time: 3,
        output_count: 1,
        facility: Some("Furnace"),
        materials: &[("Copper Ore", 1)],
    },
    SampleRecipe {
        item: "Steel",
        craft_time: 16,
        output_count: 1,
        facility: Some("Furnace"),
        materials: &[("Iron Plate", 5), ("Coal", 1)],
    },
    SampleRecipe {
        item: "Copper Wire",
        craft_time: 1,
        output_count: 2,
        facility: Some("Assembler"),
        materials: &[("Copper Plate", 1)],
    },
    SampleRecipe {
        item: "Circuit",
        craft_time: 5,
        output_count: 1,
        facility: Some("Assembler"),
        materials: &[("Iron Plate", 1), ("Copper Wire", 3)],
    },
    SampleRecipe {
        item: "Motor",
        craft_time: 10,
        output_count: 1,
        facility: Some("Assembler"),
        materials: &[("Steel", 1), ("Circuit", 2), ("Copper Wire", 4)],
    },
    SampleRecipe {
        item: "Assembler",
        craft_time: 20,
        output_count: 1,
        facility: None,
        materials: &[("Circuit", 3), ("Iron Plate", 9)],
    },
    SampleRecipe {
        item: "Crystal",
        craft_time: 30,
        output_count: 2,
        facility: None,
        materials: &[("Crystal Seed", 1)],
    },
    SampleRecipe {
        item: "Crystal Seed",
        craft_time: 10,
        output_count: 1,
        facility: None,
        materials: &[("Crystal", 1), ("Coal", 2)],
    },
];

/// Replace the database contents with the demo game
pub fn load_sample(conn: &Connection) -> Result<SampleStats> {
    db::clear_data(conn)?;

    let game = db::insert_game(
        conn,
        "Factory Demo",
        Some("Small production chain with a craftable facility and a recipe cycle"),
    )?;

    for (name, item_type) in ITEMS {
        db::insert_item(conn, game.id, name, *item_type)?;
    }

    let lookup = |name: &str| -> Result<ItemId> {
        db::find_item_by_name(conn, game.id, name)?
            .map(|item| item.id)
            .ok_or_else(|| CraftError::Validation(format!("sample item '{name}' missing")))
    };

    for recipe in RECIPES {
        let materials = recipe
            .materials
            .iter()
            .map(|(name, quantity)| Ok((lookup(name)?, *quantity)))
            .collect::<Result<Vec<_>>>()?;

        db::create_recipe(
            conn,
            &RecipeDraft {
                item_id: lookup(recipe.item)?,
                craft_time: recipe.craft_time,
                output_count: recipe.output_count,
                required_facility_id: recipe.facility.map(&lookup).transpose()?,
                materials,
            },
        )?;
    }

    Ok(SampleStats {
        game,
        items: ITEMS.len(),
        recipes: RECIPES.len(),
    })
}
