//! Database schema and operations

use std::collections::HashSet;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{CraftError, Result};
use crate::models::{
    Game, GameId, Item, ItemId, ItemListing, ItemType, Recipe, RecipeDraft, RecipeId,
    RecipeMaterial,
};
use crate::repository::RecipeRepository;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT
        );

        -- Item names are unique within a game
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            item_type TEXT NOT NULL,
            UNIQUE (game_id, name)
        );

        -- At most one recipe per produced item
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL UNIQUE REFERENCES items(id) ON DELETE CASCADE,
            craft_time_s INTEGER NOT NULL CHECK (craft_time_s >= 0),
            output_count INTEGER NOT NULL CHECK (output_count >= 1),
            required_facility_id INTEGER REFERENCES items(id)
        );

        -- Row id order is the material declaration order
        CREATE TABLE IF NOT EXISTS recipe_materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            material_item_id INTEGER NOT NULL REFERENCES items(id),
            quantity INTEGER NOT NULL CHECK (quantity >= 1),
            UNIQUE (recipe_id, material_item_id)
        );

        CREATE INDEX IF NOT EXISTS idx_items_game ON items(game_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_materials_recipe ON recipe_materials(recipe_id);
        "#,
    )?;
    Ok(())
}

/// Clear all data (for reloading samples)
pub fn clear_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_materials;
        DELETE FROM recipes;
        DELETE FROM items;
        DELETE FROM games;
        "#,
    )?;
    Ok(())
}

impl ToSql for ItemType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ItemType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

const ITEM_COLUMNS: &str = "id, game_id, name, item_type";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: ItemId(row.get(0)?),
        game_id: GameId(row.get(1)?),
        name: row.get(2)?,
        item_type: row.get(3)?,
    })
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: GameId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

/// Insert a game
pub fn insert_game(conn: &Connection, name: &str, description: Option<&str>) -> Result<Game> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CraftError::Validation("game name must not be empty".to_string()));
    }

    conn.execute(
        "INSERT INTO games (name, description) VALUES (?1, ?2)",
        params![name, description],
    )?;
    let id = GameId(conn.last_insert_rowid());
    info!(%id, name, "created game");

    Ok(Game {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
    })
}

pub fn find_game(conn: &Connection, id: GameId) -> Result<Option<Game>> {
    let game = conn
        .query_row(
            "SELECT id, name, description FROM games WHERE id = ?1",
            [id.0],
            game_from_row,
        )
        .optional()?;
    Ok(game)
}

/// Rename a game and replace its description
pub fn update_game(
    conn: &Connection,
    id: GameId,
    name: &str,
    description: Option<&str>,
) -> Result<Game> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CraftError::Validation("game name must not be empty".to_string()));
    }

    let updated = conn.execute(
        "UPDATE games SET name = ?1, description = ?2 WHERE id = ?3",
        params![name, description, id.0],
    )?;
    if updated == 0 {
        return Err(CraftError::GameNotFound(id));
    }
    info!(%id, name, "updated game");

    Ok(Game {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
    })
}

/// Delete a game with all of its items and recipes
pub fn delete_game(conn: &Connection, id: GameId) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM recipe_materials WHERE recipe_id IN (
             SELECT r.id FROM recipes r JOIN items i ON i.id = r.item_id WHERE i.game_id = ?1
         )",
        [id.0],
    )?;
    tx.execute(
        "DELETE FROM recipes WHERE item_id IN (SELECT id FROM items WHERE game_id = ?1)",
        [id.0],
    )?;
    tx.execute("DELETE FROM items WHERE game_id = ?1", [id.0])?;
    let deleted = tx.execute("DELETE FROM games WHERE id = ?1", [id.0])?;
    if deleted == 0 {
        return Err(CraftError::GameNotFound(id));
    }
    tx.commit()?;
    info!(%id, "deleted game");
    Ok(())
}

/// List all games in the database
pub fn list_games(conn: &Connection) -> Result<Vec<Game>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM games ORDER BY name")?;
    let rows = stmt.query_map([], game_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Insert an item into a game
pub fn insert_item(
    conn: &Connection,
    game_id: GameId,
    name: &str,
    item_type: ItemType,
) -> Result<Item> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CraftError::Validation("item name must not be empty".to_string()));
    }
    if find_game(conn, game_id)?.is_none() {
        return Err(CraftError::GameNotFound(game_id));
    }
    if find_item_by_name(conn, game_id, name)?.is_some() {
        return Err(CraftError::DuplicateItem {
            game_id,
            name: name.to_string(),
        });
    }

    conn.execute(
        "INSERT INTO items (game_id, name, item_type) VALUES (?1, ?2, ?3)",
        params![game_id.0, name, item_type],
    )?;
    let id = ItemId(conn.last_insert_rowid());
    info!(%id, %game_id, name, %item_type, "created item");

    Ok(Item {
        id,
        game_id,
        name: name.to_string(),
        item_type,
    })
}

pub fn find_item(conn: &Connection, id: ItemId) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            [id.0],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

pub fn find_item_by_name(conn: &Connection, game_id: GameId, name: &str) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE game_id = ?1 AND name = ?2"),
            params![game_id.0, name],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// List the items of a game, optionally filtered by a case-insensitive name fragment
pub fn list_items(
    conn: &Connection,
    game_id: GameId,
    search: Option<&str>,
) -> Result<Vec<ItemListing>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.game_id, i.name, i.item_type,
                EXISTS (SELECT 1 FROM recipes r WHERE r.item_id = i.id)
         FROM items i
         WHERE i.game_id = ?1
           AND (?2 IS NULL OR instr(lower(i.name), lower(?2)) > 0)
         ORDER BY i.name COLLATE NOCASE",
    )?;

    let rows = stmt.query_map(params![game_id.0, search], |row| {
        Ok(ItemListing {
            item: item_from_row(row)?,
            has_recipe: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Rename and retype an item.
///
/// An item still required as a facility by some recipe must stay a `FACILITY`.
pub fn update_item(
    conn: &Connection,
    id: ItemId,
    name: &str,
    item_type: ItemType,
) -> Result<Item> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CraftError::Validation("item name must not be empty".to_string()));
    }
    let current = find_item(conn, id)?.ok_or(CraftError::ItemNotFound(id))?;
    if let Some(other) = find_item_by_name(conn, current.game_id, name)? {
        if other.id != id {
            return Err(CraftError::DuplicateItem {
                game_id: current.game_id,
                name: name.to_string(),
            });
        }
    }
    if item_type != ItemType::Facility {
        let required_by: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE required_facility_id = ?1",
            [id.0],
            |row| row.get(0),
        )?;
        if required_by > 0 {
            return Err(CraftError::Validation(format!(
                "'{}' is the required facility of {required_by} recipe(s) and must stay a FACILITY",
                current.name
            )));
        }
    }

    conn.execute(
        "UPDATE items SET name = ?1, item_type = ?2 WHERE id = ?3",
        params![name, item_type, id.0],
    )?;
    info!(%id, name, %item_type, "updated item");

    Ok(Item {
        id,
        game_id: current.game_id,
        name: name.to_string(),
        item_type,
    })
}

/// Delete an item together with its own recipe.
///
/// Fails with a constraint error while another recipe still uses the item.
pub fn delete_item(conn: &Connection, id: ItemId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM items WHERE id = ?1", [id.0])?;
    if deleted == 0 {
        return Err(CraftError::ItemNotFound(id));
    }
    info!(%id, "deleted item");
    Ok(())
}

/// Check a draft before it is written. `replacing` names the recipe the draft
/// overwrites, which is then allowed to already exist for the item.
fn validate_draft(
    conn: &Connection,
    draft: &RecipeDraft,
    replacing: Option<RecipeId>,
) -> Result<()> {
    if draft.output_count < 1 {
        return Err(CraftError::Validation("output count must be at least 1".to_string()));
    }
    if draft.materials.is_empty() {
        return Err(CraftError::Validation("a recipe needs at least one material".to_string()));
    }

    let mut seen = HashSet::new();
    for &(material, quantity) in &draft.materials {
        if quantity < 1 {
            return Err(CraftError::Validation(format!(
                "quantity of material {material} must be at least 1"
            )));
        }
        if !seen.insert(material) {
            return Err(CraftError::Validation(format!(
                "material {material} is listed more than once"
            )));
        }
        if find_item(conn, material)?.is_none() {
            return Err(CraftError::ItemNotFound(material));
        }
    }

    if find_item(conn, draft.item_id)?.is_none() {
        return Err(CraftError::ItemNotFound(draft.item_id));
    }
    if let Some(existing) = find_recipe_by_item(conn, draft.item_id)? {
        if Some(existing.id) != replacing {
            return Err(CraftError::DuplicateRecipe(draft.item_id));
        }
    }

    if let Some(facility_id) = draft.required_facility_id {
        let facility = find_item(conn, facility_id)?.ok_or(CraftError::ItemNotFound(facility_id))?;
        if facility.item_type != ItemType::Facility {
            return Err(CraftError::Validation(format!(
                "required facility '{}' is a {}, not a FACILITY",
                facility.name, facility.item_type
            )));
        }
    }

    Ok(())
}

/// Create a recipe and its materials in one transaction
pub fn create_recipe(conn: &Connection, draft: &RecipeDraft) -> Result<Recipe> {
    validate_draft(conn, draft, None)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO recipes (item_id, craft_time_s, output_count, required_facility_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            draft.item_id.0,
            draft.craft_time,
            draft.output_count,
            draft.required_facility_id.map(|id| id.0),
        ],
    )?;
    let id = RecipeId(tx.last_insert_rowid());

    insert_materials(&tx, id, &draft.materials)?;
    tx.commit()?;
    info!(%id, item = %draft.item_id, materials = draft.materials.len(), "created recipe");

    find_recipe(conn, id)?.ok_or(CraftError::RecipeNotFound(id))
}

/// Replace craft time, output count, facility and materials of a recipe.
///
/// The recipe keeps its id and its item; `draft.item_id` must name that item.
pub fn update_recipe(conn: &Connection, id: RecipeId, draft: &RecipeDraft) -> Result<Recipe> {
    let current = find_recipe(conn, id)?.ok_or(CraftError::RecipeNotFound(id))?;
    if current.item_id != draft.item_id {
        return Err(CraftError::Validation(format!(
            "recipe {id} produces item {}, not {}",
            current.item_id, draft.item_id
        )));
    }
    validate_draft(conn, draft, Some(id))?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE recipes
         SET craft_time_s = ?1, output_count = ?2, required_facility_id = ?3
         WHERE id = ?4",
        params![
            draft.craft_time,
            draft.output_count,
            draft.required_facility_id.map(|id| id.0),
            id.0,
        ],
    )?;
    tx.execute("DELETE FROM recipe_materials WHERE recipe_id = ?1", [id.0])?;
    insert_materials(&tx, id, &draft.materials)?;
    tx.commit()?;
    info!(%id, item = %draft.item_id, materials = draft.materials.len(), "updated recipe");

    find_recipe(conn, id)?.ok_or(CraftError::RecipeNotFound(id))
}

fn insert_materials(
    conn: &Connection,
    recipe: RecipeId,
    materials: &[(ItemId, u32)],
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO recipe_materials (recipe_id, material_item_id, quantity)
         VALUES (?1, ?2, ?3)",
    )?;
    for &(material, quantity) in materials {
        stmt.execute(params![recipe.0, material.0, quantity])?;
    }
    Ok(())
}

/// Recipe columns before materials and facility are resolved
struct RecipeRow {
    id: RecipeId,
    item_id: ItemId,
    craft_time: u32,
    output_count: u32,
    required_facility_id: Option<ItemId>,
}

const RECIPE_COLUMNS: &str = "id, item_id, craft_time_s, output_count, required_facility_id";

fn recipe_row(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: RecipeId(row.get(0)?),
        item_id: ItemId(row.get(1)?),
        craft_time: row.get(2)?,
        output_count: row.get(3)?,
        required_facility_id: row.get::<_, Option<i64>>(4)?.map(ItemId),
    })
}

/// Resolve materials and facility. A reference to a missing item is an
/// integrity violation and is reported as `ItemNotFound`.
fn hydrate_recipe(conn: &Connection, row: RecipeRow) -> Result<Recipe> {
    let mut stmt = conn.prepare(
        "SELECT id, material_item_id, quantity
         FROM recipe_materials
         WHERE recipe_id = ?1
         ORDER BY id",
    )?;
    let rows = stmt.query_map([row.id.0], |r| {
        Ok((r.get::<_, i64>(0)?, ItemId(r.get(1)?), r.get::<_, u32>(2)?))
    })?;

    let mut materials = Vec::new();
    for material in rows {
        let (id, material_id, quantity) = material?;
        let material_item = find_item(conn, material_id)?.ok_or(CraftError::ItemNotFound(material_id))?;
        materials.push(RecipeMaterial {
            id,
            material_item,
            quantity,
        });
    }

    let required_facility = match row.required_facility_id {
        Some(facility_id) => {
            Some(find_item(conn, facility_id)?.ok_or(CraftError::ItemNotFound(facility_id))?)
        }
        None => None,
    };

    Ok(Recipe {
        id: row.id,
        item_id: row.item_id,
        craft_time: row.craft_time,
        output_count: row.output_count,
        required_facility,
        materials,
    })
}

pub fn find_recipe(conn: &Connection, id: RecipeId) -> Result<Option<Recipe>> {
    let row = conn
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
            [id.0],
            recipe_row,
        )
        .optional()?;
    row.map(|row| hydrate_recipe(conn, row)).transpose()
}

pub fn find_recipe_by_item(conn: &Connection, item_id: ItemId) -> Result<Option<Recipe>> {
    let row = conn
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE item_id = ?1"),
            [item_id.0],
            recipe_row,
        )
        .optional()?;
    row.map(|row| hydrate_recipe(conn, row)).transpose()
}

pub fn delete_recipe(conn: &Connection, id: RecipeId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM recipes WHERE id = ?1", [id.0])?;
    if deleted == 0 {
        return Err(CraftError::RecipeNotFound(id));
    }
    info!(%id, "deleted recipe");
    Ok(())
}

impl RecipeRepository for Connection {
    fn find_item(&self, id: ItemId) -> Result<Option<Item>> {
        debug!(%id, "item lookup");
        find_item(self, id)
    }

    fn find_recipe_by_item(&self, item: ItemId) -> Result<Option<Recipe>> {
        debug!(%item, "recipe lookup");
        find_recipe_by_item(self, item)
    }
}
