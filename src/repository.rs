//! Read access to items and recipes, as needed by the tree builder

use std::collections::HashMap;

use crate::error::{CraftError, Result};
use crate::models::{GameId, Item, ItemId, ItemType, Recipe, RecipeId, RecipeMaterial};

/// Lookups the tree builder issues while expanding a recipe tree.
///
/// Implemented by [`rusqlite::Connection`] in [`crate::db`] and by
/// [`MemoryRepository`].
pub trait RecipeRepository {
    fn find_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// The recipe producing `item`, with material items resolved.
    fn find_recipe_by_item(&self, item: ItemId) -> Result<Option<Recipe>>;
}

/// HashMap-backed repository for a single game
#[derive(Debug)]
pub struct MemoryRepository {
    game_id: GameId,
    items: HashMap<ItemId, Item>,
    recipes: HashMap<ItemId, Recipe>,
    next_id: i64,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            game_id: GameId(1),
            items: HashMap::new(),
            recipes: HashMap::new(),
            next_id: 0,
        }
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_item(&mut self, name: &str, item_type: ItemType) -> ItemId {
        let id = ItemId(self.allocate_id());
        self.items.insert(
            id,
            Item {
                id,
                game_id: self.game_id,
                name: name.to_string(),
                item_type,
            },
        );
        id
    }

    /// Attach a recipe to `item`, replacing any previous one.
    pub fn add_recipe(
        &mut self,
        item: ItemId,
        output_count: u32,
        materials: &[(ItemId, u32)],
    ) -> Result<RecipeId> {
        if !self.items.contains_key(&item) {
            return Err(CraftError::ItemNotFound(item));
        }
        if output_count < 1 {
            return Err(CraftError::Validation("output count must be at least 1".to_string()));
        }

        let mut resolved = Vec::with_capacity(materials.len());
        for &(material_id, quantity) in materials {
            let material_item = self
                .items
                .get(&material_id)
                .cloned()
                .ok_or(CraftError::ItemNotFound(material_id))?;
            resolved.push(RecipeMaterial {
                id: self.allocate_id(),
                material_item,
                quantity,
            });
        }

        let id = RecipeId(self.allocate_id());
        self.recipes.insert(
            item,
            Recipe {
                id,
                item_id: item,
                craft_time: 0,
                output_count,
                required_facility: None,
                materials: resolved,
            },
        );
        Ok(id)
    }

    /// Drop an item without touching recipes that use it as a material.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        self.recipes.remove(&id);
        self.items.remove(&id)
    }
}

impl RecipeRepository for MemoryRepository {
    fn find_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.items.get(&id).cloned())
    }

    fn find_recipe_by_item(&self, item: ItemId) -> Result<Option<Recipe>> {
        Ok(self.recipes.get(&item).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_recipe_rejects_unknown_material() {
        let mut repo = MemoryRepository::new();
        let plate = repo.add_item("Plate", ItemType::Material);

        let err = repo.add_recipe(plate, 1, &[(ItemId(99), 1)]).unwrap_err();
        assert!(matches!(err, CraftError::ItemNotFound(ItemId(99))));
    }

    #[test]
    fn add_recipe_rejects_zero_output_count() {
        let mut repo = MemoryRepository::new();
        let ore = repo.add_item("Ore", ItemType::Material);
        let plate = repo.add_item("Plate", ItemType::Material);

        let err = repo.add_recipe(plate, 0, &[(ore, 1)]).unwrap_err();
        assert!(matches!(err, CraftError::Validation(_)));
        assert!(repo.find_recipe_by_item(plate).unwrap().is_none());
    }

    #[test]
    fn remove_item_leaves_dangling_material() {
        let mut repo = MemoryRepository::new();
        let ore = repo.add_item("Ore", ItemType::Material);
        let plate = repo.add_item("Plate", ItemType::Material);
        repo.add_recipe(plate, 1, &[(ore, 2)]).unwrap();

        repo.remove_item(ore);

        let recipe = repo.find_recipe_by_item(plate).unwrap().unwrap();
        assert_eq!(recipe.materials[0].material_item.id, ore);
        assert!(repo.find_item(ore).unwrap().is_none());
    }
}
