//! Error types for recipe lookups, tree building and admin writes

use thiserror::Error;

use crate::models::{GameId, ItemId, RecipeId};

#[derive(Error, Debug)]
pub enum CraftError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("recipe not found: {0}")]
    RecipeNotFound(RecipeId),

    #[error("game not found: {0}")]
    GameNotFound(GameId),

    #[error("item '{name}' already exists in game {game_id}")]
    DuplicateItem { game_id: GameId, name: String },

    #[error("item {0} already has a recipe")]
    DuplicateRecipe(ItemId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl CraftError {
    /// True for the lookup failures a caller should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CraftError::ItemNotFound(_) | CraftError::RecipeNotFound(_) | CraftError::GameNotFound(_)
        )
    }
}

/// Raised when text does not name an [`ItemType`](crate::models::ItemType).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown item type '{0}' (expected FACILITY, MATERIAL or OTHER)")]
pub struct UnknownItemType(pub String);

pub type Result<T> = std::result::Result<T, CraftError>;
