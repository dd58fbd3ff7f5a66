//! Crafting recipe trees for games
//!
//! Items and recipes live in SQLite ([`db`]). [`tree`] expands an item's
//! recipe into a tree of required materials and [`summary`] folds that tree
//! into total quantities per item.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod repository;
pub mod sample;
pub mod summary;
pub mod tree;

pub use error::{CraftError, Result};
pub use repository::{MemoryRepository, RecipeRepository};
pub use summary::{MaterialSummary, aggregate};
pub use tree::{TreeBuilder, build_tree};
