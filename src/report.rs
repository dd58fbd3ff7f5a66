//! The "recipe tree" response: an expanded tree plus its material summary

use rusqlite::Connection;
use serde::Serialize;

use crate::db;
use crate::error::{CraftError, Result};
use crate::models::{RecipeId, RecipeTreeNode};
use crate::summary::{SummaryRow, aggregate};
use crate::tree::{TreeBuilder, format_tree};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeReport {
    pub tree: RecipeTreeNode,
    pub material_summary: Vec<SummaryRow>,
}

impl TreeReport {
    /// Aggregate `tree` as it stands, hidden nodes included in the tree but
    /// not in the summary.
    pub fn from_tree(tree: RecipeTreeNode) -> Self {
        let material_summary = aggregate(&tree).rows();
        Self {
            tree,
            material_summary,
        }
    }

    pub fn render_text(&self) -> String {
        let mut output = format_tree(&self.tree);
        output.push('\n');
        output.push_str(&aggregate(&self.tree).to_string());
        output
    }
}

/// Build the tree for the item a recipe produces
pub fn tree_for_recipe(
    conn: &Connection,
    recipe_id: RecipeId,
    required_quantity: u64,
    max_depth: usize,
) -> Result<RecipeTreeNode> {
    let recipe = db::find_recipe(conn, recipe_id)?.ok_or(CraftError::RecipeNotFound(recipe_id))?;
    TreeBuilder::new(conn)
        .with_max_depth(max_depth)
        .build(recipe.item_id, required_quantity)
}
