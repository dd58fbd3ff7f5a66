//! Recipe tree expansion
//!
//! Expands an item's recipe into a tree of required materials, scaling
//! quantities through each recipe's output count, down to items that have
//! no recipe. Recursion is bounded two ways: an item that already appears
//! among its own ancestors, and a node deeper than the maximum depth, both
//! become forced leaves. Neither is an error.

use std::num::NonZeroU32;

use tracing::{debug, instrument};

use crate::error::{CraftError, Result};
use crate::models::{ItemId, RecipeTreeNode, Truncation};
use crate::repository::RecipeRepository;

pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Items on the path from the root to the node being built.
///
/// Lives on the call stack; each recursive call links a new frame to its
/// parent's, so sibling branches never see each other's items.
struct Ancestors<'a> {
    item: ItemId,
    parent: Option<&'a Ancestors<'a>>,
}

impl Ancestors<'_> {
    fn contains(&self, item: ItemId) -> bool {
        let mut current = Some(self);
        while let Some(frame) = current {
            if frame.item == item {
                return true;
            }
            current = frame.parent;
        }
        false
    }
}

/// Quantity of a material needed to cover `parent_quantity` units, given
/// that one craft cycle consumes `material_quantity` and yields `output_count`.
/// Partial craft cycles round up.
pub fn child_quantity(
    parent_quantity: u64,
    material_quantity: u32,
    output_count: NonZeroU32,
) -> u64 {
    parent_quantity
        .saturating_mul(u64::from(material_quantity))
        .div_ceil(u64::from(output_count.get()))
}

pub struct TreeBuilder<'r, R: ?Sized> {
    repo: &'r R,
    max_depth: usize,
}

impl<'r, R: RecipeRepository + ?Sized> TreeBuilder<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self {
            repo,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Build the tree for `root`, needing `required_quantity` units of it.
    ///
    /// Fails with [`CraftError::ItemNotFound`] if the root, or any material
    /// reached while expanding, does not exist.
    #[instrument(level = "debug", skip(self), fields(max_depth = self.max_depth))]
    pub fn build(&self, root: ItemId, required_quantity: u64) -> Result<RecipeTreeNode> {
        let tree = self.build_node(root, required_quantity, 0, None)?;
        debug!(nodes = tree.node_count(), levels = tree.depth(), "recipe tree built");
        Ok(tree)
    }

    fn build_node(
        &self,
        item_id: ItemId,
        required_quantity: u64,
        depth: usize,
        path: Option<&Ancestors<'_>>,
    ) -> Result<RecipeTreeNode> {
        let item = self
            .repo
            .find_item(item_id)?
            .ok_or(CraftError::ItemNotFound(item_id))?;

        let truncation = if path.is_some_and(|p| p.contains(item_id)) {
            Some(Truncation::Cycle)
        } else if depth > self.max_depth {
            Some(Truncation::DepthLimit)
        } else {
            None
        };
        if let Some(reason) = truncation {
            debug!(item = %item_id, name = %item.name, depth, %reason, "forced leaf");
            return Ok(RecipeTreeNode::forced_leaf(item, required_quantity, reason));
        }

        let Some(recipe) = self.repo.find_recipe_by_item(item_id)? else {
            return Ok(RecipeTreeNode::leaf(item, required_quantity));
        };

        let Some(output_count) = NonZeroU32::new(recipe.output_count) else {
            return Err(CraftError::Validation(format!(
                "recipe {} for '{}' has an output count of zero",
                recipe.id, item.name
            )));
        };

        let frame = Ancestors {
            item: item_id,
            parent: path,
        };
        let mut children = Vec::with_capacity(recipe.materials.len());
        for material in &recipe.materials {
            let quantity = child_quantity(required_quantity, material.quantity, output_count);
            children.push(self.build_node(
                material.material_item.id,
                quantity,
                depth + 1,
                Some(&frame),
            )?);
        }

        Ok(RecipeTreeNode::crafted(item, recipe, required_quantity, children))
    }
}

/// Build a recipe tree with the default maximum depth
pub fn build_tree<R: RecipeRepository + ?Sized>(
    repo: &R,
    root: ItemId,
    required_quantity: u64,
) -> Result<RecipeTreeNode> {
    TreeBuilder::new(repo).build(root, required_quantity)
}

/// Format a recipe tree as an indented listing, leaving out hidden nodes.
///
/// The root is always printed, matching the summary which always counts it.
pub fn format_tree(node: &RecipeTreeNode) -> String {
    let mut output = String::new();
    write_node(&mut output, node, 0);
    output
}

fn write_node(output: &mut String, node: &RecipeTreeNode, indent: usize) {
    if indent > 0 && !node.is_visible {
        return;
    }
    let prefix = "  ".repeat(indent);

    let detail = match (&node.recipe, node.truncated) {
        (_, Some(reason)) => format!("not expanded: {}", reason),
        (None, None) => "raw".to_string(),
        (Some(recipe), None) => {
            let mut detail = format!("{} per {}s", recipe.output_count, recipe.craft_time);
            if let Some(facility) = &recipe.required_facility {
                detail.push_str(&format!(" @ {}", facility.name));
            }
            detail
        }
    };

    output.push_str(&format!(
        "{}{}x {} ({})\n",
        prefix, node.required_quantity, node.item.name, detail
    ));
    for child in &node.children {
        write_node(output, child, indent + 1);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::models::{GameId, Item, ItemType, Recipe, RecipeId, RecipeMaterial};
    use crate::repository::MemoryRepository;

    #[rstest]
    #[case(4, 2, 3, 3)]
    #[case(1, 1, 1, 1)]
    #[case(1, 3, 2, 2)]
    #[case(6, 1, 2, 3)]
    #[case(7, 1, 2, 4)]
    #[case(0, 5, 1, 0)]
    fn child_quantity_rounds_up_to_whole_cycles(
        #[case] parent: u64,
        #[case] material: u32,
        #[case] output: u32,
        #[case] expected: u64,
    ) {
        let output = NonZeroU32::new(output).unwrap();
        assert_eq!(child_quantity(parent, material, output), expected);
    }

    #[test]
    fn child_quantity_saturates() {
        assert_eq!(child_quantity(u64::MAX, 2, NonZeroU32::MIN), u64::MAX);
    }

    /// Serves one recipe with a zero output count, as a hand-written store might
    struct ZeroOutputRepo {
        plate: Item,
        ore: Item,
    }

    impl RecipeRepository for ZeroOutputRepo {
        fn find_item(&self, id: ItemId) -> Result<Option<Item>> {
            Ok([&self.plate, &self.ore]
                .into_iter()
                .find(|item| item.id == id)
                .cloned())
        }

        fn find_recipe_by_item(&self, item: ItemId) -> Result<Option<Recipe>> {
            if item != self.plate.id {
                return Ok(None);
            }
            Ok(Some(Recipe {
                id: RecipeId(1),
                item_id: self.plate.id,
                craft_time: 0,
                output_count: 0,
                required_facility: None,
                materials: vec![RecipeMaterial {
                    id: 1,
                    material_item: self.ore.clone(),
                    quantity: 1,
                }],
            }))
        }
    }

    #[test]
    fn zero_output_count_is_rejected_while_building() {
        let item = |id, name: &str| Item {
            id: ItemId(id),
            game_id: GameId(1),
            name: name.to_string(),
            item_type: ItemType::Material,
        };
        let repo = ZeroOutputRepo {
            plate: item(1, "Plate"),
            ore: item(2, "Ore"),
        };

        let err = build_tree(&repo, ItemId(1), 1).unwrap_err();
        assert!(matches!(err, CraftError::Validation(_)), "{err:?}");
    }

    #[test]
    fn ancestors_only_see_their_own_path() {
        let root = Ancestors {
            item: ItemId(1),
            parent: None,
        };
        let left = Ancestors {
            item: ItemId(2),
            parent: Some(&root),
        };
        let right = Ancestors {
            item: ItemId(3),
            parent: Some(&root),
        };

        assert!(left.contains(ItemId(1)));
        assert!(left.contains(ItemId(2)));
        assert!(!left.contains(ItemId(3)));
        assert!(!right.contains(ItemId(2)));
    }

    #[test]
    fn format_tree_marks_leaves_and_skips_hidden_nodes() {
        let mut repo = MemoryRepository::new();
        let ore = repo.add_item("Ore", ItemType::Material);
        let coal = repo.add_item("Coal", ItemType::Material);
        let plate = repo.add_item("Plate", ItemType::Material);
        repo.add_recipe(plate, 1, &[(ore, 2), (coal, 1)]).unwrap();
        repo.add_recipe(ore, 1, &[(plate, 1)]).unwrap();

        let mut tree = build_tree(&repo, plate, 1).unwrap();
        let text = format_tree(&tree);
        assert_eq!(
            text,
            "1x Plate (1 per 0s)\n  2x Ore (1 per 0s)\n    2x Plate (not expanded: cycle)\n  1x Coal (raw)\n"
        );

        tree.set_visibility(coal, false);
        assert!(!format_tree(&tree).contains("Coal"));
    }

    #[test]
    fn format_tree_always_prints_the_root() {
        let mut repo = MemoryRepository::new();
        let ore = repo.add_item("Ore", ItemType::Material);
        let plate = repo.add_item("Plate", ItemType::Material);
        repo.add_recipe(plate, 1, &[(ore, 3)]).unwrap();

        let mut tree = build_tree(&repo, plate, 2).unwrap();
        tree.set_visibility(plate, false);

        assert_eq!(format_tree(&tree), "2x Plate (1 per 0s)\n  6x Ore (raw)\n");
    }
}
