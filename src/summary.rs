//! Material totals for a recipe tree

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::models::{ItemId, RecipeTreeNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialTotal {
    pub item_name: String,
    pub total_quantity: u64,
}

/// One row of the flattened summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub item_id: ItemId,
    pub item_name: String,
    pub total_quantity: u64,
}

/// Total quantity per item, in first-visit depth-first order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialSummary {
    totals: IndexMap<ItemId, MaterialTotal>,
}

impl MaterialSummary {
    pub fn get(&self, item: ItemId) -> Option<&MaterialTotal> {
        self.totals.get(&item)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &MaterialTotal)> {
        self.totals.iter().map(|(id, total)| (*id, total))
    }

    pub fn rows(&self) -> Vec<SummaryRow> {
        self.iter()
            .map(|(item_id, total)| SummaryRow {
                item_id,
                item_name: total.item_name.clone(),
                total_quantity: total.total_quantity,
            })
            .collect()
    }
}

/// Sum the required quantity of every node reachable through visible nodes.
///
/// The root always counts. A hidden node drops out together with its whole
/// subtree, whatever the flags below it say.
pub fn aggregate(tree: &RecipeTreeNode) -> MaterialSummary {
    MaterialSummary {
        totals: accumulate(tree, IndexMap::new()),
    }
}

fn accumulate(
    node: &RecipeTreeNode,
    mut totals: IndexMap<ItemId, MaterialTotal>,
) -> IndexMap<ItemId, MaterialTotal> {
    if node.required_quantity > 0 {
        totals
            .entry(node.item.id)
            .and_modify(|t| t.total_quantity = t.total_quantity.saturating_add(node.required_quantity))
            .or_insert_with(|| MaterialTotal {
                item_name: node.item.name.clone(),
                total_quantity: node.required_quantity,
            });
    }

    node.children
        .iter()
        .filter(|child| child.is_visible)
        .fold(totals, |totals, child| accumulate(child, totals))
}

impl fmt::Display for MaterialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Material Summary ===")?;
        if self.is_empty() {
            return writeln!(f, "  (nothing required)");
        }

        let width = self
            .totals
            .values()
            .map(|t| t.item_name.len())
            .max()
            .unwrap_or(0);
        for total in self.totals.values() {
            writeln!(
                f,
                "  {:<width$}  {:>8}",
                total.item_name,
                total.total_quantity,
                width = width
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameId, Item, ItemType};

    fn node(id: i64, name: &str, quantity: u64, children: Vec<RecipeTreeNode>) -> RecipeTreeNode {
        let mut node = RecipeTreeNode::leaf(
            Item {
                id: ItemId(id),
                game_id: GameId(1),
                name: name.to_string(),
                item_type: ItemType::Material,
            },
            quantity,
        );
        node.children = children;
        node
    }

    fn totals(summary: &MaterialSummary) -> Vec<(&str, u64)> {
        summary
            .iter()
            .map(|(_, t)| (t.item_name.as_str(), t.total_quantity))
            .collect()
    }

    // R needs 2 A, each A needs 3 B
    fn chain() -> RecipeTreeNode {
        node(1, "R", 1, vec![node(2, "A", 2, vec![node(3, "B", 6, vec![])])])
    }

    #[test]
    fn counts_root_and_intermediates() {
        let summary = aggregate(&chain());
        assert_eq!(totals(&summary), [("R", 1), ("A", 2), ("B", 6)]);
    }

    #[test]
    fn hidden_node_drops_its_subtree() {
        let mut tree = chain();
        tree.children[0].is_visible = false;

        let summary = aggregate(&tree);
        assert_eq!(totals(&summary), [("R", 1)]);
    }

    #[test]
    fn visible_descendant_of_hidden_node_is_still_skipped() {
        let mut tree = chain();
        tree.children[0].is_visible = false;
        tree.children[0].children[0].is_visible = true;

        assert!(aggregate(&tree).get(ItemId(3)).is_none());
    }

    #[test]
    fn repeated_item_sums_into_first_visit_slot() {
        let tree = node(
            1,
            "R",
            1,
            vec![
                node(2, "A", 2, vec![node(3, "B", 6, vec![])]),
                node(4, "C", 1, vec![]),
                node(3, "B", 4, vec![]),
            ],
        );

        let summary = aggregate(&tree);
        assert_eq!(totals(&summary), [("R", 1), ("A", 2), ("B", 10), ("C", 1)]);
    }

    #[test]
    fn zero_quantity_nodes_are_left_out() {
        let tree = node(1, "R", 0, vec![node(2, "A", 0, vec![])]);
        assert!(aggregate(&tree).is_empty());
    }

    #[test]
    fn rows_follow_summary_order() {
        let rows = aggregate(&chain()).rows();
        let ids: Vec<_> = rows.iter().map(|r| r.item_id).collect();
        assert_eq!(ids, [ItemId(1), ItemId(2), ItemId(3)]);
        assert_eq!(rows[2].total_quantity, 6);
    }
}
