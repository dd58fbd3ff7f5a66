//! Data models for games, items, recipes and recipe trees

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownItemType;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

id_type!(GameId);
id_type!(ItemId);
id_type!(RecipeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Facility,
    Material,
    Other,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Facility => "FACILITY",
            ItemType::Material => "MATERIAL",
            ItemType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = UnknownItemType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FACILITY" => Ok(ItemType::Facility),
            "MATERIAL" => Ok(ItemType::Material),
            "OTHER" => Ok(ItemType::Other),
            _ => Err(UnknownItemType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub game_id: GameId,
    pub name: String,
    pub item_type: ItemType,
}

/// One line of an item listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListing {
    pub item: Item,
    pub has_recipe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMaterial {
    pub id: i64,
    pub material_item: Item,
    pub quantity: u32,
}

/// A crafting definition, owned by the item it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub item_id: ItemId,
    /// Seconds per craft cycle
    pub craft_time: u32,
    /// Units produced per craft cycle
    pub output_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_facility: Option<Item>,
    /// In declaration order
    pub materials: Vec<RecipeMaterial>,
}

/// Admin input for creating a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub item_id: ItemId,
    pub craft_time: u32,
    pub output_count: u32,
    pub required_facility_id: Option<ItemId>,
    pub materials: Vec<(ItemId, u32)>,
}

/// Why a node was cut off before its recipe was expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Truncation {
    /// The item is already an ancestor on this path
    Cycle,
    /// The node sits past the configured maximum depth
    DepthLimit,
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Truncation::Cycle => f.write_str("cycle"),
            Truncation::DepthLimit => f.write_str("depth limit"),
        }
    }
}

/// A node of an expanded recipe tree, built per request and never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeTreeNode {
    pub item: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Recipe>,
    /// One per recipe material, in material order
    pub children: Vec<RecipeTreeNode>,
    /// Quantity needed to satisfy one unit of the parent's requirement
    pub required_quantity: u64,
    pub is_expanded: bool,
    pub is_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<Truncation>,
}

impl RecipeTreeNode {
    /// An item with no recipe
    pub fn leaf(item: Item, required_quantity: u64) -> Self {
        Self {
            item,
            recipe: None,
            children: Vec::new(),
            required_quantity,
            is_expanded: true,
            is_visible: true,
            truncated: None,
        }
    }

    /// An item whose recipe was deliberately not expanded
    pub fn forced_leaf(item: Item, required_quantity: u64, reason: Truncation) -> Self {
        Self {
            is_expanded: false,
            truncated: Some(reason),
            ..Self::leaf(item, required_quantity)
        }
    }

    pub fn crafted(
        item: Item,
        recipe: Recipe,
        required_quantity: u64,
        children: Vec<RecipeTreeNode>,
    ) -> Self {
        Self {
            item,
            recipe: Some(recipe),
            children,
            required_quantity,
            is_expanded: true,
            is_visible: true,
            truncated: None,
        }
    }

    /// Number of levels, counting this node as one
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(RecipeTreeNode::depth)
            .max()
            .unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RecipeTreeNode::node_count).sum::<usize>()
    }

    /// Set the visibility of every node for `item`, returning how many changed.
    pub fn set_visibility(&mut self, item: ItemId, visible: bool) -> usize {
        let mut touched = 0;
        if self.item.id == item && self.is_visible != visible {
            self.is_visible = visible;
            touched += 1;
        }
        for child in &mut self.children {
            touched += child.set_visibility(item, visible);
        }
        touched
    }
}
