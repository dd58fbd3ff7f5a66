//! Tests for recipe tree reports over the SQLite store and sample data

use rusqlite::Connection;
use serde_json::{Value, json};

use craft_tree::db;
use craft_tree::models::{ItemId, RecipeDraft, RecipeId, Truncation};
use craft_tree::report::{TreeReport, tree_for_recipe};
use craft_tree::sample::load_sample;
use craft_tree::tree::DEFAULT_MAX_DEPTH;
use craft_tree::{CraftError, aggregate};

fn sample_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    load_sample(&conn).unwrap();
    conn
}

fn item_id(conn: &Connection, name: &str) -> ItemId {
    let game = db::list_games(conn).unwrap()[0].id;
    db::find_item_by_name(conn, game, name).unwrap().unwrap().id
}

fn recipe_of(conn: &Connection, name: &str) -> RecipeId {
    db::find_recipe_by_item(conn, item_id(conn, name))
        .unwrap()
        .unwrap()
        .id
}

fn summary_pairs(report: &TreeReport) -> Vec<(&str, u64)> {
    report
        .material_summary
        .iter()
        .map(|row| (row.item_name.as_str(), row.total_quantity))
        .collect()
}

#[test]
fn given_sample_when_loading_then_every_recipe_is_stored() {
    // Arrange
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();

    // Act
    let stats = load_sample(&conn).unwrap();

    // Assert
    let listed = db::list_items(&conn, stats.game.id, None).unwrap();
    assert_eq!(listed.len(), stats.items);
    assert_eq!(listed.iter().filter(|l| l.has_recipe).count(), stats.recipes);
}

#[test]
fn given_sample_loaded_twice_when_listing_then_not_duplicated() {
    // Arrange
    let conn = sample_db();

    // Act
    load_sample(&conn).unwrap();

    // Assert
    assert_eq!(db::list_games(&conn).unwrap().len(), 1);
}

#[test]
fn given_motor_recipe_when_building_report_then_totals_follow_dfs_order() {
    // Arrange
    let conn = sample_db();
    let motor = recipe_of(&conn, "Motor");

    // Act
    let tree = tree_for_recipe(&conn, motor, 1, DEFAULT_MAX_DEPTH).unwrap();
    let report = TreeReport::from_tree(tree);

    // Assert
    assert_eq!(
        summary_pairs(&report),
        [
            ("Motor", 1),
            ("Steel", 1),
            ("Iron Plate", 7),
            ("Iron Ore", 7),
            ("Coal", 1),
            ("Circuit", 2),
            ("Copper Wire", 10),
            ("Copper Plate", 5),
            ("Copper Ore", 5),
        ]
    );
}

#[test]
fn given_quantity_when_building_report_then_totals_scale_with_rounding() {
    // Arrange
    let conn = sample_db();
    let wire = recipe_of(&conn, "Copper Wire");

    // Act: 3 wire at 2 per cycle takes 2 cycles
    let tree = tree_for_recipe(&conn, wire, 3, DEFAULT_MAX_DEPTH).unwrap();

    // Assert
    let report = TreeReport::from_tree(tree);
    assert_eq!(
        summary_pairs(&report),
        [("Copper Wire", 3), ("Copper Plate", 2), ("Copper Ore", 2)]
    );
}

#[test]
fn given_updated_recipe_when_building_report_then_tree_follows_new_materials() {
    // Arrange: Copper Wire now yields 1 per cycle and also needs Coal
    let conn = sample_db();
    let wire = item_id(&conn, "Copper Wire");
    let recipe = recipe_of(&conn, "Copper Wire");
    db::update_recipe(
        &conn,
        recipe,
        &RecipeDraft {
            item_id: wire,
            craft_time: 2,
            output_count: 1,
            required_facility_id: Some(item_id(&conn, "Assembler")),
            materials: vec![
                (item_id(&conn, "Copper Plate"), 1),
                (item_id(&conn, "Coal"), 1),
            ],
        },
    )
    .unwrap();

    // Act
    let tree = tree_for_recipe(&conn, recipe, 3, DEFAULT_MAX_DEPTH).unwrap();
    let report = TreeReport::from_tree(tree);

    // Assert
    assert_eq!(report.tree.children.len(), 2);
    assert_eq!(
        summary_pairs(&report),
        [
            ("Copper Wire", 3),
            ("Copper Plate", 3),
            ("Copper Ore", 3),
            ("Coal", 3)
        ]
    );
}

#[test]
fn given_hidden_circuit_when_building_report_then_its_subtree_is_left_out() {
    // Arrange
    let conn = sample_db();
    let motor = recipe_of(&conn, "Motor");
    let mut tree = tree_for_recipe(&conn, motor, 1, DEFAULT_MAX_DEPTH).unwrap();

    // Act
    tree.set_visibility(item_id(&conn, "Circuit"), false);
    let report = TreeReport::from_tree(tree);

    // Assert
    assert_eq!(
        summary_pairs(&report),
        [
            ("Motor", 1),
            ("Steel", 1),
            ("Iron Plate", 5),
            ("Iron Ore", 5),
            ("Coal", 1),
            ("Copper Wire", 4),
            ("Copper Plate", 2),
            ("Copper Ore", 2),
        ]
    );
    assert!(!report.render_text().contains("Circuit"));
}

#[test]
fn given_crystal_cycle_when_building_report_then_cycle_is_cut_and_counted() {
    // Arrange
    let conn = sample_db();
    let crystal = recipe_of(&conn, "Crystal");

    // Act
    let tree = tree_for_recipe(&conn, crystal, 1, DEFAULT_MAX_DEPTH).unwrap();

    // Assert
    let repeated = &tree.children[0].children[0];
    assert_eq!(repeated.item.name, "Crystal");
    assert_eq!(repeated.truncated, Some(Truncation::Cycle));

    let summary = aggregate(&tree);
    let crystal_total = summary.get(tree.item.id).unwrap();
    assert_eq!(crystal_total.total_quantity, 2);
    assert_eq!(summary.len(), 3);
}

#[test]
fn given_report_when_serializing_then_matches_response_shape() {
    // Arrange
    let conn = sample_db();
    let crystal = recipe_of(&conn, "Crystal");
    let tree = tree_for_recipe(&conn, crystal, 1, DEFAULT_MAX_DEPTH).unwrap();
    let crystal_id = tree.item.id;

    // Act
    let value: Value = serde_json::to_value(TreeReport::from_tree(tree)).unwrap();

    // Assert
    let root = &value["tree"];
    assert_eq!(root["item"]["name"], "Crystal");
    assert_eq!(root["item"]["itemType"], "MATERIAL");
    assert_eq!(root["requiredQuantity"], 1);
    assert_eq!(root["isExpanded"], true);
    assert_eq!(root["isVisible"], true);
    assert_eq!(root["recipe"]["outputCount"], 2);
    assert_eq!(root["recipe"]["materials"][0]["materialItem"]["name"], "Crystal Seed");
    assert!(root.get("truncated").is_none());

    let repeated = &root["children"][0]["children"][0];
    assert_eq!(repeated["truncated"], "cycle");
    assert!(repeated.get("recipe").is_none());
    assert_eq!(repeated["children"], json!([]));

    assert_eq!(
        value["materialSummary"][0],
        json!({ "itemId": crystal_id.0, "itemName": "Crystal", "totalQuantity": 2 })
    );
}

#[test]
fn given_low_max_depth_when_building_report_then_tree_is_cut_short() {
    // Arrange
    let conn = sample_db();
    let motor = recipe_of(&conn, "Motor");

    // Act
    let tree = tree_for_recipe(&conn, motor, 1, 1).unwrap();

    // Assert
    assert_eq!(tree.depth(), 3);
    let steel = &tree.children[0];
    assert!(steel.is_expanded);
    assert_eq!(steel.children[0].truncated, Some(Truncation::DepthLimit));
}

#[test]
fn given_unknown_recipe_when_building_report_then_not_found() {
    // Arrange
    let conn = sample_db();

    // Act
    let err = tree_for_recipe(&conn, RecipeId(9999), 1, DEFAULT_MAX_DEPTH).unwrap_err();

    // Assert
    assert!(matches!(err, CraftError::RecipeNotFound(RecipeId(9999))));
    assert!(err.is_not_found());
}
