//! Integration tests for the Zoondo stack
//!
//! Tests the catalog file as the server loads it, driven through the engine

use std::path::PathBuf;
use std::sync::Arc;

use zoondo_core::{
    ActionInput, ActionType, Capabilities, CardCatalog, CardRef, Game, GameConfig, Phase, PlayerInfo, Pos,
};
use zoondo_server::ServerConfig;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn catalog_file() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../zoondo-core/assets/sample_catalog.json")
}

fn file_config() -> ServerConfig {
    ServerConfig {
        catalog_path: Some(catalog_file()),
        ..ServerConfig::default()
    }
}

fn info(id: &str, tribe: &str, row: &[&str]) -> PlayerInfo {
    PlayerInfo {
        id: id.to_string(),
        name: id.to_string(),
        tribe: tribe.to_string(),
        disposition: vec![row.iter().map(|slug| slug.to_string()).collect()],
    }
}

fn game(catalog: Arc<dyn CardCatalog>, seed: u64) -> Game {
    let mut game = Game::new(
        "game-cli",
        &info("alice", "sylvan", &["emblem", "guard", "brute"]),
        catalog,
        Arc::new(Capabilities::builtin()),
        GameConfig::default().with_seed(seed),
    )
    .unwrap();
    game.join(&info("bob", "ember", &["emblem"])).unwrap();
    game
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_catalog_file_loads() {
    let catalog = file_config().load_catalog().unwrap();
    assert!(catalog.tribe("sylvan").is_some());
    assert!(catalog.tribe("ember").is_some());
    assert!(catalog.card(&CardRef::fighter("sylvan", "emblem")).is_some());
}

#[test]
fn test_missing_catalog_file_fails() {
    let config = ServerConfig {
        catalog_path: Some(PathBuf::from("/nonexistent/catalog.json")),
        ..ServerConfig::default()
    };
    let err = config.load_catalog().err().unwrap();
    assert!(err.to_string().contains("Failed to read catalog"));
}

#[test]
fn test_rearrange_from_file_catalog() {
    let catalog = file_config().load_catalog().unwrap();
    let mut game = (0..64)
        .map(|seed| game(catalog.clone(), seed))
        .find(|g| g.turn().is_active("alice"))
        .unwrap();
    let rearrange = CardRef::trump("sylvan", "rearrange");

    game.trump("alice", &rearrange).unwrap();
    assert_eq!(game.turn().phase, Phase::Action);
    game.resolve_action("alice", ActionType::SelectCell, ActionInput::Cell(Pos::new(1, 0)), false)
        .unwrap();
    game.resolve_action("alice", ActionType::SelectCell, ActionInput::Cell(Pos::new(2, 0)), false)
        .unwrap();

    assert_eq!(game.board().get(Pos::new(1, 0)).unwrap().card.slug, "brute");
    assert_eq!(game.board().get(Pos::new(2, 0)).unwrap().card.slug, "guard");
    assert!(!game.player("alice").unwrap().trumps.contains(&rearrange));
    assert!(game.turn().is_active("bob"));
}
