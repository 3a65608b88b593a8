//! Unit tests for Engine singleton manager
//!
//! Tests initialization, ResourceManager lifetime, and logging APIs.
//!
//! IMPORTANT: ENGINE_STATE is a global OnceLock shared across all tests.
//! All tests are marked with #[serial] to run sequentially and avoid RwLock poisoning.

use crate::ember3d::{Engine, Error, ResourceManagerConfig};
use crate::ember3d::log::{LogSeverity, MemoryLogger};
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::resource::{AssetKind, MemoryResourceLoader};
use crate::resource::test_fixtures;
use std::sync::Arc;
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Setup function to reset engine state before each test
///
/// Note: ENGINE_STATE is a OnceLock, so once initialized it stays initialized.
/// We always call initialize() (idempotent) and use reset_for_testing() to clear the RM.
fn setup() {
    Engine::reset_for_testing();
    let _ = Engine::initialize(); // Always initialize (idempotent)
}

fn create_default_manager() {
    Engine::create_resource_manager(MockGraphicsDevice::shared(), ResourceManagerConfig::default())
        .unwrap();
}

/// Entries logged by the engine itself (other tests may log concurrently)
fn engine_entries(logger: &MemoryLogger, severity: LogSeverity) -> usize {
    logger.entries()
        .iter()
        .filter(|entry| entry.severity == severity && entry.source == "ember3d::Engine")
        .count()
}

// ============================================================================
// INITIALIZATION AND SHUTDOWN TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_initialize() {
    setup();
    // Initialize is idempotent, so calling it again should succeed
    assert!(Engine::initialize().is_ok());
    assert!(Engine::initialize().is_ok());
}

#[test]
#[serial]
fn test_shutdown_clears_resource_manager() {
    setup();

    create_default_manager();
    assert!(Engine::resource_manager().is_ok());

    Engine::shutdown();

    assert!(!Engine::has_resource_manager());
    assert!(Engine::resource_manager().is_err());
}

#[test]
#[serial]
fn test_shutdown_idempotent() {
    setup();

    // Multiple shutdown calls should be safe
    Engine::shutdown();
    Engine::shutdown();
    Engine::shutdown();

    assert!(Engine::initialize().is_ok());
}

#[test]
#[serial]
fn test_reset_for_testing() {
    setup();
    create_default_manager();

    Engine::reset_for_testing();

    assert!(!Engine::has_resource_manager());
}

// ============================================================================
// RESOURCE MANAGER API TESTS
// ============================================================================

#[test]
#[serial]
fn test_create_resource_manager() {
    setup();

    create_default_manager();

    assert!(Engine::has_resource_manager());
    let rm = Engine::resource_manager().unwrap();
    assert_eq!(rm.lock().unwrap().asset_count(), 0);
    assert_eq!(rm.lock().unwrap().config().max_instances_per_draw, 32);
}

#[test]
#[serial]
fn test_create_resource_manager_twice_fails() {
    setup();
    create_default_manager();

    let result = Engine::create_resource_manager(
        MockGraphicsDevice::shared(),
        ResourceManagerConfig::default(),
    );

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
#[serial]
fn test_resource_manager_before_create_fails() {
    setup();

    assert!(matches!(Engine::resource_manager(), Err(Error::InitializationFailed(_))));
}

#[test]
#[serial]
fn test_resource_manager_handles_share_registry() {
    setup();
    create_default_manager();

    let loader = MemoryResourceLoader::new()
        .with_file(AssetKind::Texture, "stone.png", test_fixtures::png(2, 2));

    let first = Engine::resource_manager().unwrap();
    let second = Engine::resource_manager().unwrap();
    first.lock().unwrap().attach_resource_loader(Arc::new(loader));
    let id = first.lock().unwrap().open_texture("stone.png").unwrap();

    assert_eq!(second.lock().unwrap().access_asset("stone.png"), Some(id));
}

#[test]
#[serial]
fn test_destroy_releases_every_asset() {
    setup();
    create_default_manager();

    let loader = MemoryResourceLoader::new()
        .with_file(AssetKind::Texture, "stone.png", test_fixtures::png(2, 2));
    let rm = Engine::resource_manager().unwrap();
    rm.lock().unwrap().attach_resource_loader(Arc::new(loader));
    rm.lock().unwrap().open_texture("stone.png").unwrap();
    rm.lock().unwrap().open_texture("stone.png").unwrap();

    Engine::destroy_resource_manager().unwrap();

    // A handle kept across destruction sees an empty registry
    assert_eq!(rm.lock().unwrap().asset_count(), 0);
    assert!(Engine::resource_manager().is_err());

    // Can be created again afterwards
    create_default_manager();
    assert!(Engine::has_resource_manager());
}

#[test]
#[serial]
fn test_destroy_without_manager_is_ok() {
    setup();
    assert!(Engine::destroy_resource_manager().is_ok());
}

// ============================================================================
// LOGGING API TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_captures_engine_errors() {
    setup();
    let logger = MemoryLogger::new();
    Engine::set_logger(logger.clone());

    let _ = Engine::resource_manager();

    assert!(engine_entries(&logger, LogSeverity::Error) >= 1);
    let entry = logger.entries()
        .into_iter()
        .find(|entry| entry.source == "ember3d::Engine" && entry.severity == LogSeverity::Error)
        .unwrap();
    assert!(entry.file.is_some());
    assert!(entry.line.is_some());

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_log_routes_to_logger() {
    setup();
    let logger = MemoryLogger::new();
    Engine::set_logger(logger.clone());

    Engine::log(LogSeverity::Info, "ember3d::Engine", "hello".to_string());
    Engine::log_detailed(LogSeverity::Warn, "ember3d::Engine", "careful".to_string(), "engine.rs", 7);

    let entries: Vec<_> = logger.entries()
        .into_iter()
        .filter(|entry| entry.source == "ember3d::Engine")
        .collect();
    assert!(entries.iter().any(|e| e.message == "hello" && e.file.is_none()));
    assert!(entries.iter().any(|e| e.message == "careful" && e.line == Some(7)));

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    setup();
    let logger = MemoryLogger::new();
    Engine::set_logger(logger.clone());
    Engine::reset_logger();

    Engine::log(LogSeverity::Debug, "ember3d::Engine", "not captured".to_string());

    assert!(logger.entries().iter().all(|entry| entry.message != "not captured"));
}
