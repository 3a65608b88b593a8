/// Unit tests for resource_manager.rs
///
/// Assets are served by a MemoryResourceLoader and created on a
/// MockGraphicsDevice.

use std::sync::{Arc, Mutex};

use glam::Mat4;

use crate::camera::Camera;
use crate::error::Error;
use crate::graphics_device::{GraphicsDevice, ShaderStage};
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::resource::asset::{AssetId, AssetKind};
use crate::resource::material::ParamValue;
use crate::resource::resource_loader::MemoryResourceLoader;
use crate::resource::resource_manager::*;
use crate::resource::test_fixtures::{self, THREE_CHARS};
use crate::resource::texture::Texture;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn loader() -> MemoryResourceLoader {
    MemoryResourceLoader::new()
        .with_file(AssetKind::Texture, "stone.png", test_fixtures::png(4, 4))
        .with_file(AssetKind::Texture, "arial_0.png", test_fixtures::png(8, 8))
        .with_file(AssetKind::Texture, "broken.png", b"not an image".to_vec())
        .with_file(AssetKind::Model, "triangle.glb", test_fixtures::glb(&[test_fixtures::triangle_mesh()]))
        .with_file(AssetKind::Model, "quad.glb", test_fixtures::glb(&[test_fixtures::quad_mesh()]))
        .with_file(AssetKind::Model, "broken.glb", b"glTF but not really".to_vec())
        .with_file(AssetKind::Shader, "basic.hlsl", b"float4 main() : SV_Target { return 1; }".to_vec())
        .with_file(AssetKind::Font, "arial.fnt", test_fixtures::bmfont_xml(&["arial_0.png"], THREE_CHARS))
        .with_file(
            AssetKind::Font,
            "two_pages.fnt",
            test_fixtures::bmfont_xml(&["arial_0.png", "missing.png"], THREE_CHARS),
        )
        .with_file(
            AssetKind::Material,
            "stone.mat",
            test_fixtures::material_xml("basic.hlsl", "basic.hlsl", Some("stone.png")),
        )
        .with_file(
            AssetKind::Material,
            "broken.mat",
            test_fixtures::material_xml("basic.hlsl", "basic.hlsl", Some("missing.png")),
        )
}

fn create_manager(config: ResourceManagerConfig) -> (Arc<Mutex<MockGraphicsDevice>>, ResourceManager) {
    let mock = MockGraphicsDevice::shared();
    let device: Arc<Mutex<dyn GraphicsDevice>> = mock.clone();
    let mut manager = ResourceManager::new(device, config);
    manager.attach_resource_loader(Arc::new(loader()));
    (mock, manager)
}

fn manager() -> ResourceManager {
    create_manager(ResourceManagerConfig::default()).1
}

fn procedural_texture(manager: &ResourceManager, name: &str) -> Texture {
    Texture::from_rgba8(name, 2, 2, vec![255; 16], manager.graphics_device()).unwrap()
}

fn stale_id() -> AssetId {
    let mut manager = manager();
    let id = manager.open_texture("stone.png").unwrap();
    manager.release_asset(id);
    id
}

// ============================================================================
// CONFIG / LOADER TESTS
// ============================================================================

#[test]
fn test_default_config() {
    let config = ResourceManagerConfig::default();
    assert_eq!(config.max_instances_per_draw, 32);
    assert_eq!(config.post_process, crate::resource::scene_import::PostProcess::MODEL_DEFAULT);
}

#[test]
fn test_open_without_loader_fails() {
    let mut manager = ResourceManager::new(MockGraphicsDevice::shared(), ResourceManagerConfig::default());

    assert!(!manager.has_resource_loader());
    assert!(matches!(manager.open_texture("stone.png"), Err(Error::InitializationFailed(_))));
    assert_eq!(manager.asset_count(), 0);
}

#[test]
fn test_replacing_loader_keeps_loaded_assets() {
    let mut manager = manager();
    let id = manager.open_texture("stone.png").unwrap();

    manager.attach_resource_loader(Arc::new(MemoryResourceLoader::new()));

    assert!(manager.texture(id).is_some());
    // Still a hit, the new loader is not consulted
    assert_eq!(manager.open_texture("stone.png").unwrap(), id);
    assert!(matches!(manager.open_model("triangle.glb"), Err(Error::NotFound(_))));
}

// ============================================================================
// OPEN / DEDUPLICATION TESTS
// ============================================================================

#[test]
fn test_repeated_open_returns_same_id() {
    let mut manager = manager();

    let first = manager.open_texture("stone.png").unwrap();
    let second = manager.open_texture("stone.png").unwrap();
    let third = manager.open_texture("stone.png").unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(manager.ref_count(first), Some(3));
    assert_eq!(manager.asset_count(), 1);

    assert!(!manager.release_asset(first));
    assert_eq!(manager.ref_count(first), Some(2));
}

#[test]
fn test_release_to_zero_unregisters() {
    let mut manager = manager();
    let id = manager.open_texture("stone.png").unwrap();
    manager.increment_asset_ref(id);

    assert!(!manager.decrement_asset_ref(id));
    assert!(manager.decrement_asset_ref(id));

    assert_eq!(manager.access_asset("stone.png"), None);
    assert!(!manager.contains("stone.png"));
    assert!(manager.texture(id).is_none());
    assert_eq!(manager.ref_count(id), None);
}

#[test]
fn test_reopen_after_destroy_gives_new_id() {
    let mut manager = manager();
    let first = manager.open_texture("stone.png").unwrap();
    manager.release_asset(first);

    let second = manager.open_texture("stone.png").unwrap();
    assert_ne!(first, second);
    assert!(manager.asset(first).is_none());
}

#[test]
fn test_open_texture_reads_dimensions() {
    let (mock, mut manager) = create_manager(ResourceManagerConfig::default());
    let id = manager.open_texture("stone.png").unwrap();

    let texture = manager.texture(id).unwrap();
    assert_eq!((texture.width(), texture.height()), (4, 4));
    assert_eq!(mock.lock().unwrap().created_textures().len(), 1);
    assert_eq!(manager.asset_name(id), Some("stone.png"));
}

#[test]
fn test_open_missing_file_registers_nothing() {
    let mut manager = manager();

    assert!(matches!(manager.open_texture("nope.png"), Err(Error::NotFound(_))));
    assert!(matches!(manager.open_texture("broken.png"), Err(Error::MalformedResource(_))));
    assert!(matches!(manager.open_model("broken.glb"), Err(Error::MalformedResource(_))));
    assert_eq!(manager.asset_count(), 0);
    assert_eq!(manager.num_loaded_models(), 0);
}

#[test]
fn test_hit_of_other_kind_is_rejected() {
    let mut manager = manager();
    let id = manager.map_asset("shared.name", procedural_texture(&manager, "shared.name")).unwrap();

    let result = manager.open_model("shared.name");
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(manager.ref_count(id), Some(1));
}

#[test]
fn test_shader_name_includes_stage() {
    let mut manager = manager();

    let vertex = manager.open_shader("basic.hlsl", ShaderStage::Vertex).unwrap();
    let pixel = manager.open_shader("basic.hlsl", ShaderStage::Pixel).unwrap();

    assert_ne!(vertex, pixel);
    assert_eq!(manager.access_asset("basic.hlsl:vertex"), Some(vertex));
    assert_eq!(manager.access_asset("basic.hlsl:pixel"), Some(pixel));
    assert_eq!(manager.shader(pixel).unwrap().entry_point(), "ps_main");
}

// ============================================================================
// MAP ASSET TESTS
// ============================================================================

#[test]
fn test_map_asset() {
    let mut manager = manager();
    let id = manager.map_asset("checker", procedural_texture(&manager, "checker")).unwrap();

    assert_eq!(manager.access_asset("checker"), Some(id));
    assert_eq!(manager.ref_count(id), Some(1));
    assert_eq!(manager.asset(id).unwrap().kind(), AssetKind::Texture);
}

#[test]
fn test_map_asset_name_collision_is_rejected() {
    let mut manager = manager();
    let original = manager.open_texture("stone.png").unwrap();

    let result = manager.map_asset("stone.png", procedural_texture(&manager, "stone.png"));

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(manager.access_asset("stone.png"), Some(original));
    assert_eq!(manager.texture(original).unwrap().width(), 4);
    assert_eq!(manager.ref_count(original), Some(1));
}

// ============================================================================
// REFERENCE COUNTING CONTRACT TESTS
// ============================================================================

#[test]
fn test_release_stale_id_is_ignored() {
    let mut manager = manager();
    assert!(!manager.release_asset(stale_id()));
}

#[test]
#[should_panic(expected = "not registered")]
fn test_increment_stale_id_panics() {
    let mut manager = manager();
    manager.increment_asset_ref(stale_id());
}

#[test]
#[should_panic(expected = "not registered")]
fn test_decrement_stale_id_panics() {
    let mut manager = manager();
    manager.decrement_asset_ref(stale_id());
}

// ============================================================================
// MODEL LIST TESTS
// ============================================================================

#[test]
fn test_model_list_follows_registry() {
    let mut manager = manager();
    let triangle = manager.open_model("triangle.glb").unwrap();
    let quad = manager.open_model("quad.glb").unwrap();
    manager.open_model("triangle.glb").unwrap();

    assert_eq!(manager.num_loaded_models(), 2);
    assert_eq!(manager.model_asset_id(0), triangle);
    assert_eq!(manager.model_asset(1).name(), "quad");

    manager.release_asset(triangle);
    assert_eq!(manager.num_loaded_models(), 2);

    manager.release_asset(triangle);
    assert_eq!(manager.num_loaded_models(), 1);
    assert_eq!(manager.model_asset_id(0), quad);
}

#[test]
#[should_panic(expected = "out of bounds")]
fn test_model_asset_out_of_bounds_panics() {
    let mut manager = manager();
    manager.open_model("triangle.glb").unwrap();
    manager.model_asset(1);
}

// ============================================================================
// FONT TESTS
// ============================================================================

#[test]
fn test_open_font_opens_pages() {
    let mut manager = manager();
    let id = manager.open_font("arial.fnt").unwrap();

    let font = manager.font(id).unwrap();
    assert_eq!(font.char_count(), 3);
    assert_eq!(font.line_height(), 32.0);

    let page = font.page_texture(0).unwrap();
    assert_eq!(font.page_texture(1), None);
    assert_eq!(manager.access_asset("arial_0.png"), Some(page));
    assert_eq!(manager.ref_count(page), Some(1));
}

#[test]
fn test_failed_font_page_is_absent() {
    let mut manager = manager();
    let id = manager.open_font("two_pages.fnt").unwrap();

    let font = manager.font(id).unwrap();
    assert_eq!(font.page_count(), 2);
    assert!(font.page_texture(0).is_some());
    assert_eq!(font.page_texture(1), None);
}

#[test]
fn test_font_pages_shared_and_released() {
    let mut manager = manager();
    let first = manager.open_font("arial.fnt").unwrap();
    let second = manager.open_font("two_pages.fnt").unwrap();
    let page = manager.access_asset("arial_0.png").unwrap();
    assert_eq!(manager.ref_count(page), Some(2));

    assert!(manager.release_asset(first));
    assert_eq!(manager.ref_count(page), Some(1));

    assert!(manager.release_asset(second));
    assert_eq!(manager.ref_count(page), None);
    assert_eq!(manager.asset_count(), 0);
}

// ============================================================================
// MATERIAL TESTS
// ============================================================================

#[test]
fn test_open_material_takes_references() {
    let mut manager = manager();
    let id = manager.open_material("stone.mat").unwrap();

    let material = manager.material(id).unwrap();
    let vertex = material.vertex_shader();
    let texture = material.texture("diffuse").unwrap();
    assert_eq!(material.param("tint"), Some(&ParamValue::Vec4([1.0; 4])));
    assert_eq!(material.binding().textures.len(), 1);

    assert_eq!(manager.ref_count(vertex), Some(1));
    assert_eq!(manager.ref_count(texture), Some(1));
    assert_eq!(manager.asset_count(), 4);

    assert!(manager.release_asset(id));
    assert_eq!(manager.asset_count(), 0);
}

#[test]
fn test_failed_material_releases_partial_references() {
    let mut manager = manager();
    let shader = manager.open_shader("basic.hlsl", ShaderStage::Vertex).unwrap();

    let result = manager.open_material("broken.mat");

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(!manager.contains("broken.mat"));
    assert!(!manager.contains("basic.hlsl:pixel"));
    assert_eq!(manager.ref_count(shader), Some(1));
    assert_eq!(manager.asset_count(), 1);
}

// ============================================================================
// RENDER TESTS
// ============================================================================

#[test]
fn test_render_model_with_material() {
    let config = ResourceManagerConfig { max_instances_per_draw: 8, ..Default::default() };
    let (mock, mut manager) = create_manager(config);
    let model = manager.open_model("quad.glb").unwrap();
    let material = manager.open_material("stone.mat").unwrap();
    manager.set_model_material(model, Some(material)).unwrap();

    for _ in 0..10 {
        manager.batch_model(model, Mat4::IDENTITY).unwrap();
    }
    let draws = manager.render_model(model, &Camera::default()).unwrap();

    assert_eq!(draws, 2);
    assert_eq!(manager.model(model).unwrap().pending_instances(), 0);
    // The model does not own its material
    assert_eq!(manager.ref_count(material), Some(1));

    let mock = mock.lock().unwrap();
    let recorded = mock.draws();
    assert_eq!(recorded.iter().map(|d| d.instance_count).collect::<Vec<_>>(), vec![8, 2]);
    assert_eq!(recorded[0].texture_count, 1);
    assert_eq!(recorded[0].index_count, 6);
    assert!(recorded[0].param_names.contains(&"tint".to_string()));
}

#[test]
fn test_render_model_without_material_fails() {
    let mut manager = manager();
    let model = manager.open_model("triangle.glb").unwrap();
    manager.batch_model(model, Mat4::IDENTITY).unwrap();

    assert!(matches!(manager.render_model(model, &Camera::default()), Err(Error::InvalidResource(_))));
}

#[test]
fn test_set_model_material_checks_kinds() {
    let mut manager = manager();
    let model = manager.open_model("triangle.glb").unwrap();
    let texture = manager.open_texture("stone.png").unwrap();

    assert!(manager.set_model_material(model, Some(texture)).is_err());
    assert!(manager.set_model_material(texture, None).is_err());
    assert!(manager.batch_model(texture, Mat4::IDENTITY).is_err());
    assert_eq!(manager.model(model).unwrap().material(), None);
}

// ============================================================================
// DIAGNOSTICS / RELEASE ALL TESTS
// ============================================================================

#[test]
fn test_loaded_report_sorted_by_name() {
    let mut manager = manager();
    manager.open_texture("stone.png").unwrap();
    manager.open_texture("stone.png").unwrap();
    manager.open_model("quad.glb").unwrap();

    let report = manager.loaded_report();
    let lines: Vec<&str> = report.lines().collect();

    assert_eq!(lines[0], "2 assets loaded");
    assert_eq!(lines[1].trim(), "quad.glb [model] refs=1");
    assert_eq!(lines[2].trim(), "stone.png [texture] refs=2");
}

#[test]
fn test_release_all() {
    let mut manager = manager();
    let texture = manager.open_texture("stone.png").unwrap();
    manager.open_font("arial.fnt").unwrap();
    manager.open_model("triangle.glb").unwrap();

    manager.release_all();

    assert_eq!(manager.asset_count(), 0);
    assert_eq!(manager.num_loaded_models(), 0);
    assert_eq!(manager.ref_count(texture), None);
    assert!(!manager.contains("arial.fnt"));
}
