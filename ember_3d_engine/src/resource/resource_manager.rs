/// Central resource manager for the engine.
///
/// Registry of every loaded asset. Assets are deduplicated by name: opening
/// an already registered name returns the existing id and adds a reference.
/// Each release drops one reference and the asset is destroyed when none
/// remain, together with the references it held on its dependencies (font
/// pages, material shaders and textures).
///
/// Files are read through the attached `ResourceLoader`; scene files are
/// decoded by the `SceneImporter` (glTF by default).

use std::sync::{Arc, Mutex};

use glam::Mat4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::camera::Camera;
use crate::engine_err;
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, ShaderStage};
use crate::resource::asset::{Asset, AssetId, AssetKind};
use crate::resource::bmfont::{BMFont, BMFontFile};
use crate::resource::material::{
    Material, MaterialBinding, MaterialDesc, MaterialFile, MaterialTextureSlot,
};
use crate::resource::model::Model;
use crate::resource::resource_loader::{ResourceFile, ResourceLoader};
use crate::resource::scene_import::{GltfSceneImporter, PostProcess, SceneImporter};
use crate::resource::shader::Shader;
use crate::resource::texture::Texture;

// ===== CONFIGURATION =====

/// Resource manager settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceManagerConfig {
    /// Upper bound of instances per model draw call
    pub max_instances_per_draw: usize,
    /// Post-processing applied to imported scene files
    pub post_process: PostProcess,
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            max_instances_per_draw: 32,
            post_process: PostProcess::MODEL_DEFAULT,
        }
    }
}

// ===== REGISTRY =====

struct AssetEntry {
    name: String,
    ref_count: u32,
    asset: Asset,
}

/// Registry of loaded assets
pub struct ResourceManager {
    graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
    config: ResourceManagerConfig,
    loader: Option<Arc<dyn ResourceLoader>>,
    importer: Arc<dyn SceneImporter>,
    assets: SlotMap<AssetId, AssetEntry>,
    names: FxHashMap<String, AssetId>,
    /// Registered models in insertion order
    models: Vec<AssetId>,
}

impl ResourceManager {
    /// Create an empty manager creating GPU objects on `graphics_device`
    ///
    /// A loader must be attached before any `open_*` call.
    pub fn new(graphics_device: Arc<Mutex<dyn GraphicsDevice>>, config: ResourceManagerConfig) -> Self {
        Self {
            graphics_device,
            config,
            loader: None,
            importer: Arc::new(GltfSceneImporter::new()),
            assets: SlotMap::with_key(),
            names: FxHashMap::default(),
            models: Vec::new(),
        }
    }

    pub fn graphics_device(&self) -> &Arc<Mutex<dyn GraphicsDevice>> {
        &self.graphics_device
    }

    pub fn config(&self) -> &ResourceManagerConfig {
        &self.config
    }

    /// Install the loader used by subsequent `open_*` calls
    ///
    /// Replaces any previous loader. Loaded assets are unaffected.
    pub fn attach_resource_loader(&mut self, loader: Arc<dyn ResourceLoader>) {
        if self.loader.replace(loader).is_some() {
            crate::engine_debug!("ember3d::ResourceManager", "Resource loader replaced");
        }
    }

    pub fn has_resource_loader(&self) -> bool {
        self.loader.is_some()
    }

    /// Replace the scene-file decoder used by `open_model`
    pub fn set_scene_importer(&mut self, importer: Arc<dyn SceneImporter>) {
        self.importer = importer;
    }

    // ===== OPEN =====

    /// Open (or add a reference to) the texture at `path`
    pub fn open_texture(&mut self, path: &str) -> Result<AssetId> {
        if let Some(id) = self.lookup(path, AssetKind::Texture)? {
            return Ok(id);
        }

        let texture = self.read(path, AssetKind::Texture)
            .and_then(|file| Texture::import(&file, &self.graphics_device))
            .map_err(|e| Self::open_failed(path, AssetKind::Texture, e))?;

        Ok(self.insert(path.to_string(), texture.into()))
    }

    /// Open (or add a reference to) the `stage` shader at `path`
    ///
    /// The registry name is `"{path}:{stage}"`, so one source file can be
    /// opened for several stages.
    pub fn open_shader(&mut self, path: &str, stage: ShaderStage) -> Result<AssetId> {
        let name = format!("{}:{}", path, stage);
        if let Some(id) = self.lookup(&name, AssetKind::Shader)? {
            return Ok(id);
        }

        let shader = self.read(path, AssetKind::Shader)
            .and_then(|file| Shader::import(&file, stage, &self.graphics_device))
            .map_err(|e| Self::open_failed(path, AssetKind::Shader, e))?;

        Ok(self.insert(name, shader.into()))
    }

    /// Open (or add a reference to) the model at `path`
    pub fn open_model(&mut self, path: &str) -> Result<AssetId> {
        if let Some(id) = self.lookup(path, AssetKind::Model)? {
            return Ok(id);
        }

        let model = self.read(path, AssetKind::Model)
            .and_then(|file| Model::import(&file, self.importer.as_ref(), &self.graphics_device, &self.config))
            .map_err(|e| Self::open_failed(path, AssetKind::Model, e))?;

        Ok(self.insert(path.to_string(), model.into()))
    }

    /// Open (or add a reference to) the BMFont at `path`
    ///
    /// Page textures are opened relative to the font file. Each page is
    /// registered under the font file's directory joined with the page file
    /// name; with `FileSystemResourceLoader` that is an absolute path, so a
    /// later `open_texture` with a relative path is a different asset. Open
    /// the page through that joined path to share it. A page that fails to
    /// load is logged and recorded as absent; the font still loads.
    pub fn open_font(&mut self, path: &str) -> Result<AssetId> {
        if let Some(id) = self.lookup(path, AssetKind::Font)? {
            return Ok(id);
        }

        let (file, font_file) = self.read(path, AssetKind::Font)
            .and_then(|file| BMFontFile::parse(&file.bytes).map(|parsed| (file, parsed)))
            .map_err(|e| Self::open_failed(path, AssetKind::Font, e))?;

        let directory = file.directory().to_path_buf();
        let page_textures = font_file.pages.iter()
            .map(|page| {
                let page_path = directory.join(&page.file);
                let page_path = page_path.to_string_lossy();
                match self.open_texture(&page_path) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        crate::engine_warn!("ember3d::ResourceManager",
                            "Font '{}': page {} ('{}') not loaded: {}", path, page.id, page_path, e);
                        None
                    }
                }
            })
            .collect();

        let font = BMFont::new(file.path, font_file, page_textures);
        Ok(self.insert(path.to_string(), font.into()))
    }

    /// Open (or add a reference to) the material at `path`
    ///
    /// The material's shaders and textures are opened through this manager
    /// and the material owns those references. If anything fails, the
    /// references already taken are released and nothing is registered.
    pub fn open_material(&mut self, path: &str) -> Result<AssetId> {
        if let Some(id) = self.lookup(path, AssetKind::Material)? {
            return Ok(id);
        }

        let (file, material_file) = self.read(path, AssetKind::Material)
            .and_then(|file| MaterialFile::parse(&file.bytes).map(|parsed| (file, parsed)))
            .map_err(|e| Self::open_failed(path, AssetKind::Material, e))?;

        let mut taken = Vec::new();
        match self.build_material(&file, &material_file, &mut taken) {
            Ok(material) => Ok(self.insert(path.to_string(), material.into())),
            Err(e) => {
                for id in taken.into_iter().rev() {
                    self.decrement_asset_ref(id);
                }
                Err(Self::open_failed(path, AssetKind::Material, e))
            }
        }
    }

    /// Open the dependencies of a material and assemble it
    ///
    /// Every id opened is pushed to `taken` as soon as it is obtained.
    fn build_material(
        &mut self,
        file: &ResourceFile,
        material_file: &MaterialFile,
        taken: &mut Vec<AssetId>,
    ) -> Result<Material> {
        let vertex_shader = self.open_shader(&material_file.vertex_shader, ShaderStage::Vertex)?;
        taken.push(vertex_shader);
        let pixel_shader = self.open_shader(&material_file.pixel_shader, ShaderStage::Pixel)?;
        taken.push(pixel_shader);

        let mut slots = Vec::with_capacity(material_file.textures.len());
        let mut textures = Vec::with_capacity(material_file.textures.len());
        for (slot, texture_path) in &material_file.textures {
            let texture = self.open_texture(texture_path)?;
            taken.push(texture);
            slots.push(MaterialTextureSlot { name: slot.clone(), texture });
            textures.push(Arc::clone(self.texture_ref(texture)?.render_texture()));
        }

        let binding = MaterialBinding {
            vertex_shader: Arc::clone(self.shader_ref(vertex_shader)?.render_shader()),
            pixel_shader: Arc::clone(self.shader_ref(pixel_shader)?.render_shader()),
            textures,
            params: Vec::new(),
        };

        Material::from_desc(
            MaterialDesc {
                path: file.path.clone(),
                vertex_shader,
                pixel_shader,
                textures: slots,
                params: material_file.params.clone(),
            },
            binding,
        )
    }

    fn texture_ref(&self, id: AssetId) -> Result<&Texture> {
        self.texture(id).ok_or_else(|| engine_err!("ember3d::ResourceManager",
            "Asset {:?} is not a registered texture", id))
    }

    fn shader_ref(&self, id: AssetId) -> Result<&Shader> {
        self.shader(id).ok_or_else(|| engine_err!("ember3d::ResourceManager",
            "Asset {:?} is not a registered shader", id))
    }

    /// Existing asset registered as `name`, with one more reference
    ///
    /// A hit of another kind is an error and leaves the refcount unchanged.
    fn lookup(&mut self, name: &str, kind: AssetKind) -> Result<Option<AssetId>> {
        let Some(&id) = self.names.get(name) else {
            return Ok(None);
        };

        let entry = &mut self.assets[id];
        let found = entry.asset.kind();
        if found != kind {
            return Err(engine_err!("ember3d::ResourceManager",
                "'{}' is registered as a {}, not a {}", name, found, kind));
        }

        entry.ref_count += 1;
        crate::engine_trace!("ember3d::ResourceManager",
            "Reusing {} '{}' (refs: {})", kind, name, entry.ref_count);
        Ok(Some(id))
    }

    fn read(&self, path: &str, kind: AssetKind) -> Result<ResourceFile> {
        let loader = self.loader.as_ref().ok_or_else(|| Error::InitializationFailed(
            "No resource loader attached. Call ResourceManager::attach_resource_loader() first.".to_string()
        ))?;
        loader.load(path, kind)
    }

    fn open_failed(path: &str, kind: AssetKind, error: Error) -> Error {
        crate::engine_error!("ember3d::ResourceManager",
            "Failed to open {} '{}': {}", kind, path, error);
        error
    }

    fn insert(&mut self, name: String, asset: Asset) -> AssetId {
        let kind = asset.kind();
        crate::engine_debug!("ember3d::ResourceManager", "Registered {} '{}'", kind, name);

        let id = self.assets.insert(AssetEntry {
            name: name.clone(),
            ref_count: 1,
            asset,
        });
        self.names.insert(name, id);
        if kind == AssetKind::Model {
            self.models.push(id);
        }
        id
    }

    // ===== ACCESS =====

    /// Id registered under `name`, without adding a reference
    pub fn access_asset(&self, name: &str) -> Option<AssetId> {
        self.names.get(name).copied()
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id).map(|entry| &entry.asset)
    }

    pub fn asset_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.assets.get_mut(id).map(|entry| &mut entry.asset)
    }

    /// Registry name of `id`
    pub fn asset_name(&self, id: AssetId) -> Option<&str> {
        self.assets.get(id).map(|entry| entry.name.as_str())
    }

    pub fn texture(&self, id: AssetId) -> Option<&Texture> {
        self.asset(id).and_then(Asset::as_texture)
    }

    pub fn shader(&self, id: AssetId) -> Option<&Shader> {
        self.asset(id).and_then(Asset::as_shader)
    }

    pub fn model(&self, id: AssetId) -> Option<&Model> {
        self.asset(id).and_then(Asset::as_model)
    }

    pub fn model_mut(&mut self, id: AssetId) -> Option<&mut Model> {
        self.asset_mut(id).and_then(Asset::as_model_mut)
    }

    pub fn font(&self, id: AssetId) -> Option<&BMFont> {
        self.asset(id).and_then(Asset::as_font)
    }

    pub fn material(&self, id: AssetId) -> Option<&Material> {
        self.asset(id).and_then(Asset::as_material)
    }

    /// Register a procedurally built asset under `name` with one reference
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if `name` is already registered; the existing
    /// asset is left untouched.
    pub fn map_asset(&mut self, name: &str, asset: impl Into<Asset>) -> Result<AssetId> {
        if self.names.contains_key(name) {
            return Err(engine_err!("ember3d::ResourceManager",
                "An asset named '{}' is already registered", name));
        }
        Ok(self.insert(name.to_string(), asset.into()))
    }

    // ===== REFERENCE COUNTING =====

    /// Drop one reference to `id`; returns `true` when the asset was destroyed
    ///
    /// A stale id is logged and ignored.
    pub fn release_asset(&mut self, id: AssetId) -> bool {
        if !self.assets.contains_key(id) {
            crate::engine_warn!("ember3d::ResourceManager",
                "release_asset: {:?} is not registered", id);
            return false;
        }
        self.decrement_asset_ref(id)
    }

    /// Add one reference to `id`
    ///
    /// # Panics
    ///
    /// If `id` is not registered.
    pub fn increment_asset_ref(&mut self, id: AssetId) {
        match self.assets.get_mut(id) {
            Some(entry) => entry.ref_count += 1,
            None => panic!("increment_asset_ref: asset {:?} is not registered", id),
        }
    }

    /// Remove one reference to `id`; returns `true` when the asset was destroyed
    ///
    /// Destroying an asset unregisters its name, removes it from the model
    /// list and releases the references it held on its dependencies.
    ///
    /// # Panics
    ///
    /// If `id` is not registered.
    pub fn decrement_asset_ref(&mut self, id: AssetId) -> bool {
        let entry = match self.assets.get_mut(id) {
            Some(entry) => entry,
            None => panic!("decrement_asset_ref: asset {:?} is not registered", id),
        };

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return false;
        }

        self.destroy(id);
        true
    }

    fn destroy(&mut self, id: AssetId) {
        let Some(entry) = self.assets.remove(id) else {
            return;
        };

        self.names.remove(&entry.name);
        if entry.asset.kind() == AssetKind::Model {
            self.models.retain(|&model| model != id);
        }
        crate::engine_debug!("ember3d::ResourceManager",
            "Destroyed {} '{}'", entry.asset.kind(), entry.name);

        for dependency in entry.asset.dependencies() {
            if self.assets.contains_key(dependency) {
                self.decrement_asset_ref(dependency);
            }
        }
    }

    /// Current reference count, `None` for an unregistered id
    pub fn ref_count(&self, id: AssetId) -> Option<u32> {
        self.assets.get(id).map(|entry| entry.ref_count)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    // ===== MODELS =====

    pub fn num_loaded_models(&self) -> usize {
        self.models.len()
    }

    /// Id of the `index`-th loaded model (insertion order)
    ///
    /// # Panics
    ///
    /// If `index >= num_loaded_models()`.
    pub fn model_asset_id(&self, index: usize) -> AssetId {
        match self.models.get(index) {
            Some(&id) => id,
            None => panic!(
                "model index {} out of bounds: {} models loaded",
                index, self.models.len()
            ),
        }
    }

    /// The `index`-th loaded model (insertion order)
    ///
    /// # Panics
    ///
    /// If `index >= num_loaded_models()`.
    pub fn model_asset(&self, index: usize) -> &Model {
        let id = self.model_asset_id(index);
        match self.model(id) {
            Some(model) => model,
            None => panic!("model list entry {} is not a registered model", index),
        }
    }

    /// Assign (or clear) the material a model renders with
    ///
    /// The model does not hold a reference on the material.
    pub fn set_model_material(&mut self, model: AssetId, material: Option<AssetId>) -> Result<()> {
        if let Some(material) = material {
            if self.material(material).is_none() {
                return Err(engine_err!("ember3d::ResourceManager",
                    "Asset {:?} is not a registered material", material));
            }
        }
        let target = self.model_mut(model).ok_or_else(|| engine_err!("ember3d::ResourceManager",
            "Asset {:?} is not a registered model", model))?;
        target.set_material(material);
        Ok(())
    }

    /// Queue one instance of `model` for the next `render_model`
    pub fn batch_model(&mut self, model: AssetId, world: Mat4) -> Result<()> {
        let target = self.model_mut(model).ok_or_else(|| engine_err!("ember3d::ResourceManager",
            "Asset {:?} is not a registered model", model))?;
        target.batch(world);
        Ok(())
    }

    /// Draw every pending instance of `model`; returns the number of draw calls
    pub fn render_model(&mut self, model: AssetId, camera: &Camera) -> Result<u32> {
        let material = self.model(model)
            .ok_or_else(|| engine_err!("ember3d::ResourceManager",
                "Asset {:?} is not a registered model", model))?
            .material();

        let binding = match material {
            Some(id) => Some(
                self.material(id)
                    .ok_or_else(|| engine_err!("ember3d::ResourceManager",
                        "Material {:?} of model {:?} is no longer registered", id, model))?
                    .binding()
                    .clone(),
            ),
            None => None,
        };

        let graphics_device = Arc::clone(&self.graphics_device);
        match self.model_mut(model) {
            Some(target) => target.render(&graphics_device, camera, binding.as_ref()),
            None => Err(Error::InvalidResource(format!("Asset {:?} is not a registered model", model))),
        }
    }

    // ===== DIAGNOSTICS =====

    /// One line per asset (name, kind, refcount), sorted by name
    pub fn loaded_report(&self) -> String {
        let mut entries: Vec<&AssetEntry> = self.assets.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut report = format!("{} assets loaded\n", entries.len());
        for entry in entries {
            report.push_str(&format!(
                "  {} [{}] refs={}\n", entry.name, entry.asset.kind(), entry.ref_count
            ));
        }
        report
    }

    /// Log `loaded_report()` at INFO
    pub fn print_loaded(&self) {
        crate::engine_info!("ember3d::ResourceManager", "{}", self.loaded_report().trim_end());
    }

    /// Destroy every asset regardless of its reference count
    pub fn release_all(&mut self) {
        let count = self.assets.len();
        self.models.clear();
        self.names.clear();
        self.assets.clear();

        if count > 0 {
            crate::engine_info!("ember3d::ResourceManager", "Released {} assets", count);
        }
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
