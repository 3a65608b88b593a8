/// Resource-level model: imported geometry uploaded to GPU buffers.
///
/// A Model owns one vertex buffer and one index buffer built from the first
/// mesh of a scene file. Rendering is instanced: world transforms are
/// batched with `batch()` and flushed by `render()`, one draw call per
/// batch of at most `max_instances` transforms.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::engine_err;
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, DrawCall, GraphicsDevice, IndexType,
    ShaderParam, ShaderValue,
};
use crate::resource::asset::AssetId;
use crate::resource::material::MaterialBinding;
use crate::resource::resource_loader::ResourceFile;
use crate::resource::resource_manager::ResourceManagerConfig;
use crate::resource::scene_import::{ImportedMesh, SceneImporter};

// ===== VERTEX =====

/// Vertex layout uploaded to the vertex buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub uv: [f32; 2],
}

// ===== BOUNDS =====

/// Axis-aligned bounds of a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub size: Vec3,
}

impl Bounds {
    fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            center: (min + max) * 0.5,
            size: max - min,
        }
    }
}

// ===== INSTANCE BATCH =====

/// Pending world transforms, split into render calls of bounded size
#[derive(Debug, Clone)]
pub struct InstanceBatch {
    max_instances: usize,
    calls: Vec<Vec<Mat4>>,
}

impl InstanceBatch {
    /// `max_instances` is clamped to at least 1
    pub fn new(max_instances: usize) -> Self {
        Self {
            max_instances: max_instances.max(1),
            calls: Vec::new(),
        }
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Append a transform, starting a new render call when the current one is full
    pub fn push(&mut self, world: Mat4) {
        match self.calls.last_mut() {
            Some(call) if call.len() < self.max_instances => call.push(world),
            _ => self.calls.push(vec![world]),
        }
    }

    /// Total number of pending transforms
    pub fn len(&self) -> usize {
        self.calls.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Number of render calls the pending transforms need
    pub fn render_calls(&self) -> usize {
        self.calls.len()
    }

    /// Remove and return every pending render call
    pub fn take(&mut self) -> Vec<Vec<Mat4>> {
        std::mem::take(&mut self.calls)
    }

    /// Put render calls back in front of whatever is pending
    fn restore(&mut self, calls: impl IntoIterator<Item = Vec<Mat4>>) {
        let pending = std::mem::take(&mut self.calls);
        self.calls = calls.into_iter().chain(pending).collect();
    }
}

// ===== MODEL =====

/// Model asset
pub struct Model {
    path: PathBuf,
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    bounds: Bounds,
    vertex_buffer: Arc<dyn Buffer>,
    index_buffer: Arc<dyn Buffer>,
    material: Option<AssetId>,
    batch: InstanceBatch,
}

impl Model {
    /// Import the first mesh of a scene file
    ///
    /// Later meshes are not read. A warning is logged when the scene holds
    /// more than one mesh.
    ///
    /// # Errors
    ///
    /// - `Error::MalformedResource` if the scene holds no mesh, the mesh has
    ///   no triangles, or an index is out of range
    /// - any error of the scene importer or the graphics device
    pub fn import(
        file: &ResourceFile,
        importer: &dyn SceneImporter,
        graphics_device: &Arc<Mutex<dyn GraphicsDevice>>,
        config: &ResourceManagerConfig,
    ) -> Result<Self> {
        let (mesh, mesh_count) = importer.read_first_mesh(file, config.post_process)?;

        let mesh = mesh.ok_or_else(|| Error::MalformedResource(format!(
            "Scene '{}' contains no mesh", file.path.display()
        )))?;
        if mesh_count > 1 {
            crate::engine_warn!("ember3d::Model",
                "Scene '{}' contains {} meshes, only '{}' is imported",
                file.path.display(), mesh_count, mesh.name);
        }

        Self::from_mesh(&file.path, &mesh, graphics_device, config.max_instances_per_draw)
    }

    /// Build a model from geometry already in memory
    pub fn from_mesh(
        path: impl AsRef<Path>,
        mesh: &ImportedMesh,
        graphics_device: &Arc<Mutex<dyn GraphicsDevice>>,
        max_instances: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        if mesh.positions.is_empty() || mesh.faces.is_empty() {
            return Err(Error::MalformedResource(format!(
                "Mesh '{}' of '{}' has no triangles", mesh.name, path.display()
            )));
        }
        mesh.validate()?;

        // Vertices and bounds in one pass
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        let vertices: Vec<Vertex> = (0..mesh.positions.len())
            .map(|i| {
                let position = Vec3::from(mesh.positions[i]);
                min = min.min(position);
                max = max.max(position);
                Vertex {
                    position: mesh.positions[i],
                    normal: mesh.normals.get(i).copied().unwrap_or_default(),
                    tangent: mesh.tangents.get(i).copied().unwrap_or_default(),
                    bitangent: mesh.bitangents.get(i).copied().unwrap_or_default(),
                    uv: mesh.uvs.get(i).copied().unwrap_or_default(),
                }
            })
            .collect();

        let indices: Vec<u32> = mesh.faces.iter().flatten().copied().collect();
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(Error::MalformedResource(format!(
                "Index {} out of range for {} vertices in '{}'", bad, vertices.len(), path.display()
            )));
        }

        let (vertex_buffer, index_buffer) = {
            let mut device = graphics_device.lock()
                .map_err(|_| Error::BackendError("GraphicsDevice lock poisoned".to_string()))?;
            (
                device.create_buffer(BufferDesc::with_data(BufferUsage::Vertex, bytemuck::cast_slice(&vertices)))?,
                device.create_buffer(BufferDesc::with_data(BufferUsage::Index, bytemuck::cast_slice(&indices)))?,
            )
        };

        Ok(Self {
            path: path.to_path_buf(),
            name: mesh.name.clone(),
            vertices,
            indices,
            bounds: Bounds::from_min_max(min, max),
            vertex_buffer,
            index_buffer,
            material: None,
            batch: InstanceBatch::new(max_instances),
        })
    }

    // ===== ACCESSORS =====

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the imported mesh
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn min(&self) -> Vec3 {
        self.bounds.min
    }

    pub fn max(&self) -> Vec3 {
        self.bounds.max
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.center
    }

    pub fn size(&self) -> Vec3 {
        self.bounds.size
    }

    pub fn vertex_buffer(&self) -> &Arc<dyn Buffer> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Arc<dyn Buffer> {
        &self.index_buffer
    }

    /// Material used when rendering (non-owning)
    pub fn material(&self) -> Option<AssetId> {
        self.material
    }

    pub fn set_material(&mut self, material: Option<AssetId>) {
        self.material = material;
    }

    pub fn instance_batch(&self) -> &InstanceBatch {
        &self.batch
    }

    /// Number of transforms waiting for `render`
    pub fn pending_instances(&self) -> usize {
        self.batch.len()
    }

    // ===== RENDERING =====

    /// Queue one instance for the next `render`
    pub fn batch(&mut self, world: Mat4) {
        self.batch.push(world);
    }

    /// Issue one instanced draw per pending batch and clear the batch
    ///
    /// Returns the number of draw calls issued. Nothing is drawn when no
    /// instance is pending.
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when instances are pending but no material
    /// binding is given; errors of the graphics device. When a draw fails,
    /// the calls already issued are cleared and the failed call and the ones
    /// after it stay pending.
    pub fn render(
        &mut self,
        graphics_device: &Arc<Mutex<dyn GraphicsDevice>>,
        camera: &Camera,
        binding: Option<&MaterialBinding>,
    ) -> Result<u32> {
        if self.batch.is_empty() {
            return Ok(0);
        }
        let binding = binding.ok_or_else(|| engine_err!("ember3d::Model",
            "Model '{}' has no material", self.path.display()))?;

        let mut device = graphics_device.lock()
            .map_err(|_| Error::BackendError("GraphicsDevice lock poisoned".to_string()))?;

        let mut calls = self.batch.take().into_iter();
        let mut issued = 0;
        while let Some(transforms) = calls.next() {
            let mut params = vec![
                ShaderParam::new("projection", ShaderValue::Matrix4(*camera.projection_matrix())),
                ShaderParam::new("view", ShaderValue::Matrix4(*camera.view_matrix())),
            ];
            params.extend(binding.params.iter().cloned());
            let instance_count = transforms.len() as u32;
            params.push(ShaderParam::new("transforms", ShaderValue::Matrix4Array(transforms.clone())));

            let drawn = device.draw_indexed_instanced(DrawCall {
                vertex_buffer: Arc::clone(&self.vertex_buffer),
                index_buffer: Arc::clone(&self.index_buffer),
                index_type: IndexType::U32,
                index_count: self.indices.len() as u32,
                instance_count,
                vertex_shader: Arc::clone(&binding.vertex_shader),
                pixel_shader: Arc::clone(&binding.pixel_shader),
                textures: binding.textures.clone(),
                params,
            });
            if let Err(e) = drawn {
                // The failed call and every call after it stay pending
                self.batch.restore(std::iter::once(transforms).chain(calls));
                return Err(e);
            }
            issued += 1;
        }

        Ok(issued)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
