/// GraphicsDevice trait - factory and draw interface implemented by rendering backends

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    Buffer, Texture, Shader,
    BufferDesc, TextureDesc, ShaderDesc, ShaderParam, IndexType,
};

// ============================================================================
// Draw call
// ============================================================================

/// One indexed, instanced draw
///
/// Everything the backend needs is carried by value: the model's buffers,
/// the material's shaders and textures, and the named shader parameters
/// (camera matrices, instance transforms, material parameters).
#[derive(Clone)]
pub struct DrawCall {
    /// Vertex buffer to bind
    pub vertex_buffer: Arc<dyn Buffer>,
    /// Index buffer to bind
    pub index_buffer: Arc<dyn Buffer>,
    /// Element type of the index buffer
    pub index_type: IndexType,
    /// Number of indices to draw
    pub index_count: u32,
    /// Number of instances to draw
    pub instance_count: u32,
    /// Vertex shader
    pub vertex_shader: Arc<dyn Shader>,
    /// Pixel shader
    pub pixel_shader: Arc<dyn Shader>,
    /// Textures bound in slot order
    pub textures: Vec<Arc<dyn Texture>>,
    /// Named shader parameters
    pub params: Vec<ShaderParam>,
}

impl DrawCall {
    /// Look up a parameter by name
    pub fn param(&self, name: &str) -> Option<&ShaderParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Main graphics device trait
///
/// This is the narrow interface the resource core uses to upload data and
/// issue draws. Implemented by backend-specific devices; the core treats
/// created objects as opaque.
pub trait GraphicsDevice: Send + Sync {
    /// Create a buffer, optionally initialized with data
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture from raw pixel data
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a shader for one stage
    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Record one indexed, instanced draw
    fn draw_indexed_instanced(&mut self, draw: DrawCall) -> Result<()>;
}
