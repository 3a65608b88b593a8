/// Mock GraphicsDevice (no GPU required)
///
/// Records every created object and every draw call so the resource core can
/// be exercised in unit tests and headless tools. Creation of a given object
/// kind can be made to fail to exercise error paths.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, DrawCall,
    Buffer, BufferDesc, BufferUsage,
    Texture, TextureDesc, TextureInfo,
    Shader, ShaderDesc, ShaderStage, ShaderValue,
};
use crate::engine_bail;

// ============================================================================
// Mock Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub size: u64,
    pub usage: BufferUsage,
    pub name: String,
    /// Current contents (CPU shadow copy)
    pub contents: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(size: u64, usage: BufferUsage, name: String) -> Self {
        Self {
            size,
            usage,
            name,
            contents: Mutex::new(vec![0u8; size as usize]),
        }
    }

    /// Copy of the current contents
    pub fn contents(&self) -> Vec<u8> {
        self.contents.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > self.size {
            engine_bail!("ember3d::mock",
                "Buffer '{}' update out of range ({} > {})", self.name, end, self.size);
        }
        let mut contents = self.contents.lock()
            .map_err(|_| Error::BackendError("MockBuffer lock poisoned".to_string()))?;
        contents[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub info: TextureInfo,
    pub name: String,
}

impl MockTexture {
    pub fn new(info: TextureInfo, name: String) -> Self {
        Self { info, name }
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

// ============================================================================
// Mock Shader
// ============================================================================

#[derive(Debug)]
pub struct MockShader {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub code_len: usize,
}

impl MockShader {
    pub fn new(stage: ShaderStage, entry_point: String, code_len: usize) -> Self {
        Self { stage, entry_point, code_len }
    }
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

// ============================================================================
// Recorded draw
// ============================================================================

/// Summary of one draw call received by the mock device
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub index_count: u32,
    pub instance_count: u32,
    pub texture_count: usize,
    /// Parameter names in submission order
    pub param_names: Vec<String>,
    /// Length of the "transforms" matrix array parameter, if any
    pub transform_count: usize,
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

#[derive(Debug, Default)]
pub struct MockGraphicsDevice {
    created_buffers: Vec<String>,
    created_textures: Vec<String>,
    created_shaders: Vec<String>,
    draws: Vec<RecordedDraw>,
    /// When set, create_buffer fails
    pub fail_buffers: bool,
    /// When set, create_texture fails
    pub fail_textures: bool,
    /// When set, create_shader fails
    pub fail_shaders: bool,
    /// When set, draw calls fail once this many draws are recorded
    pub fail_draws_after: Option<usize>,
}

impl MockGraphicsDevice {
    /// Create a new mock graphics device
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor returning the shared handle the resource manager expects
    pub fn shared() -> Arc<Mutex<MockGraphicsDevice>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Names of created buffers
    pub fn created_buffers(&self) -> &[String] {
        &self.created_buffers
    }

    /// Names of created textures
    pub fn created_textures(&self) -> &[String] {
        &self.created_textures
    }

    /// Names of created shaders
    pub fn created_shaders(&self) -> &[String] {
        &self.created_shaders
    }

    /// Draw calls received so far
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Forget recorded draw calls
    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if self.fail_buffers {
            return Err(Error::OutOfMemory);
        }
        let name = format!("buffer_{:?}_{}", desc.usage, desc.size);
        let buffer = MockBuffer::new(desc.size, desc.usage, name.clone());
        if let Some(data) = &desc.data {
            buffer.update(0, data)?;
        }
        self.created_buffers.push(name);
        Ok(Arc::new(buffer))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if self.fail_textures {
            return Err(Error::OutOfMemory);
        }
        let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel() as usize;
        if desc.data.len() != expected {
            engine_bail!("ember3d::mock",
                "Texture {}x{} expects {} bytes, got {}",
                desc.width, desc.height, expected, desc.data.len());
        }
        let name = format!("texture_{}x{}", desc.width, desc.height);
        self.created_textures.push(name.clone());
        let info = TextureInfo {
            width: desc.width,
            height: desc.height,
            format: desc.format,
        };
        Ok(Arc::new(MockTexture::new(info, name)))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        if self.fail_shaders {
            return Err(Error::BackendError("shader compilation failed".to_string()));
        }
        if desc.code.is_empty() {
            engine_bail!("ember3d::mock", "Empty {} shader code", desc.stage);
        }
        self.created_shaders.push(format!("shader_{}_{}", desc.stage, desc.entry_point));
        Ok(Arc::new(MockShader::new(desc.stage, desc.entry_point, desc.code.len())))
    }

    fn draw_indexed_instanced(&mut self, draw: DrawCall) -> Result<()> {
        if self.fail_draws_after.is_some_and(|n| self.draws.len() >= n) {
            return Err(Error::BackendError("device lost".to_string()));
        }
        if draw.instance_count == 0 {
            engine_bail!("ember3d::mock", "Draw with zero instances");
        }
        let max_indices = draw.index_buffer.size() / draw.index_type.size_bytes();
        if draw.index_count as u64 > max_indices {
            engine_bail!("ember3d::mock",
                "Draw reads {} indices from a buffer holding {}", draw.index_count, max_indices);
        }

        let transform_count = match draw.param("transforms").map(|p| &p.value) {
            Some(ShaderValue::Matrix4Array(transforms)) => transforms.len(),
            _ => 0,
        };

        self.draws.push(RecordedDraw {
            index_count: draw.index_count,
            instance_count: draw.instance_count,
            texture_count: draw.textures.len(),
            param_names: draw.params.iter().map(|p| p.name.clone()).collect(),
            transform_count,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
