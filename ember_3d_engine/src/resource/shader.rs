/// Resource-level shader: source or bytecode compiled for one stage.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice,
    Shader as RenderShader,
    ShaderDesc, ShaderStage,
};
use crate::resource::resource_loader::ResourceFile;

/// Shader asset
pub struct Shader {
    path: PathBuf,
    stage: ShaderStage,
    entry_point: String,
    render_shader: Arc<dyn RenderShader>,
}

impl Shader {
    /// Create a shader for `stage` from the file content, using the stage's
    /// default entry point
    pub fn import(
        file: &ResourceFile,
        stage: ShaderStage,
        graphics_device: &Arc<Mutex<dyn GraphicsDevice>>,
    ) -> Result<Self> {
        Self::from_code(&file.path, file.bytes.clone(), stage, stage.default_entry_point(), graphics_device)
    }

    /// Create a shader from code already in memory
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedResource` if `code` is empty, or the error
    /// reported by the graphics device.
    pub fn from_code(
        path: impl AsRef<Path>,
        code: Vec<u8>,
        stage: ShaderStage,
        entry_point: &str,
        graphics_device: &Arc<Mutex<dyn GraphicsDevice>>,
    ) -> Result<Self> {
        if code.is_empty() {
            return Err(Error::MalformedResource(format!(
                "Shader '{}' is empty", path.as_ref().display()
            )));
        }

        let render_shader = {
            let mut device = graphics_device.lock()
                .map_err(|_| Error::BackendError("GraphicsDevice lock poisoned".to_string()))?;
            device.create_shader(ShaderDesc {
                code,
                stage,
                entry_point: entry_point.to_string(),
            })?
        };

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            stage,
            entry_point: entry_point.to_string(),
            render_shader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Underlying GPU shader
    pub fn render_shader(&self) -> &Arc<dyn RenderShader> {
        &self.render_shader
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
