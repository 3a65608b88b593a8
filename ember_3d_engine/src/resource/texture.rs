/// Resource-level texture.
///
/// Wraps a GPU texture (`render::Texture`) created from decoded image data,
/// together with the metadata the registry reports.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice,
    Texture as RenderTexture,
    TextureDesc, TextureFormat,
};
use crate::resource::resource_loader::ResourceFile;

/// Texture asset
pub struct Texture {
    path: PathBuf,
    width: u32,
    height: u32,
    format: TextureFormat,
    render_texture: Arc<dyn RenderTexture>,
}

impl Texture {
    /// Decode an image file (PNG, JPEG or BMP) and upload it as RGBA8
    ///
    /// # Errors
    ///
    /// - `Error::MalformedResource` if the content is not a decodable image
    /// - any error reported by the graphics device
    pub fn import(
        file: &ResourceFile,
        graphics_device: &Arc<Mutex<dyn GraphicsDevice>>,
    ) -> Result<Self> {
        let image = image::load_from_memory(&file.bytes)
            .map_err(|e| Error::MalformedResource(format!(
                "Failed to decode image '{}': {}", file.path.display(), e
            )))?;

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        Self::from_rgba8(&file.path, width, height, rgba.into_raw(), graphics_device)
    }

    /// Build a texture from raw RGBA8 pixels (procedural textures)
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` if `pixels` is not `width * height * 4` bytes.
    pub fn from_rgba8(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        graphics_device: &Arc<Mutex<dyn GraphicsDevice>>,
    ) -> Result<Self> {
        let format = TextureFormat::R8G8B8A8_UNORM;
        let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
        if pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "Texture {}x{} expects {} bytes of RGBA8 data, got {}",
                width, height, expected, pixels.len()
            )));
        }

        let render_texture = {
            let mut device = graphics_device.lock()
                .map_err(|_| Error::BackendError("GraphicsDevice lock poisoned".to_string()))?;
            device.create_texture(TextureDesc {
                width,
                height,
                format,
                data: pixels,
            })?
        };

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            width,
            height,
            format,
            render_texture,
        })
    }

    /// Source path, or the name given to a procedural texture
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Underlying GPU texture
    pub fn render_texture(&self) -> &Arc<dyn RenderTexture> {
        &self.render_texture
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
