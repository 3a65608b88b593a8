/// Resource loaders: strategies resolving an asset path to file content.
///
/// The resource manager never touches the file system itself. It asks the
/// attached `ResourceLoader` for the bytes of a path, then hands them to the
/// importer of the requested kind.

use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::resource::asset::AssetKind;

// ===== RESOURCE FILE =====

/// Content of one asset file, as returned by a loader
#[derive(Debug, Clone)]
pub struct ResourceFile {
    /// Location the content was read from (used to resolve relative references)
    ///
    /// File-system loaders report an absolute path.
    pub path: PathBuf,
    /// Raw file content
    pub bytes: Vec<u8>,
}

impl ResourceFile {
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Directory containing the file (empty path when there is none)
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

// ===== TRAIT =====

/// Pluggable strategy locating asset files
pub trait ResourceLoader: Send + Sync {
    /// Read the file for `path`, interpreted for an asset of `kind`
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the file does not exist
    /// - `Error::Io` if it exists but cannot be read
    fn load(&self, path: &str, kind: AssetKind) -> Result<ResourceFile>;
}

// ===== FILE SYSTEM LOADER =====

/// Directory layout used by `FileSystemResourceLoader`
#[derive(Debug, Clone)]
pub struct ResourceLoaderConfig {
    /// Root directory of the asset tree
    pub root: PathBuf,
    pub texture_dir: PathBuf,
    pub model_dir: PathBuf,
    pub font_dir: PathBuf,
    pub shader_dir: PathBuf,
    pub material_dir: PathBuf,
}

impl Default for ResourceLoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            texture_dir: PathBuf::from("Textures"),
            model_dir: PathBuf::from("Models"),
            font_dir: PathBuf::from("Fonts"),
            shader_dir: PathBuf::from("Shaders"),
            material_dir: PathBuf::from("Materials"),
        }
    }
}

impl ResourceLoaderConfig {
    /// Default layout under the given root
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Subdirectory holding assets of `kind`
    pub fn directory_for(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Texture => &self.texture_dir,
            AssetKind::Model => &self.model_dir,
            AssetKind::Font => &self.font_dir,
            AssetKind::Shader => &self.shader_dir,
            AssetKind::Material => &self.material_dir,
        }
    }
}

/// Loader reading assets from a directory tree
///
/// Relative paths resolve to `root/<kind directory>/path`; absolute paths are
/// used as-is.
pub struct FileSystemResourceLoader {
    config: ResourceLoaderConfig,
}

impl FileSystemResourceLoader {
    pub fn new(config: ResourceLoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResourceLoaderConfig {
        &self.config
    }

    /// Full path the loader reads for `path` and `kind`
    pub fn resolve(&self, path: &str, kind: AssetKind) -> PathBuf {
        let requested = Path::new(path);
        if requested.is_absolute() {
            return requested.to_path_buf();
        }
        self.config.root.join(self.config.directory_for(kind)).join(requested)
    }
}

impl ResourceLoader for FileSystemResourceLoader {
    fn load(&self, path: &str, kind: AssetKind) -> Result<ResourceFile> {
        let full_path = self.resolve(path, kind);
        let bytes = std::fs::read(&full_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(format!(
                "{} file '{}'", kind, full_path.display()
            )),
            _ => Error::Io(format!("'{}': {}", full_path.display(), e)),
        })?;

        crate::engine_trace!("ember3d::ResourceLoader",
            "Read {} bytes from '{}'", bytes.len(), full_path.display());

        // Absolute, so paths relative to this file bypass the kind directories
        let full_path = std::path::absolute(&full_path).unwrap_or(full_path);
        Ok(ResourceFile::new(full_path, bytes))
    }
}

// ===== MEMORY LOADER =====

/// Loader serving embedded assets from memory
#[derive(Default)]
pub struct MemoryResourceLoader {
    files: FxHashMap<(AssetKind, String), Vec<u8>>,
}

impl MemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the content served for `path` and `kind`
    pub fn insert(&mut self, kind: AssetKind, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert((kind, path.into()), bytes.into());
    }

    /// Builder-style `insert`
    pub fn with_file(mut self, kind: AssetKind, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(kind, path, bytes);
        self
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn load(&self, path: &str, kind: AssetKind) -> Result<ResourceFile> {
        self.files
            .get(&(kind, path.to_string()))
            .map(|bytes| ResourceFile::new(path, bytes.clone()))
            .ok_or_else(|| Error::NotFound(format!("{} file '{}'", kind, path)))
    }
}

#[cfg(test)]
#[path = "resource_loader_tests.rs"]
mod tests;
