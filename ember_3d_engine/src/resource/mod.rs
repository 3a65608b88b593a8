//! Resource management module
//!
//! Registry of loaded assets and the importers turning files into them.

mod resource_manager;
pub mod asset;
pub mod resource_loader;
pub mod texture;
pub mod shader;
pub mod material;
pub mod scene_import;
pub mod model;
pub mod bmfont;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use resource_manager::{ResourceManager, ResourceManagerConfig};
pub use asset::{Asset, AssetId, AssetKind};
pub use resource_loader::{
    ResourceFile, ResourceLoader, ResourceLoaderConfig,
    FileSystemResourceLoader, MemoryResourceLoader,
};
pub use texture::Texture;
pub use shader::Shader;
pub use material::{
    Material, MaterialBinding, MaterialFile, MaterialTextureSlot, ParamValue,
};
pub use scene_import::{
    GltfSceneImporter, ImportedMesh, ImportedScene, PostProcess, SceneImporter,
};
pub use model::{Bounds, InstanceBatch, Model, Vertex};
pub use bmfont::{BMFont, BMFontCommon, BMFontFile, BMFontInfo, BMFontPage, FontChar};
