/// Asset identity and the closed set of asset types held by the registry.
///
/// Every registered resource is an `Asset`: a tagged variant over the five
/// concrete resource types. The registry hands out `AssetId` keys; an id
/// becomes stale once its asset is destroyed and is never reused for another
/// asset.

use std::fmt;
use slotmap::new_key_type;

use crate::resource::texture::Texture;
use crate::resource::shader::Shader;
use crate::resource::model::Model;
use crate::resource::bmfont::BMFont;
use crate::resource::material::Material;

new_key_type! {
    /// Stable key of a registered asset
    pub struct AssetId;
}

// ===== ASSET KIND =====

/// Kind tag of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Texture,
    Model,
    Font,
    Shader,
    Material,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Texture => write!(f, "texture"),
            AssetKind::Model => write!(f, "model"),
            AssetKind::Font => write!(f, "font"),
            AssetKind::Shader => write!(f, "shader"),
            AssetKind::Material => write!(f, "material"),
        }
    }
}

// ===== ASSET =====

/// A registered resource
pub enum Asset {
    Texture(Texture),
    Model(Model),
    Font(BMFont),
    Shader(Shader),
    Material(Material),
}

impl Asset {
    /// Kind tag of this asset
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Texture(_) => AssetKind::Texture,
            Asset::Model(_) => AssetKind::Model,
            Asset::Font(_) => AssetKind::Font,
            Asset::Shader(_) => AssetKind::Shader,
            Asset::Material(_) => AssetKind::Material,
        }
    }

    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            Asset::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Asset::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_model_mut(&mut self) -> Option<&mut Model> {
        match self {
            Asset::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_font(&self) -> Option<&BMFont> {
        match self {
            Asset::Font(font) => Some(font),
            _ => None,
        }
    }

    pub fn as_shader(&self) -> Option<&Shader> {
        match self {
            Asset::Shader(shader) => Some(shader),
            _ => None,
        }
    }

    pub fn as_material(&self) -> Option<&Material> {
        match self {
            Asset::Material(material) => Some(material),
            _ => None,
        }
    }

    /// Ids of the assets this asset holds a reference on
    ///
    /// These references are released when this asset is destroyed.
    /// A model's material is a non-owning reference and is not listed.
    pub fn dependencies(&self) -> Vec<AssetId> {
        match self {
            Asset::Font(font) => font.page_textures().iter().flatten().copied().collect(),
            Asset::Material(material) => material.dependencies(),
            Asset::Texture(_) | Asset::Model(_) | Asset::Shader(_) => Vec::new(),
        }
    }
}

impl From<Texture> for Asset {
    fn from(texture: Texture) -> Self {
        Asset::Texture(texture)
    }
}

impl From<Model> for Asset {
    fn from(model: Model) -> Self {
        Asset::Model(model)
    }
}

impl From<BMFont> for Asset {
    fn from(font: BMFont) -> Self {
        Asset::Font(font)
    }
}

impl From<Shader> for Asset {
    fn from(shader: Shader) -> Self {
        Asset::Shader(shader)
    }
}

impl From<Material> for Asset {
    fn from(material: Material) -> Self {
        Asset::Material(material)
    }
}
