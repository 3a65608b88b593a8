/// Resource-level material type.
///
/// A Material describes a surface: the vertex and pixel shaders that draw it,
/// textures bound to named slots and named parameters.
///
/// Architecture:
/// - Shader and texture references: registry ids the material holds a
///   reference on (released when the material is destroyed)
/// - Parameters: named scalar/vector values (roughness, base_color, etc.)
/// - Binding: the GPU handles resolved from those ids, cached so a draw call
///   can be built without going back to the registry
///
/// Material files are XML:
///
/// ```xml
/// <material>
///     <shader stage="vertex" file="basic_vs.hlsl"/>
///     <shader stage="pixel" file="basic_ps.hlsl"/>
///     <texture slot="diffuse" file="stone.png"/>
///     <param name="tint" type="vec3" value="1, 0.5, 0.5"/>
/// </material>
/// ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::engine_bail;
use crate::graphics_device::{
    Shader as RenderShader,
    Texture as RenderTexture,
    ShaderParam, ShaderStage, ShaderValue,
};
use crate::resource::asset::AssetId;

// ===== PARAMETER VALUES =====

/// A typed parameter value for the material
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
}

impl ParamValue {
    /// Parse a value written as `type` / comma-separated components
    ///
    /// Returns `None` for an unknown type or a wrong component count.
    pub fn parse(type_name: &str, value: &str) -> Option<Self> {
        if type_name == "int" {
            return value.trim().parse().ok().map(ParamValue::Int);
        }

        let components: Vec<f32> = value
            .split(',')
            .map(|c| c.trim().parse::<f32>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;

        match (type_name, components.as_slice()) {
            ("float", [x]) => Some(ParamValue::Float(*x)),
            ("vec2", [x, y]) => Some(ParamValue::Vec2([*x, *y])),
            ("vec3", [x, y, z]) => Some(ParamValue::Vec3([*x, *y, *z])),
            ("vec4", [x, y, z, w]) => Some(ParamValue::Vec4([*x, *y, *z, *w])),
            _ => None,
        }
    }

    /// Value as sent to the shader
    pub fn to_shader_value(&self) -> ShaderValue {
        match *self {
            ParamValue::Float(v) => ShaderValue::Float(v),
            ParamValue::Vec2(v) => ShaderValue::Vec2(v),
            ParamValue::Vec3(v) => ShaderValue::Vec3(v),
            ParamValue::Vec4(v) => ShaderValue::Vec4(v),
            ParamValue::Int(v) => ShaderValue::Int(v),
        }
    }
}

// ===== MATERIAL FILE (MARKUP) =====

#[derive(Deserialize, Debug)]
struct MaterialXml {
    #[serde(rename = "$value", default)]
    elements: Vec<MaterialElement>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
enum MaterialElement {
    Shader {
        #[serde(rename = "@stage")]
        stage: String,
        #[serde(rename = "@file")]
        file: String,
    },
    Texture {
        #[serde(rename = "@slot")]
        slot: String,
        #[serde(rename = "@file")]
        file: String,
    },
    Param {
        #[serde(rename = "@name")]
        name: String,
        #[serde(rename = "@type")]
        type_name: String,
        #[serde(rename = "@value")]
        value: String,
    },
    #[serde(other)]
    Unknown,
}

/// Validated content of a material file
///
/// References are file names, not yet opened.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialFile {
    pub vertex_shader: String,
    pub pixel_shader: String,
    /// (slot, texture file) in declaration order
    pub textures: Vec<(String, String)>,
    /// (name, value) in declaration order
    pub params: Vec<(String, ParamValue)>,
}

impl MaterialFile {
    /// Parse and validate material markup
    ///
    /// # Errors
    ///
    /// `Error::MalformedResource` when the markup is invalid, a vertex or
    /// pixel shader is missing or declared twice, a stage is unknown, a slot
    /// or parameter name is duplicated, or a parameter value does not parse.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::MalformedResource(format!("Material is not UTF-8: {}", e)))?;
        let xml: MaterialXml = quick_xml::de::from_str(text)
            .map_err(|e| Error::MalformedResource(format!("Material markup: {}", e)))?;

        let mut vertex_shader = None;
        let mut pixel_shader = None;
        let mut textures: Vec<(String, String)> = Vec::new();
        let mut params: Vec<(String, ParamValue)> = Vec::new();

        for element in xml.elements {
            match element {
                MaterialElement::Shader { stage, file } => {
                    let target = match ShaderStage::from_name(&stage) {
                        Some(ShaderStage::Vertex) => &mut vertex_shader,
                        Some(ShaderStage::Pixel) => &mut pixel_shader,
                        _ => return Err(Error::MalformedResource(format!(
                            "Unsupported material shader stage '{}'", stage
                        ))),
                    };
                    if target.replace(file).is_some() {
                        return Err(Error::MalformedResource(format!(
                            "Material declares more than one {} shader", stage
                        )));
                    }
                }
                MaterialElement::Texture { slot, file } => {
                    if textures.iter().any(|(name, _)| *name == slot) {
                        return Err(Error::MalformedResource(format!(
                            "Duplicate texture slot name '{}'", slot
                        )));
                    }
                    textures.push((slot, file));
                }
                MaterialElement::Param { name, type_name, value } => {
                    if params.iter().any(|(existing, _)| *existing == name) {
                        return Err(Error::MalformedResource(format!(
                            "Duplicate parameter name '{}'", name
                        )));
                    }
                    let parsed = ParamValue::parse(&type_name, &value).ok_or_else(|| {
                        Error::MalformedResource(format!(
                            "Parameter '{}': '{}' is not a valid {} value", name, value, type_name
                        ))
                    })?;
                    params.push((name, parsed));
                }
                MaterialElement::Unknown => {
                    crate::engine_debug!("ember3d::Material", "Ignoring unknown material element");
                }
            }
        }

        let vertex_shader = vertex_shader
            .ok_or_else(|| Error::MalformedResource("Material has no vertex shader".to_string()))?;
        let pixel_shader = pixel_shader
            .ok_or_else(|| Error::MalformedResource("Material has no pixel shader".to_string()))?;

        Ok(Self {
            vertex_shader,
            pixel_shader,
            textures,
            params,
        })
    }
}

// ===== GPU BINDING =====

/// GPU handles a draw call needs from a material
#[derive(Clone)]
pub struct MaterialBinding {
    pub vertex_shader: Arc<dyn RenderShader>,
    pub pixel_shader: Arc<dyn RenderShader>,
    /// Textures in slot order
    pub textures: Vec<Arc<dyn RenderTexture>>,
    /// Material parameters as shader parameters
    pub params: Vec<ShaderParam>,
}

// ===== MATERIAL =====

/// A texture bound to a named slot
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTextureSlot {
    pub name: String,
    pub texture: AssetId,
}

/// Material creation descriptor (ids already registered)
pub struct MaterialDesc {
    pub path: PathBuf,
    pub vertex_shader: AssetId,
    pub pixel_shader: AssetId,
    pub textures: Vec<MaterialTextureSlot>,
    pub params: Vec<(String, ParamValue)>,
}

/// Material resource
pub struct Material {
    path: PathBuf,
    vertex_shader: AssetId,
    pixel_shader: AssetId,
    textures: Vec<MaterialTextureSlot>,
    texture_names: FxHashMap<String, usize>,
    params: Vec<(String, ParamValue)>,
    param_names: FxHashMap<String, usize>,
    binding: MaterialBinding,
}

impl Material {
    /// Create material from descriptor and its resolved GPU handles
    ///
    /// `binding.textures` must follow `desc.textures` order; the binding's
    /// parameters are rebuilt from `desc.params`.
    pub(crate) fn from_desc(desc: MaterialDesc, mut binding: MaterialBinding) -> Result<Self> {

        // ========== VALIDATION 1: No duplicate texture slot names ==========
        let mut seen_names = FxHashSet::default();
        for slot in &desc.textures {
            if !seen_names.insert(&slot.name) {
                engine_bail!("ember3d::Material",
                    "Duplicate texture slot name '{}'", slot.name);
            }
        }

        // ========== VALIDATION 2: No duplicate param names ==========
        let mut seen_param_names = FxHashSet::default();
        for (param_name, _) in &desc.params {
            if !seen_param_names.insert(param_name) {
                engine_bail!("ember3d::Material",
                    "Duplicate parameter name '{}'", param_name);
            }
        }

        // ========== VALIDATION 3: Binding matches slots ==========
        if binding.textures.len() != desc.textures.len() {
            engine_bail!("ember3d::Material",
                "Material '{}' has {} texture slots but {} bound textures",
                desc.path.display(), desc.textures.len(), binding.textures.len());
        }

        let texture_names = desc.textures.iter()
            .enumerate()
            .map(|(i, slot)| (slot.name.clone(), i))
            .collect();
        let param_names = desc.params.iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();

        binding.params = desc.params.iter()
            .map(|(name, value)| ShaderParam::new(name.clone(), value.to_shader_value()))
            .collect();

        Ok(Self {
            path: desc.path,
            vertex_shader: desc.vertex_shader,
            pixel_shader: desc.pixel_shader,
            textures: desc.textures,
            texture_names,
            params: desc.params,
            param_names,
            binding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn vertex_shader(&self) -> AssetId {
        self.vertex_shader
    }

    pub fn pixel_shader(&self) -> AssetId {
        self.pixel_shader
    }

    pub fn texture_slots(&self) -> &[MaterialTextureSlot] {
        &self.textures
    }

    /// Texture bound to a slot name
    pub fn texture(&self, slot: &str) -> Option<AssetId> {
        self.texture_names.get(slot).map(|&i| self.textures[i].texture)
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    /// Parameter value by name
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.param_names.get(name).map(|&i| &self.params[i].1)
    }

    /// Cached GPU handles for draw calls
    pub fn binding(&self) -> &MaterialBinding {
        &self.binding
    }

    /// Registry ids this material holds a reference on
    pub fn dependencies(&self) -> Vec<AssetId> {
        let mut ids = vec![self.vertex_shader, self.pixel_shader];
        ids.extend(self.textures.iter().map(|slot| slot.texture));
        ids
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
