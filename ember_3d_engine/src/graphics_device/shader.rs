/// Shader trait, shader descriptor and shader parameter values

use std::fmt;
use glam::Mat4;

/// Shader stage
///
/// A shader source file may be compiled for several stages, so the stage is
/// part of a shader asset's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Pixel/Fragment shader
    Pixel,
    /// Compute shader
    Compute,
}

impl ShaderStage {
    /// Default entry point name for this stage
    pub fn default_entry_point(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Pixel => "ps_main",
            ShaderStage::Compute => "cs_main",
        }
    }

    /// Parse a stage name as written in material files ("vertex", "pixel", "fragment", "compute")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "vertex" | "vs" => Some(ShaderStage::Vertex),
            "pixel" | "fragment" | "ps" => Some(ShaderStage::Pixel),
            "compute" | "cs" => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Pixel => write!(f, "pixel"),
            ShaderStage::Compute => write!(f, "compute"),
        }
    }
}

/// Descriptor for creating a shader
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// Shader source or bytecode, as understood by the backend
    pub code: Vec<u8>,
    /// Shader stage
    pub stage: ShaderStage,
    /// Entry point function name
    pub entry_point: String,
}

/// Value of a named shader parameter (uniform)
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    Matrix4(Mat4),
    Matrix4Array(Vec<Mat4>),
}

/// Named shader parameter sent with a draw call
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParam {
    pub name: String,
    pub value: ShaderValue,
}

impl ShaderParam {
    pub fn new(name: impl Into<String>, value: ShaderValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Shader resource trait
///
/// Implemented by backend-specific shader types.
/// The shader is automatically destroyed when dropped.
pub trait Shader: Send + Sync {
    /// Stage this shader was compiled for
    fn stage(&self) -> ShaderStage;
}
