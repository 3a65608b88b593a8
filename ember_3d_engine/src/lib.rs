/*!
# Ember 3D Engine

Asset-loading and rendering-resource core of the Ember3D engine.

The crate loads meshes, textures, shaders, materials and bitmap fonts,
converts them into GPU-ready buffers through a backend-agnostic graphics
device, and tracks their lifetime in a reference-counted registry.

## Architecture

- **ResourceManager**: registry deduplicating assets by name, counting
  references and dispatching `open_*` requests to the importers
- **ResourceLoader**: pluggable strategy resolving a path to file content
- **Model**: geometry imported from a scene file (glTF/GLB) with instanced batching
- **BMFont**: bitmap font atlas parsed from BMFont XML
- **GraphicsDevice**: narrow trait implemented by rendering backends
- **Camera**: view and projection matrices sent with every model draw
- **Engine**: process-wide resource manager slot and global logger
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod camera;
pub mod resource;

// Main ember3d namespace module
pub mod ember3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // View and projection used by model rendering
    pub use crate::camera::Camera;

    // Resource manager (most used entry point)
    pub use crate::resource::{ResourceManager, ResourceManagerConfig};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, MemoryLogger};
    }

    // Graphics backend contract
    pub mod render {
        pub use crate::graphics_device::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }
}

// Re-export math library at crate root
pub use glam;
