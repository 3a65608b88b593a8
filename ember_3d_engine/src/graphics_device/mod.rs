/// Graphics device module - the contract the resource core requires from a rendering backend

// Module declarations
pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod shader;

// Headless device: records every call, no GPU required
pub mod mock_graphics_device;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use shader::*;
