//! Camera module.
//!
//! The engine does NOT store or manage cameras: they are passive data
//! containers owned and driven by the caller, read when models are rendered.

mod camera;

pub use camera::Camera;
