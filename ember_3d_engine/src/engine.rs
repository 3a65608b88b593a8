/// Ember3D Engine - process-wide lifetime for the resource core
///
/// The ResourceManager is an ordinary context object that can be constructed
/// and passed around explicitly. Applications that want a single process-wide
/// instance register it here, which gives it an explicit
/// initialize / de-initialize lifecycle. The engine also owns the global logger.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use crate::graphics_device::GraphicsDevice;
use crate::resource::{ResourceManager, ResourceManagerConfig};
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Resource manager singleton
    resource_manager: RwLock<Option<Arc<Mutex<ResourceManager>>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            resource_manager: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use std::sync::{Arc, Mutex};
/// use ember_3d_engine::ember3d::{Engine, ResourceManagerConfig};
/// use ember_3d_engine::ember3d::render::mock_graphics_device::MockGraphicsDevice;
///
/// Engine::initialize()?;
/// Engine::create_resource_manager(
///     Arc::new(Mutex::new(MockGraphicsDevice::new())),
///     ResourceManagerConfig::default(),
/// )?;
///
/// let rm = Engine::resource_manager()?;
/// // rm.lock().unwrap().open_texture("stone.png")?;
///
/// Engine::shutdown();
/// # Ok::<(), ember_3d_engine::ember3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("ember3d::Engine", "Initialization failed: {}", msg);
            }
            _ => {
                crate::engine_error!("ember3d::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    /// Initialize the engine
    ///
    /// Must be called once at application startup before creating any subsystems.
    /// Calling it again is harmless.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Shutdown the engine and release every asset owned by the resource manager
    ///
    /// After calling this, `create_resource_manager()` must be called again
    /// before the resource manager can be used.
    pub fn shutdown() {
        if Self::destroy_resource_manager().is_ok() {
            crate::engine_info!("ember3d::Engine", "Engine shut down");
        }
    }

    // ===== RESOURCE MANAGER API =====

    /// Create and register the resource manager singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A resource manager already exists
    /// - The resource manager lock is poisoned
    pub fn create_resource_manager(
        graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
        config: ResourceManagerConfig,
    ) -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.resource_manager.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("ResourceManager lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("ResourceManager already exists. Call Engine::destroy_resource_manager() first.".to_string())
            ));
        }

        *lock = Some(Arc::new(Mutex::new(ResourceManager::new(graphics_device, config))));

        crate::engine_info!("ember3d::Engine", "ResourceManager singleton created successfully");

        Ok(())
    }

    /// Get the resource manager singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or the resource
    /// manager has not been created (or was destroyed).
    pub fn resource_manager() -> Result<Arc<Mutex<ResourceManager>>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let lock = state.resource_manager.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("ResourceManager lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("ResourceManager not created. Call Engine::create_resource_manager() first.".to_string())
            ))
    }

    /// Whether a resource manager singleton is currently registered
    pub fn has_resource_manager() -> bool {
        ENGINE_STATE.get()
            .and_then(|state| state.resource_manager.read().ok().map(|lock| lock.is_some()))
            .unwrap_or(false)
    }

    /// Destroy the resource manager singleton
    ///
    /// Every registered asset is released immediately, even if other threads
    /// still hold a clone of the manager handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized
    pub fn destroy_resource_manager() -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized".to_string())
            ))?;

        let previous = {
            let mut lock = state.resource_manager.write()
                .map_err(|_| Self::log_and_return_error(
                    Error::BackendError("ResourceManager lock poisoned".to_string())
                ))?;
            lock.take()
        };

        if let Some(rm) = previous {
            if let Ok(mut rm) = rm.lock() {
                rm.release_all();
            }
            crate::engine_info!("ember3d::Engine", "ResourceManager singleton destroyed");
        }

        Ok(())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut rm) = state.resource_manager.write() {
                *rm = None;
            }
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, memory logger, etc.)
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
