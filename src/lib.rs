// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod ffi;
pub mod globals;
pub mod types;
pub mod validation;

pub use config::AppConfig;

// Entry point for initialization
/// Initialize the library with an explicit configuration.
/// This function must be called before any roster service function.
pub fn initialize(config: AppConfig) -> ffi::FFIResult<()> {
    globals::initialize(config)
}

/// Initialize from `ROSTER_*` environment variables (and `.env`, if present)
pub fn initialize_from_env() -> ffi::FFIResult<()> {
    let config = AppConfig::from_env()?;
    globals::initialize(config)
}

/// Check whether `initialize` has completed successfully
pub fn is_initialized() -> bool {
    globals::is_initialized()
}
