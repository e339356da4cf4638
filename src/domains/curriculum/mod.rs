pub mod types;

pub use types::{catalog, module, next_module, remaining_modules, Module, ModuleCategory, ModuleId, GRADUATION_MODULE_COUNT};
