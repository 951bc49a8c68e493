//! Modules compiled into the `conduit` binary.

mod core_commands;
mod file_commands;

use std::sync::Arc;

use conduit_runtime::Module;

pub use core_commands::CoreModule;
pub use file_commands::FileModule;

/// Every built-in module, in registration order.
pub fn builtin_modules() -> Vec<Arc<dyn Module>> {
    vec![
        Arc::new(CoreModule) as Arc<dyn Module>,
        Arc::new(FileModule) as Arc<dyn Module>,
    ]
}
