//! Registered backend modules, the aggregated command set, and the active
//! module slot.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use conduit_types::error::ConduitError;

use crate::module::{Command, Module};

/// A command together with the module that owns it.
#[derive(Clone)]
pub struct RegisteredCommand {
    pub command: Arc<dyn Command>,
    pub module: Arc<dyn Module>,
}

/// Command name to owning registration.
pub type CommandSet = HashMap<String, RegisteredCommand>;

/// Owns every module registered with a session.
///
/// Prefix and name uniqueness are not enforced. Lookups by name or prefix
/// return the first registered match; in the aggregated command set the
/// last registered module wins a name clash.
pub struct ModuleManager {
    default_module: String,
    modules: RwLock<Vec<Arc<dyn Module>>>,
    command_cache: RwLock<Option<Arc<CommandSet>>>,
    active: RwLock<Option<Arc<dyn Module>>>,
    /// Indices of modules whose teardown already succeeded.
    torn_down: Mutex<HashSet<usize>>,
}

impl ModuleManager {
    /// Create an empty manager. The module named `default_module` becomes
    /// active as soon as it is registered.
    pub fn new(default_module: &str) -> Self {
        Self {
            default_module: default_module.to_string(),
            modules: RwLock::new(Vec::new()),
            command_cache: RwLock::new(None),
            active: RwLock::new(None),
            torn_down: Mutex::new(HashSet::new()),
        }
    }

    /// Append modules in order.
    pub fn register(&self, modules: impl IntoIterator<Item = Arc<dyn Module>>) {
        let mut list = self.modules.write().unwrap_or_else(|e| e.into_inner());
        for module in modules {
            if list.iter().any(|m| m.prefix() == module.prefix()) {
                log::warn!(
                    "module '{}' reuses prefix '{}'; the earlier module keeps it",
                    module.name(),
                    module.prefix()
                );
            }
            if list.iter().any(|m| m.name() == module.name()) {
                log::warn!("module name '{}' registered twice", module.name());
            }
            log::info!(
                "Registered module '{}' (prefix '{}')",
                module.name(),
                module.prefix()
            );
            if module.name() == self.default_module {
                let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
                if active.is_none() {
                    *active = Some(Arc::clone(&module));
                }
            }
            list.push(module);
        }
        // Invalidate under the list lock; command_set() rebuilds under it too.
        *self.command_cache.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Snapshot of all modules in registration order.
    pub fn modules(&self) -> Vec<Arc<dyn Module>> {
        self.modules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(Arc::clone)
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<dyn Module>> {
        let list = self.modules.read().unwrap_or_else(|e| e.into_inner());
        list.iter().find(|m| m.name() == name).map(Arc::clone)
    }

    /// First registered module whose prefix equals `prefix` exactly.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<Arc<dyn Module>> {
        let list = self.modules.read().unwrap_or_else(|e| e.into_inner());
        list.iter().find(|m| m.prefix() == prefix).map(Arc::clone)
    }

    pub fn active_module(&self) -> Option<Arc<dyn Module>> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(Arc::clone)
    }

    pub fn set_active_module(&self, module: Arc<dyn Module>) {
        log::debug!("active module -> '{}'", module.name());
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = Some(module);
    }

    /// The module made active when it is first registered.
    pub fn default_module_name(&self) -> &str {
        &self.default_module
    }

    /// Every module's commands folded in registration order. A later
    /// module's command replaces an earlier one with the same name.
    pub fn command_set(&self) -> Arc<CommandSet> {
        if let Some(cached) = self
            .command_cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Arc::clone(cached);
        }

        let list = self.modules.read().unwrap_or_else(|e| e.into_inner());
        let mut set = CommandSet::new();
        for module in list.iter() {
            for command in module.commands() {
                let name = command.name().to_string();
                if let Some(previous) = set.get(&name) {
                    log::debug!(
                        "command '{name}' from '{}' shadows '{}'",
                        module.name(),
                        previous.module.name()
                    );
                }
                set.insert(
                    name,
                    RegisteredCommand {
                        command,
                        module: Arc::clone(module),
                    },
                );
            }
        }
        let set = Arc::new(set);
        *self.command_cache.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&set));
        set
    }

    pub fn find_command(&self, name: &str) -> Option<RegisteredCommand> {
        self.command_set().get(name).cloned()
    }

    /// Tear down every module, continuing past failures.
    ///
    /// Modules whose teardown succeeded are skipped on later calls; failed
    /// ones are retried. Callers must stop issuing commands first.
    pub fn shutdown(&self) -> Vec<ConduitError> {
        let modules = self.modules();
        let mut done = self.torn_down.lock().unwrap_or_else(|e| e.into_inner());
        let mut failures = Vec::new();

        for (index, module) in modules.iter().enumerate() {
            if done.contains(&index) {
                continue;
            }
            match module.shutdown() {
                Ok(()) => {
                    log::debug!("module '{}' shut down", module.name());
                    done.insert(index);
                },
                Err(e) => {
                    log::warn!("teardown of module '{}' failed: {e}", module.name());
                    failures.push(ConduitError::ModuleTeardown {
                        module: module.name().to_string(),
                        reason: e.to_string(),
                    });
                },
            }
        }
        failures
    }
}
