//! Plugin contract and factory registry.
//!
//! Plugins are analysis units authored outside this crate. A manifest names
//! the module providing each plugin; the registry maps that module name to
//! a no-argument factory. Nothing is ever instantiated from a string of
//! code: a module either has a registered factory or the suite fails to
//! load.

use crate::error::TaskError;
use crate::payload::Payload;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Read-only per-call context handed to every plugin.
///
/// Implemented by the embedding layer (the organizer of work items), not by
/// this crate. It gives plugins access to the work item's input payload and
/// one primitive for persisting derived artifacts.
pub trait SuiteContext: Send + Sync {
    /// Label of the work item being processed (e.g. a recording name)
    fn source_name(&self) -> &str;

    /// The run's base input payload
    fn base(&self) -> &Payload;

    /// Persist bytes under a path relative to the work item's output area
    /// and return the absolute location written.
    fn save_artifact(&self, rel_path: &str, contents: &[u8]) -> Result<PathBuf, TaskError>;
}

/// An externally authored analysis unit
pub trait Plugin: Send + Sync {
    /// Consume the payloads of this plugin's dependencies and produce one
    /// payload of its own. A plugin without dependencies receives the run
    /// input under the `"base"` key.
    fn apply(
        &self,
        deps: &HashMap<String, Payload>,
        ctx: &dyn SuiteContext,
    ) -> Result<Payload, TaskError>;
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Plugin")
    }
}

/// No-argument constructor for one plugin type
pub type PluginFactory = Box<dyn Fn() -> anyhow::Result<std::sync::Arc<dyn Plugin>> + Send + Sync>;

/// Process-scoped table of plugin factories keyed by module name.
///
/// Built once at startup by whoever embeds the suite engine and passed by
/// reference to the loader; there is no global registry.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `module_name`, replacing any previous one
    pub fn register<F>(&mut self, module_name: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<std::sync::Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(module_name.to_string(), Box::new(factory))
            .is_some()
        {
            warn!("Replacing plugin factory for module '{}'", module_name);
        }
    }

    /// Instantiate the plugin for `module_name`, if a factory is registered
    #[must_use]
    pub fn create(&self, module_name: &str) -> Option<anyhow::Result<std::sync::Arc<dyn Plugin>>> {
        self.factories.get(module_name).map(|factory| factory())
    }

    #[must_use]
    pub fn contains(&self, module_name: &str) -> bool {
        self.factories.contains_key(module_name)
    }

    /// Registered module names, sorted for stable output
    #[must_use]
    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("modules", &self.module_names())
            .finish()
    }
}
