//! A validated plugin suite and its per-work-item execution.
//!
//! Loading produces a `PluginSuite`: instantiated plugins plus the
//! dependency graph their manifest declared. Running one builds a fresh
//! pipeline for that call, so a single suite handle can process many work
//! items, concurrently, without shared mutable state between runs.

use crate::component::{Component, ComponentState, DependencyResults};
use crate::error::{SuiteError, TaskError};
use crate::graph::DependencyGraph;
use crate::payload::Payload;
use crate::pipeline::Pipeline;
use crate::plugin::{Plugin, SuiteContext};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extra-argument type suite pipelines carry: the per-work-item context
pub type SuiteRunArgs = Arc<dyn SuiteContext>;

/// One plugin instantiated from a manifest entry
pub struct LoadedPlugin {
    /// Unique name the manifest declared for this plugin
    pub name: String,
    /// Plugin names this one consumes, in manifest order
    pub dependencies: Vec<String>,
    /// Diagnostic identity, `<suite_name>.<module_name>`
    pub qualified_name: String,
    pub instance: Arc<dyn Plugin>,
}

/// Adapts a plugin to the scheduler's component contract
struct PluginComponent {
    plugin: Arc<dyn Plugin>,
    qualified_name: String,
}

impl Component<SuiteRunArgs> for PluginComponent {
    fn execute(
        &self,
        deps: &DependencyResults,
        args: &SuiteRunArgs,
    ) -> Result<Payload, TaskError> {
        let payloads: HashMap<String, Payload> = deps
            .iter()
            .map(|(name, result)| (name.clone(), result.payload.clone()))
            .collect();
        let started = Instant::now();
        let out = self.plugin.apply(&payloads, args.as_ref())?;
        debug!("{} finished in {:?}", self.qualified_name, started.elapsed());
        Ok(out)
    }
}

struct SuiteEntry {
    name: String,
    dependencies: Vec<String>,
    component: Arc<dyn Component<SuiteRunArgs>>,
}

/// A loaded suite: plugins in manifest order and their canonical graph
pub struct PluginSuite {
    name: String,
    entries: Vec<SuiteEntry>,
    graph: DependencyGraph,
    workers: usize,
}

impl PluginSuite {
    /// Validate the plugin set against the graph rules and build the suite.
    ///
    /// Fails if any dependency names a plugin that is not declared earlier
    /// in `plugins` or would close a cycle; nothing of the suite survives a
    /// failure.
    pub fn new(
        name: &str,
        plugins: Vec<LoadedPlugin>,
        workers: usize,
    ) -> Result<Self, SuiteError> {
        let declared: Vec<(String, Vec<String>)> = plugins
            .iter()
            .map(|p| (p.name.clone(), p.dependencies.clone()))
            .collect();
        let graph = DependencyGraph::build(&declared)?;

        let entries = plugins
            .into_iter()
            .map(|p| SuiteEntry {
                component: Arc::new(PluginComponent {
                    plugin: p.instance,
                    qualified_name: p.qualified_name,
                }) as Arc<dyn Component<SuiteRunArgs>>,
                name: p.name,
                dependencies: p.dependencies,
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            entries,
            graph,
            workers: workers.max(1),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once every declared plugin survived validation
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.entries.is_empty() && self.entries.len() == self.graph.len()
    }

    /// Plugin names in manifest order
    #[must_use]
    pub fn plugin_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Read-only view of the suite's dependency graph
    #[must_use]
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every plugin against one work item.
    ///
    /// `base` seeds the dependency-less plugins under the `"base"` key and
    /// `ctx` is handed to each plugin invocation. Each call builds its own
    /// pipeline and worker pool, so concurrent runs are independent.
    pub fn run(
        &self,
        base: Payload,
        ctx: SuiteRunArgs,
    ) -> Result<HashMap<String, ComponentState>, SuiteError> {
        info!(
            "Running suite '{}' ({} plugins) on '{}'",
            self.name,
            self.entries.len(),
            ctx.source_name()
        );
        let mut pipeline: Pipeline<SuiteRunArgs> = Pipeline::with_workers(self.workers);
        for entry in &self.entries {
            pipeline.register(&entry.name, &entry.dependencies, Arc::clone(&entry.component))?;
        }
        let states = pipeline.run(base, ctx)?;
        Ok(states)
    }
}

impl fmt::Debug for PluginSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSuite")
            .field("name", &self.name)
            .field("plugins", &self.plugin_names())
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
