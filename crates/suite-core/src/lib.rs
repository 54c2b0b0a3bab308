//! Transcript Suite Core - Dependency-scheduled plugin execution
//!
//! This crate provides the scheduling core for a transcript analysis
//! system: a worker pool over OS threads, a dependency graph of named
//! components executed layer by layer, and a plugin suite subsystem that
//! loads externally authored analysis units from declarative manifests.

pub mod component;
pub mod error;
pub mod graph;
pub mod loader;
pub mod manifest;
pub mod payload;
pub mod pipeline;
pub mod plugin;
pub mod pool;
pub mod suite;

pub use component::{
    Component, ComponentResult, ComponentState, DependencyResults, BASE_RESULT_KEY,
};
pub use error::{
    GraphError, ManifestError, PipelineError, PoolError, SuiteError, TaskError, TaskPanic,
};
pub use graph::DependencyGraph;
pub use loader::{SuiteLoader, SuiteManager, SuiteWorkspace, MANIFEST_FILE};
pub use manifest::{PluginDescriptor, SuiteManifest, SuiteMetadata};
pub use payload::Payload;
pub use pipeline::Pipeline;
pub use plugin::{Plugin, PluginFactory, PluginRegistry, SuiteContext};
pub use pool::{TaskId, TaskOutcome, WorkerPool};
pub use suite::{LoadedPlugin, PluginSuite, SuiteRunArgs};
