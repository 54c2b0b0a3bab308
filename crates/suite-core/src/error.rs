//! Error types for graph construction, pool operations, task bodies,
//! manifest parsing, and suite loading

use crate::pool::TaskId;
use std::path::PathBuf;
use thiserror::Error;

/// Dependency graph construction errors.
///
/// Any of these aborts the construction call that raised it and leaves the
/// graph exactly as it was before the offending component.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate component: '{0}' is already registered")]
    DuplicateComponent(String),

    #[error("Unknown dependency: '{component}' depends on unregistered '{dependency}'")]
    UnknownDependency {
        component: String,
        dependency: String,
    },

    #[error("Cycle detected: edge '{from}' -> '{to}' would close a cycle")]
    CycleDetected { from: String, to: String },
}

/// Worker pool bookkeeping errors, surfaced directly to the caller
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    #[error("Task {0} not finished")]
    TaskNotFinished(TaskId),

    #[error("Task {0} was cancelled")]
    TaskCancelled(TaskId),

    #[error("Task {0} cannot be cancelled once started")]
    TaskNotCancellable(TaskId),
}

/// A fault captured from inside a submitted task body.
///
/// The worker thread survives; the panic payload is reduced to a message.
#[derive(Debug, Error, Clone)]
#[error("Task panicked: {message}")]
pub struct TaskPanic {
    pub message: String,
}

/// Errors a component or plugin body may return from its execute/apply call.
///
/// These never escape the scheduler as crashes; each one degrades the owning
/// component to a Failed result.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Missing dependency payload: {0}")]
    MissingPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Scheduler run errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Manifest reading and validation errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Cannot read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Manifest field '{0}' is missing or empty")]
    MissingField(&'static str),

    #[error("Manifest declares no plugins")]
    NoPlugins,

    #[error("Duplicate plugin_name: '{0}'")]
    DuplicatePlugin(String),

    #[error("Plugin '{plugin}' references unknown dependency '{dependency}'")]
    UnknownDependency { plugin: String, dependency: String },
}

/// Suite loading and execution errors.
///
/// A load-time error means nothing was registered for that suite.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Suite IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Unrecognized suite source: {0}")]
    InvalidSource(PathBuf),

    #[error("Missing plugin source file: {0}")]
    MissingSource(PathBuf),

    #[error("No plugin factory registered for module '{0}'")]
    UnknownModule(String),

    #[error("Plugin '{plugin}' failed to construct: {source}")]
    Construction {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_display() {
        let err = GraphError::UnknownDependency {
            component: "b".to_string(),
            dependency: "a".to_string(),
        };
        assert!(err.to_string().contains("'b'"));
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_pool_error_display() {
        assert_eq!(PoolError::TaskNotFound(7).to_string(), "Task 7 not found");
    }

    #[test]
    fn test_task_error_conversions() {
        let io: TaskError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, TaskError::Io(_)));

        let anyhow_err: TaskError = anyhow::anyhow!("boom").into();
        assert!(matches!(anyhow_err, TaskError::Other(_)));
    }

    #[test]
    fn test_suite_error_wraps_manifest_error() {
        let err: SuiteError = ManifestError::NoPlugins.into();
        assert!(matches!(err, SuiteError::Manifest(ManifestError::NoPlugins)));
    }
}
