//! The unit-of-work contract executed by the pipeline scheduler

use crate::error::TaskError;
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Key under which a dependency-less component receives the run's input.
///
/// The scheduler injects a single synthetic Success result under this key
/// so every component sees a non-empty dependency map.
pub const BASE_RESULT_KEY: &str = "base";

/// Lifecycle state of a component within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    /// Registered but not yet executed
    Ready,
    /// Executed and returned a payload
    Success,
    /// Returned an error, panicked, or was short-circuited by a failed dependency
    Failed,
}

/// Outcome of one component invocation
#[derive(Debug, Clone)]
pub struct ComponentResult {
    pub state: ComponentState,
    pub payload: Payload,
    pub runtime: Duration,
}

impl ComponentResult {
    #[must_use]
    pub fn ready() -> Self {
        Self {
            state: ComponentState::Ready,
            payload: Payload::Empty,
            runtime: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn success(payload: Payload, runtime: Duration) -> Self {
        Self {
            state: ComponentState::Success,
            payload,
            runtime,
        }
    }

    #[must_use]
    pub fn failed(runtime: Duration) -> Self {
        Self {
            state: ComponentState::Failed,
            payload: Payload::Empty,
            runtime,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == ComponentState::Success
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state == ComponentState::Failed
    }
}

/// Results of a component's direct dependencies, keyed by dependency name
pub type DependencyResults = HashMap<String, ComponentResult>;

/// A named unit of work.
///
/// `A` is the extra-argument type threaded through every component of a run
/// (suites pass their per-call context this way). Implementations must
/// tolerate concurrent invocation across runs; within a single run the
/// scheduler never re-enters the same component.
pub trait Component<A>: Send + Sync {
    /// Execute against the results of this component's direct dependencies.
    ///
    /// A dependency-less component receives exactly one entry, keyed
    /// [`BASE_RESULT_KEY`], holding the run's base input. Errors (and
    /// panics) are converted to a Failed result by the scheduler.
    fn execute(&self, deps: &DependencyResults, args: &A) -> Result<Payload, TaskError>;
}
