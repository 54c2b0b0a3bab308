//! Layer-by-layer scheduler over a dependency graph.
//!
//! The scheduler drives dispatch from the calling thread: it computes the
//! current frontier, hands every runnable component to the worker pool,
//! blocks until the whole layer is done, and repeats. A failed component
//! never crashes the run; its transitive dependents are marked Failed
//! without being invoked while independent branches keep executing.

use crate::component::{
    Component, ComponentResult, ComponentState, DependencyResults, BASE_RESULT_KEY,
};
use crate::error::{GraphError, PipelineError};
use crate::graph::DependencyGraph;
use crate::payload::Payload;
use crate::pool::WorkerPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Dependency-ordered executor for registered components.
///
/// `A` is the extra-argument type cloned into every component invocation.
/// The canonical dependency map is kept separately from the graph; each
/// `run` works on a disposable copy and the graph is rebuilt afterwards,
/// so the pipeline is restartable and `register` stays valid between runs.
pub struct Pipeline<A> {
    components: HashMap<String, Arc<dyn Component<A>>>,
    dependency_map: HashMap<String, Vec<String>>,
    order: Vec<String>,
    graph: DependencyGraph,
    pool: WorkerPool<ComponentResult>,
}

impl<A: Clone + Send + Sync + 'static> Pipeline<A> {
    /// Pipeline with one worker per available CPU
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(num_cpus::get())
    }

    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            components: HashMap::new(),
            dependency_map: HashMap::new(),
            order: Vec::new(),
            graph: DependencyGraph::new(),
            pool: WorkerPool::new(workers),
        }
    }

    /// Register a component under a unique name with its dependencies.
    ///
    /// Dependencies must already be registered; on error nothing is
    /// partially added.
    pub fn register(
        &mut self,
        name: &str,
        dependencies: &[String],
        component: Arc<dyn Component<A>>,
    ) -> Result<(), GraphError> {
        self.graph.add_component(name, dependencies)?;
        self.components.insert(name.to_string(), component);
        self.dependency_map
            .insert(name.to_string(), dependencies.to_vec());
        self.order.push(name.to_string());
        debug!(
            "Registered component '{}' with {} dependencies",
            name,
            dependencies.len()
        );
        Ok(())
    }

    /// Registered component names in declaration order
    #[must_use]
    pub fn component_names(&self) -> &[String] {
        &self.order
    }

    /// Read-only view of the canonical graph
    #[must_use]
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Execute every registered component in dependency order.
    ///
    /// Returns the terminal state of each component by name. Component
    /// faults (errors and panics) appear as `Failed` entries, never as an
    /// `Err` from this call; `Err` is reserved for scheduler bookkeeping
    /// problems.
    pub fn run(
        &mut self,
        base_input: Payload,
        args: A,
    ) -> Result<HashMap<String, ComponentState>, PipelineError> {
        let run_started = Instant::now();
        let mut graph = self.graph.clone();
        let mut context: HashMap<String, ComponentResult> = HashMap::new();
        let mut states: HashMap<String, ComponentState> = self
            .order
            .iter()
            .map(|name| (name.clone(), ComponentState::Ready))
            .collect();
        let base_result = ComponentResult::success(base_input, Duration::ZERO);
        let mut layers = 0usize;

        while !graph.is_empty() {
            let frontier = graph.roots();
            if frontier.is_empty() {
                warn!(
                    "No runnable components but {} remain; aborting run",
                    graph.len()
                );
                break;
            }
            layers += 1;
            debug!("Dispatching layer {}: {:?}", layers, frontier);

            let mut dispatched = Vec::with_capacity(frontier.len());
            for name in frontier {
                let dep_names = self
                    .dependency_map
                    .get(&name)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let mut dep_results: DependencyResults = HashMap::new();
                if dep_names.is_empty() {
                    dep_results.insert(BASE_RESULT_KEY.to_string(), base_result.clone());
                } else {
                    for dep in dep_names {
                        if let Some(result) = context.get(dep) {
                            dep_results.insert(dep.clone(), result.clone());
                        }
                    }
                }

                if dep_results.values().any(ComponentResult::is_failed) {
                    warn!(
                        "Component '{}' short-circuited: an upstream dependency failed",
                        name
                    );
                    states.insert(name.clone(), ComponentState::Failed);
                    context.insert(name.clone(), ComponentResult::failed(Duration::ZERO));
                    graph.remove(&name);
                    continue;
                }

                let Some(component) = self.components.get(&name).map(Arc::clone) else {
                    warn!("Component '{}' has no registered body; marking failed", name);
                    states.insert(name.clone(), ComponentState::Failed);
                    context.insert(name.clone(), ComponentResult::failed(Duration::ZERO));
                    graph.remove(&name);
                    continue;
                };
                let task_args = args.clone();
                let task_name = name.clone();
                let id = self.pool.submit(move || {
                    let started = Instant::now();
                    match component.execute(&dep_results, &task_args) {
                        Ok(payload) => ComponentResult::success(payload, started.elapsed()),
                        Err(err) => {
                            warn!("Component '{}' failed: {}", task_name, err);
                            ComponentResult::failed(started.elapsed())
                        }
                    }
                });
                dispatched.push((id, name));
            }

            // Barrier: the layer must fully settle before the next frontier.
            for (id, name) in dispatched {
                self.pool.wait(id)?;
                let result = match self.pool.result(id)? {
                    Ok(result) => result,
                    Err(panic) => {
                        warn!("Component '{}' panicked: {}", name, panic.message);
                        ComponentResult::failed(Duration::ZERO)
                    }
                };
                states.insert(name.clone(), result.state);
                context.insert(name.clone(), result);
                graph.remove(&name);
            }
        }

        self.graph = self.rebuild_graph()?;

        let succeeded = states
            .values()
            .filter(|s| **s == ComponentState::Success)
            .count();
        info!(
            "Pipeline run complete: {}/{} components succeeded across {} layers in {:?}",
            succeeded,
            states.len(),
            layers,
            run_started.elapsed()
        );
        Ok(states)
    }

    fn rebuild_graph(&self) -> Result<DependencyGraph, GraphError> {
        let mut rebuilt = DependencyGraph::new();
        for name in &self.order {
            if let Some(deps) = self.dependency_map.get(name) {
                rebuilt.add_component(name, deps)?;
            }
        }
        Ok(rebuilt)
    }
}

impl<A: Clone + Send + Sync + 'static> Default for Pipeline<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Probe {
        name: String,
        fail: bool,
        panic: bool,
        sleep: Option<Duration>,
        calls: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
        captured: Arc<Mutex<Option<DependencyResults>>>,
    }

    impl Probe {
        fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Self::default()
            }
        }
    }

    impl Component<String> for Probe {
        fn execute(&self, deps: &DependencyResults, args: &String) -> Result<Payload, TaskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.captured.lock().unwrap() = Some(deps.clone());
            if let Some(nap) = self.sleep {
                std::thread::sleep(nap);
            }
            self.log.lock().unwrap().push(self.name.clone());
            if self.panic {
                panic!("induced panic in {}", self.name);
            }
            if self.fail {
                return Err(TaskError::ExecutionFailed(format!(
                    "induced failure in {}",
                    self.name
                )));
            }
            Ok(Payload::Json(
                serde_json::json!({ "from": self.name, "args": args })
            ))
        }
    }

    fn args() -> String {
        "run-args".to_string()
    }

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_base_key_injected_for_dependency_less_component() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(2);
        let probe = Probe::named("solo");
        let captured = Arc::clone(&probe.captured);
        pipeline.register("solo", &[], Arc::new(probe)).unwrap();

        let input = Payload::Json(serde_json::json!({"media": "demo.wav"}));
        let states = pipeline.run(input.clone(), args()).unwrap();

        assert_eq!(states["solo"], ComponentState::Success);
        let seen = captured.lock().unwrap().clone().unwrap();
        assert_eq!(seen.len(), 1);
        let base = &seen[BASE_RESULT_KEY];
        assert!(base.is_success());
        assert_eq!(base.payload, input);
    }

    #[test]
    fn test_chain_runs_in_dependency_order() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(4);
        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, dep) in [("a", None), ("b", Some("a")), ("c", Some("b"))] {
            let mut probe = Probe::named(name);
            probe.log = Arc::clone(&log);
            let dependencies = dep.map(|d| deps(&[d])).unwrap_or_default();
            pipeline.register(name, &dependencies, Arc::new(probe)).unwrap();
        }

        let states = pipeline.run(Payload::Empty, args()).unwrap();
        assert!(states.values().all(|s| *s == ComponentState::Success));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dependency_results_reach_dependent() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(2);
        pipeline
            .register("producer", &[], Arc::new(Probe::named("producer")))
            .unwrap();
        let consumer = Probe::named("consumer");
        let captured = Arc::clone(&consumer.captured);
        pipeline
            .register("consumer", &deps(&["producer"]), Arc::new(consumer))
            .unwrap();

        pipeline.run(Payload::Empty, args()).unwrap();

        let seen = captured.lock().unwrap().clone().unwrap();
        assert_eq!(seen.len(), 1, "only direct dependencies are visible");
        let from_producer = &seen["producer"];
        assert!(from_producer.is_success());
        assert_eq!(
            from_producer.payload.as_json().unwrap()["from"],
            serde_json::json!("producer")
        );
    }

    #[test]
    fn test_failure_cascades_without_invoking_dependents() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(2);
        let mut a = Probe::named("a");
        a.fail = true;
        let a_calls = Arc::clone(&a.calls);
        let b = Probe::named("b");
        let b_calls = Arc::clone(&b.calls);
        let c = Probe::named("c");
        let c_calls = Arc::clone(&c.calls);

        pipeline.register("a", &[], Arc::new(a)).unwrap();
        pipeline.register("b", &deps(&["a"]), Arc::new(b)).unwrap();
        pipeline.register("c", &deps(&["b"]), Arc::new(c)).unwrap();

        let states = pipeline.run(Payload::Empty, args()).unwrap();

        assert_eq!(states["a"], ComponentState::Failed);
        assert_eq!(states["b"], ComponentState::Failed);
        assert_eq!(states["c"], ComponentState::Failed);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0, "b must never be invoked");
        assert_eq!(c_calls.load(Ordering::SeqCst), 0, "c must never be invoked");
    }

    #[test]
    fn test_independent_branch_survives_failure() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(2);
        let mut doomed = Probe::named("doomed");
        doomed.fail = true;
        pipeline.register("doomed", &[], Arc::new(doomed)).unwrap();
        pipeline
            .register("blocked", &deps(&["doomed"]), Arc::new(Probe::named("blocked")))
            .unwrap();
        pipeline
            .register("healthy", &[], Arc::new(Probe::named("healthy")))
            .unwrap();

        let states = pipeline.run(Payload::Empty, args()).unwrap();
        assert_eq!(states["doomed"], ComponentState::Failed);
        assert_eq!(states["blocked"], ComponentState::Failed);
        assert_eq!(states["healthy"], ComponentState::Success);
    }

    #[test]
    fn test_diamond_partial_failure() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(4);
        pipeline.register("a", &[], Arc::new(Probe::named("a"))).unwrap();
        let mut b = Probe::named("b");
        b.fail = true;
        pipeline.register("b", &deps(&["a"]), Arc::new(b)).unwrap();
        pipeline
            .register("c", &deps(&["a"]), Arc::new(Probe::named("c")))
            .unwrap();
        pipeline
            .register("d", &deps(&["b", "c"]), Arc::new(Probe::named("d")))
            .unwrap();

        let states = pipeline.run(Payload::Empty, args()).unwrap();
        assert_eq!(states["a"], ComponentState::Success);
        assert_eq!(states["b"], ComponentState::Failed);
        assert_eq!(states["c"], ComponentState::Success);
        assert_eq!(states["d"], ComponentState::Failed);
    }

    #[test]
    fn test_panic_degrades_to_failed() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(2);
        let mut bomb = Probe::named("bomb");
        bomb.panic = true;
        pipeline.register("bomb", &[], Arc::new(bomb)).unwrap();
        pipeline
            .register("calm", &[], Arc::new(Probe::named("calm")))
            .unwrap();

        let states = pipeline.run(Payload::Empty, args()).unwrap();
        assert_eq!(states["bomb"], ComponentState::Failed);
        assert_eq!(states["calm"], ComponentState::Success);
    }

    #[test]
    fn test_rerun_rebuilds_identical_graph() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(2);
        let a = Probe::named("a");
        let a_calls = Arc::clone(&a.calls);
        pipeline.register("a", &[], Arc::new(a)).unwrap();
        pipeline
            .register("b", &deps(&["a"]), Arc::new(Probe::named("b")))
            .unwrap();

        let first = pipeline.run(Payload::Empty, args()).unwrap();
        let names_after_first = pipeline.dependency_graph().names().to_vec();
        let parents_after_first = pipeline.dependency_graph().parents_map();

        let second = pipeline.run(Payload::Empty, args()).unwrap();
        let names_after_second = pipeline.dependency_graph().names().to_vec();
        let parents_after_second = pipeline.dependency_graph().parents_map();

        assert_eq!(first, second);
        assert_eq!(names_after_first, names_after_second);
        assert_eq!(parents_after_first, parents_after_second);
        assert_eq!(names_after_first, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(a_calls.load(Ordering::SeqCst), 2, "components are reused across runs");
    }

    #[test]
    fn test_layer_runs_concurrently() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(10);
        let nap = Duration::from_millis(150);
        for i in 0..10 {
            let mut probe = Probe::named(&format!("sleepy-{i}"));
            probe.sleep = Some(nap);
            pipeline
                .register(&format!("sleepy-{i}"), &[], Arc::new(probe))
                .unwrap();
        }

        let started = Instant::now();
        let states = pipeline.run(Payload::Empty, args()).unwrap();
        let elapsed = started.elapsed();

        assert!(states.values().all(|s| *s == ComponentState::Success));
        // Ten sequential sleeps would take ~1.5s.
        assert!(
            elapsed < Duration::from_millis(750),
            "expected one parallel layer, took {elapsed:?}"
        );
    }

    #[test]
    fn test_extra_args_reach_components() {
        // The probe folds args into its payload; inspect through a dependent.
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(1);
        pipeline
            .register("echo", &[], Arc::new(Probe::named("echo")))
            .unwrap();
        let sink = Probe::named("sink");
        let captured = Arc::clone(&sink.captured);
        pipeline
            .register("sink", &deps(&["echo"]), Arc::new(sink))
            .unwrap();
        pipeline.run(Payload::Empty, "special".to_string()).unwrap();

        let seen = captured.lock().unwrap().clone().unwrap();
        assert_eq!(
            seen["echo"].payload.as_json().unwrap()["args"],
            serde_json::json!("special")
        );
    }

    #[test]
    fn test_register_after_run_extends_pipeline() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(2);
        pipeline.register("a", &[], Arc::new(Probe::named("a"))).unwrap();
        let first = pipeline.run(Payload::Empty, args()).unwrap();
        assert_eq!(first.len(), 1);

        pipeline
            .register("b", &deps(&["a"]), Arc::new(Probe::named("b")))
            .unwrap();
        let second = pipeline.run(Payload::Empty, args()).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second["b"], ComponentState::Success);
    }

    #[test]
    fn test_register_rejects_graph_violations() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(1);
        pipeline.register("a", &[], Arc::new(Probe::named("a"))).unwrap();

        let dup = pipeline.register("a", &[], Arc::new(Probe::named("a")));
        assert!(matches!(dup, Err(GraphError::DuplicateComponent(_))));

        let fwd = pipeline.register("b", &deps(&["missing"]), Arc::new(Probe::named("b")));
        assert!(matches!(fwd, Err(GraphError::UnknownDependency { .. })));

        // Failed registrations leave no trace.
        assert_eq!(pipeline.component_names(), &["a".to_string()]);
        let states = pipeline.run(Payload::Empty, args()).unwrap();
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn test_empty_pipeline_runs_to_empty_map() {
        let mut pipeline: Pipeline<String> = Pipeline::with_workers(1);
        let states = pipeline.run(Payload::Empty, args()).unwrap();
        assert!(states.is_empty());
    }
}
