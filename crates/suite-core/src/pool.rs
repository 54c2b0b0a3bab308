//! Bounded worker pool backing the pipeline scheduler.
//!
//! A fixed set of OS threads pulls jobs off a crossbeam channel. Completion
//! state lives in a mutex-protected task table with a condvar for blocking
//! waits, so submission and polling are safe from any thread. Panics inside
//! a job are captured into the task's result slot; the worker survives.

use crate::error::{PoolError, TaskPanic};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Handle identifying one submitted task
pub type TaskId = u64;

/// What a finished task produced: its value, or the captured panic
pub type TaskOutcome<T> = Result<T, TaskPanic>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Running,
    Cancelled,
    Finished,
}

struct TaskSlot<T> {
    state: TaskState,
    outcome: Option<TaskOutcome<T>>,
}

struct PoolShared<T> {
    table: Mutex<HashMap<TaskId, TaskSlot<T>>>,
    done: Condvar,
}

struct WorkItem<T> {
    id: TaskId,
    job: Box<dyn FnOnce() -> T + Send>,
}

/// Fixed-size pool of worker threads executing jobs that return `T`
pub struct WorkerPool<T> {
    shared: Arc<PoolShared<T>>,
    sender: Option<Sender<WorkItem<T>>>,
    workers: Vec<JoinHandle<()>>,
    next_id: AtomicU64,
    size: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn a pool with the given number of workers (clamped to >= 1)
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let size = workers.max(1);
        let shared = Arc::new(PoolShared {
            table: Mutex::new(HashMap::new()),
            done: Condvar::new(),
        });
        let (sender, receiver) = unbounded::<WorkItem<T>>();
        let mut handles = Vec::with_capacity(size);
        for _ in 0..size {
            let shared = Arc::clone(&shared);
            let receiver = receiver.clone();
            handles.push(thread::spawn(move || worker_loop(shared, receiver)));
        }
        debug!("Worker pool started with {} workers", size);
        Self {
            shared,
            sender: Some(sender),
            workers: handles,
            next_id: AtomicU64::new(0),
            size,
        }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.size
    }

    /// Queue a job and return its handle.
    ///
    /// The job runs on some worker thread; callers must not assume which.
    pub fn submit<F>(&self, job: F) -> TaskId
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut table = self.shared.table.lock().unwrap();
            table.insert(
                id,
                TaskSlot {
                    state: TaskState::Pending,
                    outcome: None,
                },
            );
        }
        let item = WorkItem {
            id,
            job: Box::new(job),
        };
        let closed = match &self.sender {
            Some(sender) => sender.send(item).is_err(),
            None => true,
        };
        if closed {
            // Queue is gone; fold the rejection into the task's own slot.
            let mut table = self.shared.table.lock().unwrap();
            if let Some(slot) = table.get_mut(&id) {
                slot.state = TaskState::Finished;
                slot.outcome = Some(Err(TaskPanic {
                    message: "worker pool is shut down".to_string(),
                }));
            }
            self.shared.done.notify_all();
            warn!("Task {} rejected: worker pool is shut down", id);
        }
        id
    }

    /// Block until the task reaches a terminal state (finished or cancelled)
    pub fn wait(&self, id: TaskId) -> Result<(), PoolError> {
        let mut table = self.shared.table.lock().unwrap();
        loop {
            match table.get(&id) {
                None => return Err(PoolError::TaskNotFound(id)),
                Some(slot) => {
                    if matches!(slot.state, TaskState::Finished | TaskState::Cancelled) {
                        return Ok(());
                    }
                }
            }
            table = self.shared.done.wait(table).unwrap();
        }
    }

    /// Block until no tracked task is pending or running
    pub fn wait_all(&self) {
        let mut table = self.shared.table.lock().unwrap();
        loop {
            let busy = table
                .values()
                .any(|s| matches!(s.state, TaskState::Pending | TaskState::Running));
            if !busy {
                return;
            }
            table = self.shared.done.wait(table).unwrap();
        }
    }

    /// Take a finished task's outcome out of the table.
    ///
    /// The slot is consumed: asking again for the same id reports
    /// `TaskNotFound`. A task that has not reached a terminal state reports
    /// `TaskNotFinished`.
    pub fn result(&self, id: TaskId) -> Result<TaskOutcome<T>, PoolError> {
        let mut table = self.shared.table.lock().unwrap();
        let state = match table.get(&id) {
            None => return Err(PoolError::TaskNotFound(id)),
            Some(slot) => slot.state,
        };
        match state {
            TaskState::Pending | TaskState::Running => Err(PoolError::TaskNotFinished(id)),
            TaskState::Cancelled => {
                table.remove(&id);
                Err(PoolError::TaskCancelled(id))
            }
            TaskState::Finished => match table.remove(&id).and_then(|slot| slot.outcome) {
                Some(outcome) => Ok(outcome),
                None => Err(PoolError::TaskNotFound(id)),
            },
        }
    }

    /// Cancel a task that has not started yet.
    ///
    /// Running and finished tasks are not preemptible and report
    /// `TaskNotCancellable`. Cancelling an already-cancelled task is a no-op.
    pub fn cancel(&self, id: TaskId) -> Result<(), PoolError> {
        let mut table = self.shared.table.lock().unwrap();
        let Some(slot) = table.get_mut(&id) else {
            return Err(PoolError::TaskNotFound(id));
        };
        match slot.state {
            TaskState::Pending => {
                slot.state = TaskState::Cancelled;
                self.shared.done.notify_all();
                debug!("Task {} cancelled", id);
                Ok(())
            }
            TaskState::Cancelled => Ok(()),
            TaskState::Running | TaskState::Finished => Err(PoolError::TaskNotCancellable(id)),
        }
    }
}

impl<T: Send + 'static> Default for WorkerPool<T> {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Worker thread panicked during shutdown");
            }
        }
        debug!("Worker pool shut down");
    }
}

fn worker_loop<T: Send + 'static>(shared: Arc<PoolShared<T>>, receiver: Receiver<WorkItem<T>>) {
    while let Ok(WorkItem { id, job }) = receiver.recv() {
        {
            let mut table = shared.table.lock().unwrap();
            match table.get_mut(&id) {
                Some(slot) if slot.state == TaskState::Cancelled => {
                    shared.done.notify_all();
                    continue;
                }
                Some(slot) => slot.state = TaskState::Running,
                None => continue,
            }
        }
        let outcome = catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            warn!("Task {} panicked: {}", id, message);
            TaskPanic { message }
        });
        let mut table = shared.table.lock().unwrap();
        if let Some(slot) = table.get_mut(&id) {
            slot.state = TaskState::Finished;
            slot.outcome = Some(outcome);
        }
        shared.done.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unrecognized panic payload".to_string()
    }
}
