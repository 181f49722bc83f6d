//! Dependency-aware task scheduling
//!
//! Runs one task per declared library, never starting a task before all of
//! its dependencies have finished (successfully or not), and never running
//! more than the concurrency ceiling at once. Task bodies do blocking I/O
//! and run on the blocking thread pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::core::graph::{DroppedEdge, ExecutionPlan, TaskNode};
use crate::error::{BlockedTask, SchedulerError, SyncError, TaskError};

/// Successful end state of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResolution {
    /// Rebuilt and reinstalled
    Updated { reason: String },
    /// Nothing to do
    Unchanged { reason: String },
}

/// Work performed for one task
///
/// Implementations block; the scheduler moves every call onto the blocking
/// pool.
pub trait TaskRunner: Send + Sync + 'static {
    /// Process one library
    fn run(&self, task: &TaskNode) -> Result<TaskResolution, TaskError>;
}

/// Terminal state of a task in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Rebuilt and reinstalled
    Updated { reason: String },
    /// Skipped because nothing changed
    Unchanged { reason: String },
    /// Failed
    Failed { error: String },
    /// Never started because the run aborted first
    NotAttempted,
}

/// Outcome of one task
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Task name
    pub name: String,
    /// Terminal state
    pub status: TaskStatus,
    /// Wall time spent in the task
    pub duration: Duration,
}

impl TaskOutcome {
    fn from_result(name: String, result: Result<TaskResolution, TaskError>, duration: Duration) -> Self {
        let status = match result {
            Ok(TaskResolution::Updated { reason }) => TaskStatus::Updated { reason },
            Ok(TaskResolution::Unchanged { reason }) => TaskStatus::Unchanged { reason },
            Err(e) => TaskStatus::Failed {
                error: e.to_string(),
            },
        };
        Self {
            name,
            status,
            duration,
        }
    }

    fn not_attempted(name: String) -> Self {
        Self {
            name,
            status: TaskStatus::NotAttempted,
            duration: Duration::ZERO,
        }
    }
}

/// Result of a whole run, in processing order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One outcome per task
    pub outcomes: Vec<TaskOutcome>,
    /// Edges dropped to break cycles
    pub dropped_edges: Vec<DroppedEdge>,
}

impl RunReport {
    fn names_where(&self, pred: impl Fn(&TaskStatus) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| pred(&o.status))
            .map(|o| o.name.as_str())
            .collect()
    }

    /// Libraries that were rebuilt and reinstalled
    pub fn updated(&self) -> Vec<&str> {
        self.names_where(|s| matches!(s, TaskStatus::Updated { .. }))
    }

    /// Libraries skipped because nothing changed
    pub fn unchanged(&self) -> Vec<&str> {
        self.names_where(|s| matches!(s, TaskStatus::Unchanged { .. }))
    }

    /// Libraries that failed
    pub fn failed(&self) -> Vec<&str> {
        self.names_where(|s| matches!(s, TaskStatus::Failed { .. }))
    }

    /// Libraries never started because the run aborted
    pub fn not_attempted(&self) -> Vec<&str> {
        self.names_where(|s| matches!(s, TaskStatus::NotAttempted))
    }

    /// Outcome for `name`
    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Whether every task succeeded or was unchanged
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| {
            matches!(
                o.status,
                TaskStatus::Updated { .. } | TaskStatus::Unchanged { .. }
            )
        })
    }

    /// Turn a report with failures into an error naming them
    pub fn into_result(self) -> Result<Self, SyncError> {
        if self.is_success() {
            return Ok(self);
        }
        let failed = self.failed().into_iter().map(str::to_string).collect();
        Err(SyncError::Failed { failed })
    }
}

/// Callback invoked as each task finishes
pub type ProgressHook = Box<dyn Fn(&TaskOutcome) + Send + Sync>;

/// Runs task nodes through a [`TaskRunner`]
pub struct Scheduler<R> {
    runner: Arc<R>,
    concurrency: usize,
    on_complete: Option<ProgressHook>,
}

impl<R: TaskRunner> Scheduler<R> {
    /// Create a scheduler; a ceiling of 0 is treated as 1
    pub fn new(runner: R, concurrency: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            concurrency: concurrency.max(1),
            on_complete: None,
        }
    }

    /// Call `hook` with every outcome as soon as its task finishes
    #[must_use]
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    fn report(&self, outcome: &TaskOutcome) {
        if let Some(hook) = &self.on_complete {
            hook(outcome);
        }
    }

    /// Concurrency ceiling in effect
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every node
    ///
    /// With a ceiling of 1 (or at most one node) tasks run strictly one after
    /// another and the first failure aborts the run. Otherwise independent
    /// tasks run in parallel and a failure only marks that task.
    pub async fn run(&self, nodes: Vec<TaskNode>) -> Result<RunReport, SchedulerError> {
        let plan = ExecutionPlan::new(&nodes);
        let tasks: HashMap<String, TaskNode> =
            nodes.into_iter().map(|n| (n.name.clone(), n)).collect();

        let outcomes = if self.concurrency == 1 || plan.len() <= 1 {
            self.run_sequential(&plan, &tasks).await
        } else {
            self.run_concurrent(&plan, &tasks).await?
        };

        Ok(RunReport {
            outcomes,
            dropped_edges: plan.dropped().to_vec(),
        })
    }

    async fn run_sequential(
        &self,
        plan: &ExecutionPlan,
        tasks: &HashMap<String, TaskNode>,
    ) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut aborted = false;

        for name in plan.order() {
            if aborted {
                outcomes.push(TaskOutcome::not_attempted(name.clone()));
                continue;
            }

            let (name, result, duration) = run_blocking(self.runner.clone(), tasks[name].clone()).await;
            let outcome = TaskOutcome::from_result(name, result, duration);
            if let TaskStatus::Failed { error } = &outcome.status {
                tracing::error!("{}: {error}; aborting remaining tasks", outcome.name);
                aborted = true;
            }
            self.report(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn run_concurrent(
        &self,
        plan: &ExecutionPlan,
        tasks: &HashMap<String, TaskNode>,
    ) -> Result<Vec<TaskOutcome>, SchedulerError> {
        let mut started: HashSet<&str> = HashSet::new();
        let mut finished: HashSet<String> = HashSet::new();
        let mut outcomes: HashMap<String, TaskOutcome> = HashMap::new();
        let mut running = JoinSet::new();

        while finished.len() < plan.len() {
            for name in plan.order() {
                if running.len() >= self.concurrency {
                    break;
                }
                if started.contains(name.as_str()) {
                    continue;
                }
                let ready = plan
                    .dependencies(name)
                    .iter()
                    .all(|dep| finished.contains(dep));
                if !ready {
                    continue;
                }

                started.insert(name);
                tracing::debug!("Starting {name} ({} running)", running.len() + 1);
                running.spawn(run_blocking(self.runner.clone(), tasks[name].clone()));
            }

            if running.is_empty() {
                return Err(SchedulerError::Stuck {
                    blocked: blocked_tasks(plan, &finished),
                });
            }

            match running.join_next().await {
                Some(Ok((name, result, duration))) => {
                    let outcome = TaskOutcome::from_result(name.clone(), result, duration);
                    if let TaskStatus::Failed { error } = &outcome.status {
                        tracing::error!("{name}: {error}");
                    }
                    self.report(&outcome);
                    finished.insert(name.clone());
                    outcomes.insert(name, outcome);
                }
                Some(Err(e)) => {
                    return Err(SchedulerError::Join {
                        error: e.to_string(),
                    })
                }
                None => {}
            }
        }

        Ok(plan
            .order()
            .iter()
            .filter_map(|name| outcomes.remove(name))
            .collect())
    }
}

/// Run one task on the blocking pool, converting a panic into a task error
async fn run_blocking<R: TaskRunner>(
    runner: Arc<R>,
    task: TaskNode,
) -> (String, Result<TaskResolution, TaskError>, Duration) {
    let name = task.name.clone();
    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || runner.run(&task))
        .await
        .unwrap_or_else(|e| {
            Err(TaskError::Panicked {
                message: e.to_string(),
            })
        });
    (name, result, start.elapsed())
}

/// Unfinished tasks and the dependencies each still waits on
fn blocked_tasks(plan: &ExecutionPlan, finished: &HashSet<String>) -> Vec<BlockedTask> {
    plan.order()
        .iter()
        .filter(|name| !finished.contains(*name))
        .map(|name| BlockedTask {
            name: name.clone(),
            waiting_on: plan
                .dependencies(name)
                .iter()
                .filter(|dep| !finished.contains(*dep))
                .cloned()
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutorError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records start/finish events and fails the configured names
    #[derive(Default)]
    struct RecordingRunner {
        events: Mutex<Vec<String>>,
        failing: Vec<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl RecordingRunner {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                ..Self::default()
            }
        }

        fn failing(mut self, names: &[&str]) -> Self {
            self.failing = names.iter().map(|n| (*n).to_string()).collect();
            self
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn index(&self, event: &str) -> usize {
            self.events()
                .iter()
                .position(|e| e == event)
                .unwrap_or_else(|| panic!("missing event {event}"))
        }
    }

    impl TaskRunner for RecordingRunner {
        fn run(&self, task: &TaskNode) -> Result<TaskResolution, TaskError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.events.lock().unwrap().push(format!("start:{}", task.name));

            std::thread::sleep(self.delay);

            self.events.lock().unwrap().push(format!("end:{}", task.name));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&task.name) {
                return Err(TaskError::Executor(ExecutorError::Build {
                    package: task.name.clone(),
                    error: "exit code 1".to_string(),
                }));
            }
            Ok(TaskResolution::Updated {
                reason: "no previous cache record".to_string(),
            })
        }
    }

    /// Shares a runner between the scheduler and the test
    struct Shared(Arc<RecordingRunner>);

    impl TaskRunner for Shared {
        fn run(&self, task: &TaskNode) -> Result<TaskResolution, TaskError> {
            self.0.run(task)
        }
    }

    fn node(name: &str, deps: &[&str]) -> TaskNode {
        TaskNode::new(name, format!("/src/{name}")).with_dependencies(deps.iter().copied())
    }

    async fn run_with(
        runner: RecordingRunner,
        concurrency: usize,
        nodes: Vec<TaskNode>,
    ) -> (Arc<RecordingRunner>, RunReport) {
        let runner = Arc::new(runner);
        let report = Scheduler::new(Shared(runner.clone()), concurrency)
            .run(nodes)
            .await
            .unwrap();
        (runner, report)
    }

    #[tokio::test]
    async fn test_chain_respects_dependencies() {
        let nodes = vec![node("a", &["b"]), node("b", &["c"]), node("c", &[])];
        let (runner, report) = run_with(RecordingRunner::new(5), 4, nodes).await;

        assert!(report.is_success());
        assert!(runner.index("end:c") < runner.index("start:b"));
        assert!(runner.index("end:b") < runner.index("start:a"));
    }

    #[tokio::test]
    async fn test_cycle_terminates_and_runs_each_once() {
        let nodes = vec![node("a", &["b"]), node("b", &["a"])];
        let (runner, report) = run_with(RecordingRunner::new(1), 2, nodes).await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.dropped_edges.len(), 1);
        let events = runner.events();
        assert_eq!(events.iter().filter(|e| *e == "start:a").count(), 1);
        assert_eq!(events.iter().filter(|e| *e == "start:b").count(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let nodes: Vec<_> = (0..8).map(|i| node(&format!("t{i}"), &[])).collect();
        let (runner, report) = run_with(RecordingRunner::new(30), 3, nodes).await;

        assert!(report.is_success());
        assert_eq!(report.updated().len(), 8);
        let max = runner.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "saw {max} tasks in flight");
        assert!(max >= 2, "expected some parallelism, saw {max}");
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let nodes = vec![node("a", &[]), node("b", &[]), node("c", &[])];
        let (_, report) = run_with(RecordingRunner::new(5).failing(&["a"]), 3, nodes).await;

        assert!(!report.is_success());
        assert_eq!(report.failed(), vec!["a"]);
        assert_eq!(report.updated(), vec!["b", "c"]);

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains('a'));
    }

    #[tokio::test]
    async fn test_failure_unblocks_dependents() {
        let nodes = vec![node("app", &["lib"]), node("lib", &[])];
        let (runner, report) = run_with(RecordingRunner::new(1).failing(&["lib"]), 2, nodes).await;

        assert_eq!(report.failed(), vec!["lib"]);
        assert_eq!(report.updated(), vec!["app"]);
        assert!(runner.index("end:lib") < runner.index("start:app"));
    }

    #[tokio::test]
    async fn test_sequential_keeps_declared_order() {
        let nodes = vec![node("z", &[]), node("a", &[]), node("m", &[])];
        let (runner, report) = run_with(RecordingRunner::new(1), 1, nodes).await;

        assert_eq!(
            runner.events(),
            vec!["start:z", "end:z", "start:a", "end:a", "start:m", "end:m"]
        );
        assert_eq!(runner.max_in_flight.load(Ordering::SeqCst), 1);
        let names: Vec<_> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn test_sequential_failure_aborts_run() {
        let nodes = vec![node("a", &[]), node("b", &[]), node("c", &[])];
        let (runner, report) = run_with(RecordingRunner::new(1).failing(&["b"]), 1, nodes).await;

        assert_eq!(report.updated(), vec!["a"]);
        assert_eq!(report.failed(), vec!["b"]);
        assert_eq!(report.not_attempted(), vec!["c"]);
        assert!(!runner.events().contains(&"start:c".to_string()));
    }

    #[tokio::test]
    async fn test_panicking_task_is_a_failure() {
        struct Panics;
        impl TaskRunner for Panics {
            fn run(&self, task: &TaskNode) -> Result<TaskResolution, TaskError> {
                if task.name == "bad" {
                    panic!("boom");
                }
                Ok(TaskResolution::Unchanged {
                    reason: "no changes detected".to_string(),
                })
            }
        }

        let report = Scheduler::new(Panics, 2)
            .run(vec![node("bad", &[]), node("good", &[])])
            .await
            .unwrap();
        assert_eq!(report.failed(), vec!["bad"]);
        assert_eq!(report.unchanged(), vec!["good"]);
    }

    #[tokio::test]
    async fn test_progress_hook_sees_every_task() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let scheduler = Scheduler::new(RecordingRunner::new(1), 2).with_progress(Box::new(
            move |outcome: &TaskOutcome| sink.lock().unwrap().push(outcome.name.clone()),
        ));

        scheduler
            .run(vec![node("a", &[]), node("b", &["a"])])
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_run() {
        let (_, report) = run_with(RecordingRunner::new(0), 4, Vec::new()).await;
        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn test_blocked_tasks_diagnostic() {
        let plan = ExecutionPlan::new(&[node("a", &["b"]), node("b", &[])]);
        let blocked = blocked_tasks(&plan, &HashSet::new());
        assert_eq!(blocked.len(), 2);

        let err = SchedulerError::Stuck { blocked };
        let message = err.to_string();
        assert!(message.contains("'a' waits on [b]"));
        assert!(message.contains("'b' waits on []"));
    }
}
