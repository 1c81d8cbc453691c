use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::registry::{Task, TaskRegistry};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - pulling a requested task's prerequisites into the run
/// - deciding when a task is ready (all prerequisites succeeded)
/// - skipping every not-yet-started task once something fails
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
    /// Whether any task failed in the active run.
    current_run_failed: bool,
    /// Set by [`Scheduler::step_halt`]: the active run starts nothing new.
    current_run_halted: bool,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`TaskRegistry`].
    pub fn from_registry(registry: &TaskRegistry) -> Self {
        let graph = DagGraph::from_registry(registry);

        let mut tasks = HashMap::new();
        for task in registry.tasks() {
            let deps = graph.dependencies_of(&task.name).to_vec();
            let info = TaskInfo::from_task(task.clone(), deps);
            tasks.insert(task.name.clone(), info);
        }

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
            current_run_failed: false,
            current_run_halted: false,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Whether a task has failed in the active run.
    pub fn current_run_failed(&self) -> bool {
        self.current_run_id.is_some() && self.current_run_failed
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in the *active* run.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        let mut names: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether the prerequisites of `task` are satisfied for the current run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Start a new run, resetting per-run state but keeping history.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.current_run_failed = false;
        self.current_run_halted = false;

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new DAG run");
    }

    /// Request a task (and its prerequisites) in the current run.
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task).newly_scheduled
    }

    /// Record a finished task and return whatever became ready.
    pub fn handle_completion(&mut self, task: &str, outcome: &TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_trigger` that returns a rich [`SchedulerStep`].
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        self.trigger_step_internal(task)
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Stop the active run from starting anything new.
    ///
    /// Pending tasks are skipped. Running tasks keep going and their
    /// completions are still recorded; the run ends with the last of them.
    pub fn step_halt(&mut self) -> SchedulerStep {
        if self.current_run_id.is_none() {
            return SchedulerStep::default();
        }

        self.current_run_halted = true;
        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        let newly_skipped = manager.skip_pending();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled: Vec::new(),
            newly_skipped,
            run_just_finished,
        }
    }

    /// The registered task definition behind `name`.
    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name).map(|info| &info.task)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Clear `current_run_id` once every task in the run is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);

        if manager.all_tasks_terminal() {
            info!(
                run_id = self.current_run_id,
                failed = self.current_run_failed,
                "scheduler: all tasks terminal; marking run as finished"
            );
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        if self.current_run_id.is_none() {
            warn!(
                task = %task,
                "handle_trigger called with no active run; implicitly starting a new run"
            );
            self.start_new_run();
        }

        if self.tasks.contains_key(task) {
            let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
            manager.mark_task_and_prerequisites_pending(task);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        // A failed or halted run never starts anything new.
        let closed = self.current_run_failed || self.current_run_halted;
        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        let (newly_scheduled, newly_skipped) = if closed {
            (Vec::new(), manager.skip_pending())
        } else {
            (manager.collect_new_ready_tasks(), Vec::new())
        };
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_skipped,
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let run_id = match self.current_run_id {
            Some(id) => id,
            None => {
                warn!(
                    task = %task,
                    "handle_completion called with no active run; ignoring"
                );
                return SchedulerStep::default();
            }
        };

        let mut newly_scheduled = Vec::new();
        let mut newly_skipped = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state != Some(RunState::Running) => {
                warn!(
                    task = %info.name,
                    run_id,
                    state = ?info.run_state,
                    "completion for task that is not running in this run; ignoring"
                );
            }
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    if !self.current_run_failed && !self.current_run_halted {
                        let mut manager =
                            StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                        newly_scheduled.extend(manager.collect_new_ready_tasks());
                    }
                }
                TaskOutcome::Failed(message) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(
                        task = %info.name,
                        run_id,
                        error = %message,
                        "task failed; no further tasks start in this run"
                    );
                    self.current_run_failed = true;
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    newly_skipped = manager.skip_pending();
                }
            },
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_skipped,
            run_just_finished,
        }
    }
}
