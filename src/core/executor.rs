use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use getset::CopyGetters;
use log::warn;
use num_traits::ToPrimitive;

use crate::checkpointing::Checkpoint;
use crate::observers::{Observe, ObserverMode, Observers};

use super::error::Error;
use super::kv::Kv;
use super::problem::{Objective, Problem};
use super::result::OptimizationResult;
use super::solver::Solver;
use super::state::State;
use super::termination::TerminationReason;

/// The executor drives a [`Solver`] against a [`Problem`] until a
/// termination criterion fires.
///
/// It owns the problem, the solver, the state, the observers and the
/// checkpoint store for the duration of the run. The loop is strictly
/// sequential: no iteration starts before the previous iteration's observer
/// and checkpoint dispatch completed, so every sink sees a consistent,
/// totally ordered view of the state.
///
/// For the usage, see the example in [`Solver`].
#[derive(CopyGetters)]
pub struct Executor<O, S, I: State> {
    problem: Problem<O>,
    solver: S,
    state: I,
    observers: Observers,
    checkpoint: Option<Box<dyn Checkpoint<S, I>>>,
    abort: Option<Arc<AtomicBool>>,
    /// Maximum number of iterations.
    #[getset(get_copy = "pub")]
    max_iters: u64,
    /// Cost at which the run stops as successful, if set.
    #[getset(get_copy = "pub")]
    target_cost: Option<I::Float>,
    /// Number of consecutive non-improving iterations after which the run
    /// stops, if set.
    #[getset(get_copy = "pub")]
    stall_iters: Option<u64>,
    /// Wall-time budget of the run, if set.
    #[getset(get_copy = "pub")]
    timeout: Option<Duration>,
    /// Whether a failed checkpoint save aborts the run.
    #[getset(get_copy = "pub")]
    fatal_checkpoint_errors: bool,
}

impl<O, S, I> Executor<O, S, I>
where
    O: Objective,
    S: Solver<O, I>,
    I: State,
{
    /// Creates an executor for given objective and solver with default
    /// settings: no iteration, cost, stall or time limits, no observers and
    /// no checkpointing.
    ///
    /// The initial point and other state fields are set with
    /// [`with_state`](Executor::with_state).
    pub fn new(objective: O, solver: S) -> Self {
        Self {
            problem: Problem::new(objective),
            solver,
            state: I::new(),
            observers: Observers::new(),
            checkpoint: None,
            abort: None,
            max_iters: u64::MAX,
            target_cost: None,
            stall_iters: None,
            timeout: None,
            fatal_checkpoint_errors: false,
        }
    }

    /// Configures the initial state, typically the initial point:
    /// `executor.with_state(|state| state.param(x0))`. See the example in
    /// [`Solver`].
    #[must_use]
    pub fn with_state(mut self, configure: impl FnOnce(I) -> I) -> Self {
        let state = mem::replace(&mut self.state, I::new());
        self.state = configure(state);
        self
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the target cost. The run stops once the best cost is less than
    /// or equal to it.
    #[must_use]
    pub fn with_target_cost(mut self, target_cost: I::Float) -> Self {
        self.target_cost = Some(target_cost);
        self
    }

    /// Sets the number of consecutive non-improving iterations after which
    /// the run stops.
    #[must_use]
    pub fn with_stall_iters(mut self, stall_iters: u64) -> Self {
        self.stall_iters = Some(stall_iters);
        self
    }

    /// Sets the wall-time budget. The budget is checked once per iteration,
    /// never pre-empting a solver step in progress.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the cooperative cancellation flag. Raising the flag terminates
    /// the run with [`TerminationReason::Aborted`] at the next iteration
    /// boundary.
    #[must_use]
    pub fn with_abort_signal(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Registers an observer under given name.
    ///
    /// Fails with [`Error::InvalidConfiguration`] for a duplicate name or an
    /// `Every(0)` mode.
    pub fn with_observer(
        mut self,
        name: impl Into<String>,
        observer: impl Observe + 'static,
        mode: ObserverMode,
    ) -> Result<Self, Error> {
        self.observers.register(name, observer, mode)?;
        Ok(self)
    }

    /// Attaches a checkpoint store.
    ///
    /// Fails with [`Error::InvalidConfiguration`] if the store reports an
    /// `Every(0)` frequency.
    pub fn with_checkpointing(
        mut self,
        checkpoint: impl Checkpoint<S, I> + 'static,
    ) -> Result<Self, Error> {
        if checkpoint.frequency() == crate::checkpointing::CheckpointingFrequency::Every(0) {
            return Err(Error::invalid_configuration(
                "checkpointing period must be positive",
            ));
        }
        self.checkpoint = Some(Box::new(checkpoint));
        Ok(self)
    }

    /// Makes a failed checkpoint save abort the run instead of being logged
    /// and ignored.
    #[must_use]
    pub fn with_fatal_checkpoint_errors(mut self, fatal: bool) -> Self {
        self.fatal_checkpoint_errors = fatal;
        self
    }

    /// Runs the loop until termination and returns the final problem, solver
    /// and state.
    ///
    /// If a checkpoint store is attached and holds a snapshot, the solver
    /// and state are restored from it and the loop resumes at the stored
    /// iteration instead of initializing from scratch.
    pub fn run(mut self) -> Result<OptimizationResult<O, S, I>, Error> {
        let start = Instant::now();
        let mut state = mem::replace(&mut self.state, I::new());

        let mut resumed = false;
        if let Some(checkpoint) = self.checkpoint.as_ref() {
            if let Some((solver, persisted)) = checkpoint.load()? {
                self.solver = solver;
                state = persisted;
                // The final snapshot of an interrupted run is terminated;
                // this run evaluates its own limits.
                state.reset_termination();
                self.problem.set_counts(state.counts());
                resumed = true;
            }
        }
        let time_offset = if resumed {
            state.time().unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };

        if resumed {
            // The restored iteration was already dispatched by the
            // interrupted run. Only the limits of this run are re-evaluated,
            // so a snapshot that already satisfies them performs no further
            // solver step.
            self.check_termination(&mut state);
        } else {
            // Iteration 0 is the initialization result; the counter is not
            // incremented for it.
            let (initialized, kv) = self.solver.init(&mut self.problem, state)?;
            state = initialized;
            self.merge(&mut state, kv, time_offset + start.elapsed());
            self.check_termination(&mut state);
            self.dispatch(&state)?;
        }

        while !state.terminated() {
            let (next, kv) = self.solver.next_iter(&mut self.problem, state)?;
            state = next;
            state.increment_iter();
            self.merge(&mut state, kv, time_offset + start.elapsed());
            self.check_termination(&mut state);
            self.dispatch(&state)?;
        }

        // The final snapshot is persisted regardless of the frequency, so an
        // interrupted consumer can always pick up the terminal state.
        if let Some(checkpoint) = self.checkpoint.as_ref() {
            self.save_checkpoint(checkpoint.as_ref(), &state)?;
        }

        Ok(OptimizationResult::new(self.problem, self.solver, state))
    }

    /// Merges the continuity fields the solver must not manage itself:
    /// evaluation counts, elapsed time, best-tracking and the diagnostic
    /// record.
    fn merge(&self, state: &mut I, solver_kv: Option<Kv>, elapsed: Duration) {
        state.set_counts(self.problem.counts());
        state.set_time(elapsed);
        state.update();

        let mut record = Kv::new();
        record.insert("iter", state.get_iter());
        record.insert("cost", float_to_f64(state.get_cost()));
        record.insert("best_cost", float_to_f64(state.get_best_cost()));
        record.insert("time_sec", elapsed.as_secs_f64());
        if let Some(solver_kv) = solver_kv {
            record.merge(solver_kv);
        }
        state.set_kv(record);
    }

    /// Evaluates the default termination checks in fixed order, then the
    /// solver's own criterion. First match wins.
    fn check_termination(&mut self, state: &mut I) {
        if state.terminated() {
            return;
        }

        let aborted = self
            .abort
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst));
        let out_of_time = self
            .timeout
            .map_or(false, |budget| {
                state.time().map_or(false, |elapsed| elapsed > budget)
            });
        let target_reached = self
            .target_cost
            .map_or(false, |target| state.get_best_cost() <= target);
        let stalled = self
            .stall_iters
            .map_or(false, |limit| state.stall_iter() >= limit);

        let reason = if aborted {
            Some(TerminationReason::Aborted)
        } else if out_of_time {
            Some(TerminationReason::TimeBudgetExceeded)
        } else if state.get_iter() >= self.max_iters {
            Some(TerminationReason::MaxItersReached)
        } else if target_reached {
            Some(TerminationReason::TargetCostReached)
        } else if stalled {
            Some(TerminationReason::NoImprovementStreak(
                self.stall_iters.unwrap_or_default(),
            ))
        } else {
            self.solver.terminate(state)
        };

        if let Some(reason) = reason {
            state.terminate_with(reason);
        }
    }

    /// Persists and notifies for the current iteration. Runs for the
    /// terminal iteration as well, before the loop exits.
    fn dispatch(&mut self, state: &I) -> Result<(), Error> {
        if let Some(checkpoint) = self.checkpoint.as_ref() {
            if checkpoint.frequency().fires(state.get_iter()) {
                self.save_checkpoint(checkpoint.as_ref(), state)?;
            }
        }

        self.observers
            .notify(state.get_iter(), state.is_best(), state.kv());
        Ok(())
    }

    fn save_checkpoint(&self, checkpoint: &dyn Checkpoint<S, I>, state: &I) -> Result<(), Error> {
        match checkpoint.save(&self.solver, state) {
            Ok(()) => Ok(()),
            Err(error) if self.fatal_checkpoint_errors => Err(error),
            Err(error) => {
                warn!("checkpoint save failed: {}", error);
                Ok(())
            }
        }
    }
}

fn float_to_f64<F: ToPrimitive>(value: F) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use approx::assert_relative_eq;
    use nalgebra::dvector;

    use super::*;
    use crate::checkpointing::{CheckpointingFrequency, FileCheckpoint};
    use crate::core::KvValue;
    use crate::testing::{
        scratch_dir, CollectingObserver, CostOnlySphere, GradientDescent, LinearDecrease,
        PlainState, RandomPopulation, RandomSearch, ScriptedCost, Sphere,
    };

    fn best_costs(records: &[Kv]) -> Vec<f64> {
        records
            .iter()
            .map(|record| match record.get("best_cost") {
                Some(KvValue::Float(value)) => *value,
                other => panic!("missing best_cost: {:?}", other),
            })
            .collect()
    }

    #[test]
    fn max_iters_scenario() {
        let result = Executor::new(CostOnlySphere, LinearDecrease::new(100.0))
            .with_max_iters(50)
            .run()
            .unwrap();

        let state = result.state();
        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::MaxItersReached)
        );
        assert_eq!(state.get_iter(), 50);
        assert_relative_eq!(state.get_best_cost(), 50.0);
    }

    #[test]
    fn target_cost_scenario() {
        let result = Executor::new(CostOnlySphere, LinearDecrease::new(100.0))
            .with_target_cost(10.0)
            .run()
            .unwrap();

        let state = result.state();
        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::TargetCostReached)
        );
        assert_eq!(state.get_iter(), 90);
        assert_relative_eq!(state.get_best_cost(), 10.0);
    }

    #[test]
    fn missing_capability_aborts_run() {
        let result = Executor::new(CostOnlySphere, GradientDescent::new(0.1))
            .with_state(|state| state.param(dvector![1.0, 1.0]))
            .with_max_iters(10)
            .run();

        assert!(matches!(result, Err(Error::NotImplemented("gradient"))));
    }

    #[test]
    fn stall_scenario() {
        // Improvement at iteration 1, then three non-improving iterations.
        let script = ScriptedCost::new([100.0, 90.0, 95.0, 95.0, 95.0, 94.0]);
        let result = Executor::new(CostOnlySphere, script)
            .with_stall_iters(3)
            .run()
            .unwrap();

        let state = result.state();
        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::NoImprovementStreak(3))
        );
        assert_eq!(state.get_iter(), 4);
        assert_relative_eq!(state.get_best_cost(), 90.0);
    }

    #[test]
    fn solver_convergence_criterion() {
        let result = Executor::new(CostOnlySphere, LinearDecrease::new(5.0).converge_at(2.0))
            .run()
            .unwrap();

        let state = result.state();
        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::SolverConverged)
        );
        assert_eq!(state.get_iter(), 3);
    }

    #[test]
    fn abort_signal_wins_over_other_checks() {
        let abort = Arc::new(AtomicBool::new(true));
        let result = Executor::new(CostOnlySphere, LinearDecrease::new(100.0))
            .with_max_iters(0)
            .with_abort_signal(abort)
            .run()
            .unwrap();

        assert_eq!(
            result.state().termination_reason(),
            Some(&TerminationReason::Aborted)
        );
        assert_eq!(result.state().get_iter(), 0);
    }

    #[test]
    fn no_iteration_after_termination() {
        let result = Executor::new(CostOnlySphere, LinearDecrease::new(100.0))
            .with_max_iters(3)
            .run()
            .unwrap();

        assert_eq!(result.solver().calls, 3);
    }

    #[test]
    fn observers_fire_per_mode_including_iteration_zero() {
        let (always, always_records) = CollectingObserver::new();
        let (every, every_records) = CollectingObserver::new();
        let (best, best_records) = CollectingObserver::new();
        let (never, never_records) = CollectingObserver::new();

        // Improvements at iterations 0, 1 and 3 only.
        let script = ScriptedCost::new([10.0, 9.0, 9.5, 8.0, 8.5]);
        Executor::new(CostOnlySphere, script)
            .with_max_iters(4)
            .with_observer("always", always, ObserverMode::Always)
            .unwrap()
            .with_observer("every", every, ObserverMode::Every(2))
            .unwrap()
            .with_observer("best", best, ObserverMode::NewBest)
            .unwrap()
            .with_observer("never", never, ObserverMode::Never)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(always_records.lock().unwrap().len(), 5);
        assert_eq!(every_records.lock().unwrap().len(), 3); // 0, 2, 4
        assert_eq!(best_records.lock().unwrap().len(), 3); // 0, 1, 3
        assert!(never_records.lock().unwrap().is_empty());
    }

    #[test]
    fn records_carry_standard_fields_and_terminal_iteration() {
        let (observer, records) = CollectingObserver::new();
        Executor::new(CostOnlySphere, LinearDecrease::new(10.0))
            .with_max_iters(2)
            .with_observer("trace", observer, ObserverMode::Always)
            .unwrap()
            .run()
            .unwrap();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 3);

        let last = records.last().unwrap();
        assert_eq!(last.get("iter"), Some(&KvValue::Int(2)));
        assert_eq!(last.get("cost"), Some(&KvValue::Float(8.0)));
        assert_eq!(last.get("best_cost"), Some(&KvValue::Float(8.0)));
        assert!(matches!(last.get("time_sec"), Some(KvValue::Float(_))));
    }

    #[test]
    fn solver_diagnostics_are_merged_into_records() {
        let (observer, records) = CollectingObserver::new();
        Executor::new(Sphere::new(2), GradientDescent::new(0.1))
            .with_state(|state| state.param(dvector![1.0, -1.0]))
            .with_max_iters(3)
            .with_observer("trace", observer, ObserverMode::Always)
            .unwrap()
            .run()
            .unwrap();

        let records = records.lock().unwrap();
        // Iteration 0 has no solver diagnostics, later iterations do.
        assert!(records[0].get("gradient_norm").is_none());
        assert!(matches!(
            records[1].get("gradient_norm"),
            Some(KvValue::Float(_))
        ));
    }

    #[test]
    fn best_cost_is_monotone_under_noisy_solver() {
        let (observer, records) = CollectingObserver::new();
        Executor::new(Sphere::new(3), RandomSearch::new(3, 42))
            .with_max_iters(50)
            .with_observer("trace", observer, ObserverMode::Always)
            .unwrap()
            .run()
            .unwrap();

        let costs = best_costs(&records.lock().unwrap());
        assert!(costs.windows(2).all(|pair| pair[1] <= pair[0]));
    }

    #[test]
    fn gradient_descent_on_sphere_converges() {
        let result = Executor::new(Sphere::new(2), GradientDescent::new(0.1))
            .with_state(|state| state.param(dvector![3.0, -4.0]))
            .with_max_iters(200)
            .run()
            .unwrap();

        assert!(result.state().get_best_cost() < 1e-6);
        assert!(result.problem().counts().gradient >= 200);
    }

    #[test]
    fn population_solver_runs_end_to_end() {
        let result = Executor::new(Sphere::new(2), RandomPopulation::new(2, 8, 7))
            .with_max_iters(20)
            .run()
            .unwrap();

        let state = result.state();
        assert!(state.get_best_cost().is_finite());
        assert_eq!(state.get_individuals().map(Vec::len), Some(8));
        // Every iteration (including iteration 0) evaluates the population.
        assert_eq!(result.problem().counts().cost, 8 * 21);
    }

    #[test]
    fn eval_counts_are_mirrored_into_state() {
        let result = Executor::new(Sphere::new(2), GradientDescent::new(0.1))
            .with_state(|state| state.param(dvector![1.0, 1.0]))
            .with_max_iters(5)
            .run()
            .unwrap();

        assert_eq!(result.state().counts(), result.problem().counts());
        assert_eq!(result.state().counts().cost, 6); // init + 5 iterations
        assert_eq!(result.state().counts().gradient, 5);
    }

    #[test]
    fn checkpoint_resume_reproduces_uninterrupted_run() {
        let directory = scratch_dir("executor-resume");
        let checkpoint = FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Every(5));

        let uninterrupted = Executor::new(CostOnlySphere, LinearDecrease::new(100.0))
            .with_max_iters(20)
            .run()
            .unwrap();

        // First half of the interrupted run. The final snapshot at iteration
        // 10 is persisted at loop exit.
        Executor::new(CostOnlySphere, LinearDecrease::new(100.0))
            .with_max_iters(10)
            .with_checkpointing(checkpoint.clone())
            .unwrap()
            .run()
            .unwrap();

        // Second half resumes from the snapshot; the fresh solver and state
        // passed here are replaced by the persisted ones.
        let resumed = Executor::new(CostOnlySphere, LinearDecrease::new(100.0))
            .with_max_iters(20)
            .with_checkpointing(checkpoint)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(resumed.state().get_iter(), 20);
        assert_eq!(
            resumed.state().get_best_cost(),
            uninterrupted.state().get_best_cost()
        );
        assert_eq!(
            resumed.state().termination_reason(),
            uninterrupted.state().termination_reason()
        );

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn resume_does_not_reinitialize() {
        let directory = scratch_dir("executor-resume-no-init");
        let checkpoint = FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Always);

        Executor::new(CostOnlySphere, LinearDecrease::new(50.0))
            .with_max_iters(4)
            .with_checkpointing(checkpoint.clone())
            .unwrap()
            .run()
            .unwrap();

        let resumed = Executor::new(CostOnlySphere, LinearDecrease::new(50.0))
            .with_max_iters(6)
            .with_checkpointing(checkpoint)
            .unwrap()
            .run()
            .unwrap();

        // Two more solver steps, not six: the persisted pair continues.
        assert_eq!(resumed.solver().calls, 6);
        assert_eq!(resumed.state().get_iter(), 6);
        assert_relative_eq!(resumed.state().get_best_cost(), 44.0);

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn resume_at_limit_performs_no_step() {
        let directory = scratch_dir("executor-resume-at-limit");
        let checkpoint = FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Never);

        let finished = Executor::new(CostOnlySphere, LinearDecrease::new(10.0))
            .with_max_iters(5)
            .with_checkpointing(checkpoint.clone())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(finished.solver().calls, 5);

        // Resuming with identical settings finds the snapshot already at its
        // limits and must not advance further.
        let resumed = Executor::new(CostOnlySphere, LinearDecrease::new(10.0))
            .with_max_iters(5)
            .with_checkpointing(checkpoint)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(resumed.state().get_iter(), 5);
        assert_eq!(resumed.solver().calls, 5);
        assert_eq!(
            resumed.state().termination_reason(),
            Some(&TerminationReason::MaxItersReached)
        );

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn checkpoint_write_failure_is_recoverable_by_default() {
        let failing = FailingCheckpoint;

        let result = Executor::new(CostOnlySphere, LinearDecrease::new(10.0))
            .with_max_iters(3)
            .with_checkpointing(failing)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.state().get_iter(), 3);
    }

    #[test]
    fn checkpoint_write_failure_can_be_fatal() {
        let result = Executor::new(CostOnlySphere, LinearDecrease::new(10.0))
            .with_max_iters(3)
            .with_checkpointing(FailingCheckpoint)
            .unwrap()
            .with_fatal_checkpoint_errors(true)
            .run();

        assert!(matches!(result, Err(Error::Checkpoint(_))));
    }

    #[derive(Clone)]
    struct FailingCheckpoint;

    impl Checkpoint<LinearDecrease, PlainState> for FailingCheckpoint {
        fn save(&self, _solver: &LinearDecrease, _state: &PlainState) -> Result<(), Error> {
            Err(Error::checkpoint("disk full"))
        }

        fn load(&self) -> Result<Option<(LinearDecrease, PlainState)>, Error> {
            Ok(None)
        }

        fn frequency(&self) -> CheckpointingFrequency {
            CheckpointingFrequency::Always
        }
    }

    #[test]
    fn zero_periods_are_rejected_at_construction() {
        let observer_error = Executor::new(CostOnlySphere, LinearDecrease::new(1.0))
            .with_observer("trace", CollectingObserver::new().0, ObserverMode::Every(0));
        assert!(matches!(
            observer_error,
            Err(Error::InvalidConfiguration(_))
        ));

        let directory = scratch_dir("executor-zero-period");
        let checkpoint = FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Every(0));
        let checkpoint_error =
            Executor::new(CostOnlySphere, LinearDecrease::new(1.0)).with_checkpointing(checkpoint);
        assert!(matches!(
            checkpoint_error,
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn timeout_terminates_with_time_budget_exceeded() {
        let result = Executor::new(CostOnlySphere, LinearDecrease::new(1000.0))
            .with_timeout(Duration::from_millis(20))
            .with_max_iters(u64::MAX)
            .run()
            .unwrap();

        assert_eq!(
            result.state().termination_reason(),
            Some(&TerminationReason::TimeBudgetExceeded)
        );
    }
}
