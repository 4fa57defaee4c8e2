use super::error::Error;
use super::kv::Kv;
use super::problem::Problem;
use super::state::State;
use super::termination::TerminationReason;

/// Interface of a solver.
///
/// A solver is an iterative algorithm that produces the state of the next
/// iteration from the state of the previous one. The executor takes care of
/// everything else: best-tracking, evaluation counting, termination checks,
/// observers and checkpointing.
///
/// Solvers receive the [`Problem`] by exclusive reference for the duration of
/// one call and must not cache evaluations or keep any cross-call data
/// outside of `self` and the state. This guarantees that a persisted
/// `(solver, state)` pair is sufficient to resume a run.
///
/// ## Implementing a solver
///
/// A fixed-step steepest descent fits in a few lines:
///
/// ```rust
/// use optex::{Error, Executor, IterState, Kv, Objective, Problem, Solver, State};
///
/// struct Paraboloid;
///
/// impl Objective for Paraboloid {
///     type Param = Vec<f64>;
///     type Float = f64;
///     type Gradient = Vec<f64>;
///     type Jacobian = ();
///     type Hessian = ();
///
///     fn cost(&self, x: &Self::Param) -> Result<f64, Error> {
///         Ok(x.iter().map(|xi| xi * xi).sum())
///     }
///
///     fn gradient(&self, x: &Self::Param) -> Result<Vec<f64>, Error> {
///         Ok(x.iter().map(|xi| 2.0 * xi).collect())
///     }
/// }
///
/// type DescentState = IterState<Vec<f64>, Vec<f64>, (), (), f64>;
///
/// struct SteepestDescent {
///     step: f64,
/// }
///
/// impl Solver<Paraboloid, DescentState> for SteepestDescent {
///     const NAME: &'static str = "Steepest descent";
///
///     fn init(
///         &mut self,
///         problem: &mut Problem<Paraboloid>,
///         state: DescentState,
///     ) -> Result<(DescentState, Option<Kv>), Error> {
///         let x = state
///             .get_param()
///             .cloned()
///             .ok_or_else(|| Error::solver("missing initial point"))?;
///         let cost = problem.cost(&x)?;
///         Ok((state.cost(cost), None))
///     }
///
///     fn next_iter(
///         &mut self,
///         problem: &mut Problem<Paraboloid>,
///         mut state: DescentState,
///     ) -> Result<(DescentState, Option<Kv>), Error> {
///         let mut x = state
///             .take_param()
///             .ok_or_else(|| Error::solver("missing point"))?;
///         let gradient = problem.gradient(&x)?;
///         for (xi, gi) in x.iter_mut().zip(&gradient) {
///             *xi -= self.step * gi;
///         }
///         let cost = problem.cost(&x)?;
///         Ok((state.param(x).gradient(gradient).cost(cost), None))
///     }
/// }
///
/// # fn run() -> Result<(), Error> {
/// let result = Executor::new(Paraboloid, SteepestDescent { step: 0.1 })
///     .with_state(|state| state.param(vec![2.0, -1.5]))
///     .with_max_iters(100)
///     .run()?;
///
/// assert!(result.state().get_best_cost() < 1e-6);
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub trait Solver<O, I: State> {
    /// Name of the solver.
    const NAME: &'static str;

    /// Produces the state of iteration 0.
    ///
    /// The executor calls this exactly once before the loop. The initial
    /// point, if any, is already in the state (see
    /// [`Executor::with_state`](crate::Executor::with_state)); typical
    /// implementations evaluate the cost there and store it with
    /// [`IterState::cost`](crate::IterState::cost).
    fn init(&mut self, problem: &mut Problem<O>, state: I) -> Result<(I, Option<Kv>), Error>;

    /// Performs one iteration and returns the updated state, optionally with
    /// diagnostics for the observers.
    ///
    /// The returned state must hold the point and cost of the performed step.
    /// Continuity fields (iteration counter, evaluation counts, elapsed time,
    /// best-tracking) are managed by the executor afterwards.
    fn next_iter(&mut self, problem: &mut Problem<O>, state: I) -> Result<(I, Option<Kv>), Error>;

    /// Algorithm-specific termination criterion, consulted after the default
    /// checks of the executor.
    ///
    /// Returning a reason (usually
    /// [`SolverConverged`](TerminationReason::SolverConverged)) stops the
    /// run. The default implementation never stops.
    fn terminate(&mut self, state: &I) -> Option<TerminationReason> {
        let _ = state;
        None
    }
}
