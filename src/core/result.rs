use std::cmp::Ordering;
use std::fmt;

use super::problem::Problem;
use super::state::State;

/// Final outcome of a run, returned by [`Executor::run`](crate::Executor::run).
///
/// Bundles the problem (with its final evaluation counts), the solver and the
/// final state, which in turn holds the best point, the best cost and the
/// termination reason.
///
/// Results can be compared by their best cost, which is convenient when
/// running restarts from multiple initial points and keeping the winner.
#[derive(Clone, Debug)]
pub struct OptimizationResult<O, S, I> {
    problem: Problem<O>,
    solver: S,
    state: I,
}

impl<O, S, I> OptimizationResult<O, S, I> {
    /// Bundles the final problem, solver and state.
    pub fn new(problem: Problem<O>, solver: S, state: I) -> Self {
        Self {
            problem,
            solver,
            state,
        }
    }

    /// Returns reference to the problem.
    pub fn problem(&self) -> &Problem<O> {
        &self.problem
    }

    /// Returns reference to the solver.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Returns reference to the final state.
    pub fn state(&self) -> &I {
        &self.state
    }

    /// Unwraps the problem, solver and state.
    pub fn into_parts(self) -> (Problem<O>, S, I) {
        (self.problem, self.solver, self.state)
    }
}

impl<O, S, I> fmt::Display for OptimizationResult<O, S, I>
where
    I: State,
    I::Param: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OptimizationResult:")?;
        writeln!(
            f,
            "    param (best):  {}",
            match self.state.get_best_param() {
                Some(param) => format!("{:?}", param),
                None => String::from("none"),
            }
        )?;
        writeln!(f, "    cost (best):   {}", self.state.get_best_cost())?;
        writeln!(f, "    iters (best):  {}", self.state.last_best_iter())?;
        writeln!(f, "    iters (total): {}", self.state.get_iter())?;
        writeln!(f, "    termination:   {}", self.state.termination_status())?;
        writeln!(
            f,
            "    time:          {}",
            match self.state.time() {
                Some(time) => format!("{:?}", time),
                None => String::from("none"),
            }
        )?;
        let counts = self.state.counts();
        writeln!(
            f,
            "    evals:         cost: {}, gradient: {}, jacobian: {}, hessian: {}",
            counts.cost, counts.gradient, counts.jacobian, counts.hessian
        )?;
        Ok(())
    }
}

impl<O, S, I: State> PartialEq for OptimizationResult<O, S, I> {
    fn eq(&self, other: &Self) -> bool {
        self.state.get_best_cost() == other.state.get_best_cost()
    }
}

impl<O, S, I: State> PartialOrd for OptimizationResult<O, S, I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.state
            .get_best_cost()
            .partial_cmp(&other.state.get_best_cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IterState, Objective, TerminationReason};

    #[derive(Debug)]
    struct Nop;

    impl Objective for Nop {
        type Param = Vec<f64>;
        type Float = f64;
        type Gradient = ();
        type Jacobian = ();
        type Hessian = ();
    }

    type NopState = IterState<Vec<f64>, (), (), (), f64>;

    fn result(best_cost: f64) -> OptimizationResult<Nop, (), NopState> {
        let mut state = NopState::empty().param(vec![0.0]).cost(best_cost);
        state.update();
        state.terminate_with(TerminationReason::MaxItersReached);
        OptimizationResult::new(Problem::new(Nop), (), state)
    }

    #[test]
    fn ordered_by_best_cost() {
        assert!(result(1.0) < result(2.0));
        assert!(result(3.0) > result(2.0));
        assert_eq!(result(1.5), result(1.5));
    }

    #[test]
    fn display_includes_reason() {
        let rendered = result(1.0).to_string();
        assert!(rendered.contains("cost (best):   1"));
        assert!(rendered.contains("maximum number of iterations reached"));
    }
}
