use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::float::Float;
use crate::core::kv::Kv;
use crate::core::problem::EvalCounts;
use crate::core::state::State;
use crate::core::termination::{TerminationReason, TerminationStatus};

/// State for algorithms whose iterate is the solution of a linear program.
///
/// The shape is the base bookkeeping with a plain `param`/`cost` pair and no
/// derivative slots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearProgramState<P, F> {
    param: Option<P>,
    #[serde(
        with = "crate::core::state::float_repr",
        bound(serialize = "F: Float", deserialize = "F: Float")
    )]
    cost: F,
    best_param: Option<P>,
    #[serde(with = "crate::core::state::float_repr")]
    best_cost: F,
    iter: u64,
    last_best_iter: u64,
    stall_iter: u64,
    best_updated: bool,
    counts: EvalCounts,
    time: Option<Duration>,
    termination_status: TerminationStatus,
    kv: Kv,
}

impl<P, F> LinearProgramState<P, F>
where
    P: Clone,
    F: Float,
{
    /// Creates a fresh state. Alias of [`State::new`] that does not require
    /// the trait in scope.
    pub fn empty() -> Self {
        <Self as State>::new()
    }

    /// Sets the current solution.
    #[must_use]
    pub fn param(mut self, param: P) -> Self {
        self.param = Some(param);
        self
    }

    /// Sets the current cost.
    #[must_use]
    pub fn cost(mut self, cost: F) -> Self {
        self.cost = cost;
        self
    }
}

impl<P, F> State for LinearProgramState<P, F>
where
    P: Clone,
    F: Float,
{
    type Param = P;
    type Float = F;

    fn new() -> Self {
        Self {
            param: None,
            cost: F::infinity(),
            best_param: None,
            best_cost: F::infinity(),
            iter: 0,
            last_best_iter: 0,
            stall_iter: 0,
            best_updated: false,
            counts: EvalCounts::default(),
            time: None,
            termination_status: TerminationStatus::NotTerminated,
            kv: Kv::new(),
        }
    }

    fn update(&mut self) {
        if self.cost < self.best_cost {
            self.best_param = self.param.clone();
            self.best_cost = self.cost;
            self.last_best_iter = self.iter;
            self.stall_iter = 0;
            self.best_updated = true;
        } else {
            self.stall_iter += 1;
            self.best_updated = false;
        }
    }

    fn get_param(&self) -> Option<&P> {
        self.param.as_ref()
    }

    fn get_best_param(&self) -> Option<&P> {
        self.best_param.as_ref()
    }

    fn get_cost(&self) -> F {
        self.cost
    }

    fn get_best_cost(&self) -> F {
        self.best_cost
    }

    fn get_iter(&self) -> u64 {
        self.iter
    }

    fn increment_iter(&mut self) {
        self.iter += 1;
    }

    fn last_best_iter(&self) -> u64 {
        self.last_best_iter
    }

    fn stall_iter(&self) -> u64 {
        self.stall_iter
    }

    fn is_best(&self) -> bool {
        self.best_updated
    }

    fn terminate_with(&mut self, reason: TerminationReason) {
        if !self.termination_status.terminated() {
            self.termination_status = TerminationStatus::Terminated(reason);
        }
    }

    fn reset_termination(&mut self) {
        self.termination_status = TerminationStatus::NotTerminated;
    }

    fn termination_status(&self) -> &TerminationStatus {
        &self.termination_status
    }

    fn time(&self) -> Option<Duration> {
        self.time
    }

    fn set_time(&mut self, time: Duration) {
        self.time = Some(time);
    }

    fn counts(&self) -> EvalCounts {
        self.counts
    }

    fn set_counts(&mut self, counts: EvalCounts) {
        self.counts = counts;
    }

    fn set_kv(&mut self, kv: Kv) {
        self.kv = kv;
    }

    fn kv(&self) -> &Kv {
        &self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_invariants_hold() {
        let mut state: LinearProgramState<Vec<f64>, f64> =
            LinearProgramState::empty().param(vec![1.0]).cost(2.0);
        state.update();

        state = state.param(vec![0.5]).cost(1.0);
        state.increment_iter();
        state.update();

        assert_eq!(state.get_best_cost(), 1.0);
        assert_eq!(state.last_best_iter(), 1);
        assert!(state.is_best());
    }
}
