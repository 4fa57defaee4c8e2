use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::float::Float;
use crate::core::kv::Kv;
use crate::core::problem::EvalCounts;
use crate::core::state::State;
use crate::core::termination::{TerminationReason, TerminationStatus};

/// State for point-based algorithms.
///
/// Tracks a single current point with its cost and, depending on what the
/// solver computes, the gradient, Jacobian and Hessian at that point. The
/// generic parameters are the point type `P`, gradient `G`, Jacobian `J`,
/// Hessian `H` and scalar `F`; unused slots can be `()`.
///
/// Solvers populate the state with the builder-style setters:
///
/// ```rust
/// use optex::IterState;
///
/// let state: IterState<Vec<f64>, (), (), (), f64> = IterState::empty()
///     .param(vec![1.0, 2.0])
///     .cost(5.0);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IterState<P, G, J, H, F> {
    param: Option<P>,
    #[serde(
        with = "crate::core::state::float_repr",
        bound(serialize = "F: Float", deserialize = "F: Float")
    )]
    cost: F,
    best_param: Option<P>,
    #[serde(with = "crate::core::state::float_repr")]
    best_cost: F,
    gradient: Option<G>,
    jacobian: Option<J>,
    hessian: Option<H>,
    iter: u64,
    last_best_iter: u64,
    stall_iter: u64,
    best_updated: bool,
    counts: EvalCounts,
    time: Option<Duration>,
    termination_status: TerminationStatus,
    kv: Kv,
}

impl<P, G, J, H, F> IterState<P, G, J, H, F>
where
    P: Clone,
    F: Float,
{
    /// Creates a fresh state. Alias of [`State::new`] that does not require
    /// the trait in scope.
    pub fn empty() -> Self {
        <Self as State>::new()
    }

    /// Sets the current point.
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

    /// Sets the gradient at the current point.
    #[must_use]
    pub fn gradient(mut self, gradient: G) -> Self {
        self.gradient = Some(gradient);
        self
    }

    /// Sets the Jacobian at the current point.
    #[must_use]
    pub fn jacobian(mut self, jacobian: J) -> Self {
        self.jacobian = Some(jacobian);
        self
    }

    /// Sets the Hessian at the current point.
    #[must_use]
    pub fn hessian(mut self, hessian: H) -> Self {
        self.hessian = Some(hessian);
        self
    }

    /// Moves the current point out of the state.
    pub fn take_param(&mut self) -> Option<P> {
        self.param.take()
    }

    /// Moves the gradient out of the state.
    pub fn take_gradient(&mut self) -> Option<G> {
        self.gradient.take()
    }

    /// Returns reference to the gradient at the current point.
    pub fn get_gradient(&self) -> Option<&G> {
        self.gradient.as_ref()
    }

    /// Returns reference to the Jacobian at the current point.
    pub fn get_jacobian(&self) -> Option<&J> {
        self.jacobian.as_ref()
    }

    /// Returns reference to the Hessian at the current point.
    pub fn get_hessian(&self) -> Option<&H> {
        self.hessian.as_ref()
    }
}

impl<P, G, J, H, F> State for IterState<P, G, J, H, F>
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
            gradient: None,
            jacobian: None,
            hessian: None,
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

    type TestState = IterState<Vec<f64>, Vec<f64>, (), (), f64>;

    #[test]
    fn fresh_state_is_at_infinity() {
        let state = TestState::empty();

        assert_eq!(state.get_iter(), 0);
        assert!(state.get_cost().is_infinite());
        assert!(state.get_best_cost().is_infinite());
        assert!(state.get_param().is_none());
        assert!(!state.terminated());
    }

    #[test]
    fn update_records_strict_improvement() {
        let mut state = TestState::empty().param(vec![1.0]).cost(10.0);
        state.update();

        assert!(state.is_best());
        assert_eq!(state.get_best_cost(), 10.0);
        assert_eq!(state.get_best_param(), Some(&vec![1.0]));
        assert_eq!(state.stall_iter(), 0);
    }

    #[test]
    fn update_ignores_ties() {
        let mut state = TestState::empty().param(vec![1.0]).cost(10.0);
        state.update();

        state = state.param(vec![2.0]).cost(10.0);
        state.increment_iter();
        state.update();

        // The tie must not promote the new point.
        assert!(!state.is_best());
        assert_eq!(state.get_best_param(), Some(&vec![1.0]));
        assert_eq!(state.stall_iter(), 1);
        assert_eq!(state.last_best_iter(), 0);
    }

    #[test]
    fn stall_counter_resets_on_improvement_only() {
        let mut state = TestState::empty().param(vec![0.0]).cost(5.0);
        state.update();

        for cost in [5.0, 6.0] {
            state = state.cost(cost);
            state.increment_iter();
            state.update();
        }
        assert_eq!(state.stall_iter(), 2);

        state = state.cost(4.0);
        state.increment_iter();
        state.update();

        assert_eq!(state.stall_iter(), 0);
        assert_eq!(state.last_best_iter(), 3);
        assert!(state.is_best());
    }

    #[test]
    fn best_cost_is_monotone() {
        let mut state = TestState::empty().param(vec![0.0]).cost(3.0);
        state.update();

        let mut previous_best = state.get_best_cost();
        for cost in [2.0, 4.0, 1.5, 1.5, 0.5] {
            state = state.cost(cost);
            state.increment_iter();
            state.update();

            assert!(state.get_best_cost() <= previous_best);
            assert!(state.get_best_cost() <= state.get_cost());
            previous_best = state.get_best_cost();
        }
    }

    #[test]
    fn termination_is_set_once() {
        let mut state = TestState::empty();
        state.terminate_with(TerminationReason::MaxItersReached);
        state.terminate_with(TerminationReason::Aborted);

        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::MaxItersReached)
        );
    }

    #[test]
    fn serialization_roundtrip() {
        let mut state = TestState::empty()
            .param(vec![1.0, 2.0])
            .cost(4.0)
            .gradient(vec![0.5, 0.5]);
        state.update();
        state.increment_iter();

        let json = serde_json::to_string(&state).unwrap();
        let restored: TestState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get_iter(), state.get_iter());
        assert_eq!(restored.get_cost(), state.get_cost());
        assert_eq!(restored.get_best_param(), state.get_best_param());
        assert_eq!(restored.get_gradient(), state.get_gradient());
    }

    #[test]
    fn serialization_preserves_non_finite_costs() {
        // A fresh state still has both costs at infinity, which JSON cannot
        // represent as plain numbers.
        let state = TestState::empty();

        let json = serde_json::to_string(&state).unwrap();
        let restored: TestState = serde_json::from_str(&json).unwrap();

        assert!(restored.get_cost().is_infinite());
        assert!(restored.get_best_cost().is_infinite());
    }
}
