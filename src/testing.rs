//! Test objectives, solvers and observers useful for smoke testing and
//! debugging executors.
//!
//! [`Sphere`] with [`GradientDescent`] is the recommended first smoke test.
//! [`LinearDecrease`] produces a fully predictable cost sequence, which makes
//! it convenient for exercising termination policies and checkpoint
//! resumption.

#![allow(unused)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::{
    Error, IterState, Kv, Objective, PopulationState, Problem, Solver, State, TerminationReason,
};
use crate::observers::Observe;

/// Returns a unique path in the system temporary directory.
pub fn scratch_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("optex-{}-{}-{}", std::process::id(), nanos, name))
}

/// Returns a unique directory path in the system temporary directory. The
/// directory itself is not created.
pub fn scratch_dir(name: &str) -> PathBuf {
    scratch_path(name)
}

/// Sphere function, the sum of squared coordinates.
///
/// The global minimum of zero is at the origin. Provides cost and gradient.
pub struct Sphere {
    dim: usize,
}

impl Sphere {
    /// Initializes the sphere function with given dimension.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Returns the dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Objective for Sphere {
    type Param = DVector<f64>;
    type Float = f64;
    type Gradient = DVector<f64>;
    type Jacobian = ();
    type Hessian = ();

    fn cost(&self, x: &Self::Param) -> Result<Self::Float, Error> {
        Ok(x.norm_squared())
    }

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(x * 2.0)
    }
}

/// Sphere-shaped objective that provides only the cost capability.
pub struct CostOnlySphere;

impl Objective for CostOnlySphere {
    type Param = DVector<f64>;
    type Float = f64;
    type Gradient = DVector<f64>;
    type Jacobian = ();
    type Hessian = ();

    fn cost(&self, x: &Self::Param) -> Result<Self::Float, Error> {
        Ok(x.norm_squared())
    }
}

/// State shape used by the dense-vector test solvers.
pub type VectorState = IterState<DVector<f64>, DVector<f64>, (), (), f64>;

/// Fixed-step steepest descent.
pub struct GradientDescent {
    step: f64,
}

impl GradientDescent {
    /// Initializes the solver with given step length.
    pub fn new(step: f64) -> Self {
        Self { step }
    }
}

impl<O> Solver<O, VectorState> for GradientDescent
where
    O: Objective<Param = DVector<f64>, Float = f64, Gradient = DVector<f64>>,
{
    const NAME: &'static str = "Gradient descent";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: VectorState,
    ) -> Result<(VectorState, Option<Kv>), Error> {
        let x = state
            .get_param()
            .cloned()
            .ok_or_else(|| Error::solver("missing initial point"))?;
        let cost = problem.cost(&x)?;
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        mut state: VectorState,
    ) -> Result<(VectorState, Option<Kv>), Error> {
        let mut x = state
            .take_param()
            .ok_or_else(|| Error::solver("missing point"))?;
        let gradient = problem.gradient(&x)?;
        x -= &gradient * self.step;
        let cost = problem.cost(&x)?;

        let norm = gradient.norm();
        Ok((
            state.param(x).gradient(gradient).cost(cost),
            Some(crate::kv!["gradient_norm" => norm]),
        ))
    }
}

/// Solver with a fully predictable cost sequence: the cost starts at `start`
/// and decreases by one on every iteration, regardless of the problem.
///
/// All data lives in the state and in plain configuration fields, so the
/// solver is serializable and resumes deterministically from a checkpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearDecrease {
    start: f64,
    converge_at: Option<f64>,
    /// Number of `next_iter` calls performed.
    pub calls: u64,
}

/// State shape used by [`LinearDecrease`] and [`ScriptedCost`].
pub type PlainState = IterState<Vec<f64>, (), (), (), f64>;

impl LinearDecrease {
    /// Initializes the solver with given starting cost.
    pub fn new(start: f64) -> Self {
        Self {
            start,
            converge_at: None,
            calls: 0,
        }
    }

    /// Makes [`Solver::terminate`] declare convergence once the best cost
    /// reaches given threshold.
    pub fn converge_at(mut self, threshold: f64) -> Self {
        self.converge_at = Some(threshold);
        self
    }
}

impl<O: Objective<Float = f64>> Solver<O, PlainState> for LinearDecrease {
    const NAME: &'static str = "Linear decrease";

    fn init(
        &mut self,
        _problem: &mut Problem<O>,
        state: PlainState,
    ) -> Result<(PlainState, Option<Kv>), Error> {
        Ok((state.param(vec![self.start]).cost(self.start), None))
    }

    fn next_iter(
        &mut self,
        _problem: &mut Problem<O>,
        state: PlainState,
    ) -> Result<(PlainState, Option<Kv>), Error> {
        self.calls += 1;
        let cost = state.get_cost() - 1.0;
        Ok((state.param(vec![cost]).cost(cost), None))
    }

    fn terminate(&mut self, state: &PlainState) -> Option<TerminationReason> {
        match self.converge_at {
            Some(threshold) if state.get_best_cost() <= threshold => {
                Some(TerminationReason::SolverConverged)
            }
            _ => None,
        }
    }
}

/// Solver replaying a fixed script of costs: the init cost is the first
/// element, each iteration advances by one and the last element repeats.
pub struct ScriptedCost {
    costs: Vec<f64>,
    position: usize,
}

impl ScriptedCost {
    /// Initializes the solver with given cost script. The script must not be
    /// empty.
    pub fn new(costs: impl Into<Vec<f64>>) -> Self {
        let costs = costs.into();
        assert!(!costs.is_empty(), "cost script must not be empty");
        Self { costs, position: 0 }
    }
}

impl<O: Objective<Float = f64>> Solver<O, PlainState> for ScriptedCost {
    const NAME: &'static str = "Scripted cost";

    fn init(
        &mut self,
        _problem: &mut Problem<O>,
        state: PlainState,
    ) -> Result<(PlainState, Option<Kv>), Error> {
        let cost = self.costs[0];
        Ok((state.param(vec![cost]).cost(cost), None))
    }

    fn next_iter(
        &mut self,
        _problem: &mut Problem<O>,
        state: PlainState,
    ) -> Result<(PlainState, Option<Kv>), Error> {
        self.position = (self.position + 1).min(self.costs.len() - 1);
        let cost = self.costs[self.position];
        Ok((state.param(vec![cost]).cost(cost), None))
    }
}

/// Random search: samples a point uniformly in `[-1, 1]^dim` on every
/// iteration. Useful for exercising best-tracking with a noisy cost
/// sequence.
pub struct RandomSearch {
    dim: usize,
    rng: StdRng,
}

impl RandomSearch {
    /// Initializes the solver with given dimension and seed.
    pub fn new(dim: usize, seed: u64) -> Self {
        Self {
            dim,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sample(&mut self) -> DVector<f64> {
        DVector::from_fn(self.dim, |_, _| self.rng.gen_range(-1.0..=1.0))
    }
}

impl<O> Solver<O, IterState<DVector<f64>, (), (), (), f64>> for RandomSearch
where
    O: Objective<Param = DVector<f64>, Float = f64>,
{
    const NAME: &'static str = "Random search";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: IterState<DVector<f64>, (), (), (), f64>,
    ) -> Result<(IterState<DVector<f64>, (), (), (), f64>, Option<Kv>), Error> {
        let x = self.sample();
        let cost = problem.cost(&x)?;
        Ok((state.param(x).cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: IterState<DVector<f64>, (), (), (), f64>,
    ) -> Result<(IterState<DVector<f64>, (), (), (), f64>, Option<Kv>), Error> {
        let x = self.sample();
        let cost = problem.cost(&x)?;
        Ok((state.param(x).cost(cost), None))
    }
}

/// Population variant of [`RandomSearch`]: samples a whole population and
/// reports its champion.
pub struct RandomPopulation {
    dim: usize,
    size: usize,
    rng: StdRng,
}

impl RandomPopulation {
    /// Initializes the solver with given dimension, population size and
    /// seed.
    pub fn new(dim: usize, size: usize, seed: u64) -> Self {
        assert!(size > 0, "population must not be empty");
        Self {
            dim,
            size,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn step<O>(
        &mut self,
        problem: &mut Problem<O>,
        state: PopulationState<DVector<f64>, f64>,
    ) -> Result<(PopulationState<DVector<f64>, f64>, Option<Kv>), Error>
    where
        O: Objective<Param = DVector<f64>, Float = f64>,
    {
        let individuals: Vec<DVector<f64>> = (0..self.size)
            .map(|_| DVector::from_fn(self.dim, |_, _| self.rng.gen_range(-1.0..=1.0)))
            .collect();

        let mut costs = Vec::with_capacity(self.size);
        for individual in &individuals {
            costs.push(problem.cost(individual)?);
        }

        let champion = costs
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index)
            .ok_or_else(|| Error::solver("empty population"))?;

        let param = individuals[champion].clone();
        let cost = costs[champion];

        Ok((
            state
                .individuals(individuals)
                .individual_costs(costs)
                .param(param)
                .cost(cost),
            None,
        ))
    }
}

impl<O> Solver<O, PopulationState<DVector<f64>, f64>> for RandomPopulation
where
    O: Objective<Param = DVector<f64>, Float = f64>,
{
    const NAME: &'static str = "Random population";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: PopulationState<DVector<f64>, f64>,
    ) -> Result<(PopulationState<DVector<f64>, f64>, Option<Kv>), Error> {
        self.step(problem, state)
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: PopulationState<DVector<f64>, f64>,
    ) -> Result<(PopulationState<DVector<f64>, f64>, Option<Kv>), Error> {
        self.step(problem, state)
    }
}

/// Observer collecting every received record into a shared vector.
pub struct CollectingObserver {
    records: Arc<Mutex<Vec<Kv>>>,
}

impl CollectingObserver {
    /// Creates the observer and the shared handle to the collected records.
    pub fn new() -> (Self, Arc<Mutex<Vec<Kv>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: records.clone(),
            },
            records,
        )
    }
}

impl Observe for CollectingObserver {
    fn observe_iter(&mut self, record: &Kv) -> Result<(), Error> {
        self.records
            .lock()
            .map_err(|_| Error::observer("records mutex poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
