use serde::{Deserialize, Serialize};

use super::{error::Error, float::Float};

/// The trait for defining objectives.
///
/// An objective exposes up to four evaluation capabilities: the cost function
/// value, its gradient, its Jacobian and its Hessian. Every method has a
/// default implementation returning [`Error::NotImplemented`], so a type only
/// provides what it actually supports. A cost-only objective can still be
/// handed to a gradient-based solver; the first gradient request then fails
/// with a typed error instead of producing garbage values.
///
/// The parameter, gradient, Jacobian and Hessian types are opaque to this
/// crate. Capabilities that are not provided can set the corresponding
/// associated type to `()`.
///
/// ## Defining an objective
///
/// ```rust
/// use optex::{Error, Objective};
///
/// struct Rosenbrock {
///     a: f64,
///     b: f64,
/// }
///
/// impl Objective for Rosenbrock {
///     // The parameter type. Opaque to the library.
///     type Param = Vec<f64>;
///     // The numeric type. Usually f64 or f32.
///     type Float = f64;
///     type Gradient = Vec<f64>;
///     type Jacobian = ();
///     type Hessian = ();
///
///     fn cost(&self, x: &Self::Param) -> Result<Self::Float, Error> {
///         Ok((self.a - x[0]).powi(2) + self.b * (x[1] - x[0].powi(2)).powi(2))
///     }
///
///     fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
///         Ok(vec![
///             -2.0 * (self.a - x[0]) - 4.0 * self.b * x[0] * (x[1] - x[0].powi(2)),
///             2.0 * self.b * (x[1] - x[0].powi(2)),
///         ])
///     }
/// }
/// ```
pub trait Objective {
    /// Type of the parameter point. Opaque to the library.
    type Param;
    /// Type of the scalar, usually f32 or f64.
    type Float: Float;
    /// Type of the gradient. Use `()` if the gradient is not provided.
    type Gradient;
    /// Type of the Jacobian matrix. Use `()` if the Jacobian is not provided.
    type Jacobian;
    /// Type of the Hessian matrix. Use `()` if the Hessian is not provided.
    type Hessian;

    /// Calculates the cost function value at given point.
    fn cost(&self, x: &Self::Param) -> Result<Self::Float, Error> {
        let _ = x;
        Err(Error::NotImplemented("cost"))
    }

    /// Calculates the gradient at given point.
    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        let _ = x;
        Err(Error::NotImplemented("gradient"))
    }

    /// Calculates the Jacobian matrix at given point.
    fn jacobian(&self, x: &Self::Param) -> Result<Self::Jacobian, Error> {
        let _ = x;
        Err(Error::NotImplemented("jacobian"))
    }

    /// Calculates the Hessian matrix at given point.
    fn hessian(&self, x: &Self::Param) -> Result<Self::Hessian, Error> {
        let _ = x;
        Err(Error::NotImplemented("hessian"))
    }
}

/// Number of evaluations performed per capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCounts {
    /// Number of cost function evaluations.
    pub cost: u64,
    /// Number of gradient evaluations.
    pub gradient: u64,
    /// Number of Jacobian evaluations.
    pub jacobian: u64,
    /// Number of Hessian evaluations.
    pub hessian: u64,
}

/// Wrapper around an [`Objective`] that counts evaluations.
///
/// The executor hands the problem to the solver for the duration of one
/// iteration and mirrors the counters into the state afterwards, so the
/// counts are available for diagnostics and observer records. Results are
/// never cached; every call re-invokes the underlying objective.
#[derive(Clone, Debug)]
pub struct Problem<O> {
    objective: O,
    counts: EvalCounts,
}

impl<O: Objective> Problem<O> {
    /// Wraps given objective with all counters at zero.
    pub fn new(objective: O) -> Self {
        Self {
            objective,
            counts: EvalCounts::default(),
        }
    }

    /// Calculates the cost function value at given point.
    pub fn cost(&mut self, x: &O::Param) -> Result<O::Float, Error> {
        self.counts.cost += 1;
        self.objective.cost(x)
    }

    /// Calculates the gradient at given point.
    pub fn gradient(&mut self, x: &O::Param) -> Result<O::Gradient, Error> {
        self.counts.gradient += 1;
        self.objective.gradient(x)
    }

    /// Calculates the Jacobian matrix at given point.
    pub fn jacobian(&mut self, x: &O::Param) -> Result<O::Jacobian, Error> {
        self.counts.jacobian += 1;
        self.objective.jacobian(x)
    }

    /// Calculates the Hessian matrix at given point.
    pub fn hessian(&mut self, x: &O::Param) -> Result<O::Hessian, Error> {
        self.counts.hessian += 1;
        self.objective.hessian(x)
    }

    /// Returns the evaluation counts.
    pub fn counts(&self) -> EvalCounts {
        self.counts
    }

    /// Returns reference to the wrapped objective.
    pub fn objective(&self) -> &O {
        &self.objective
    }

    /// Unwraps the objective, discarding the counters.
    pub fn into_inner(self) -> O {
        self.objective
    }

    // Used when resuming from a checkpoint so that the counters continue
    // from the values mirrored into the persisted state.
    pub(crate) fn set_counts(&mut self, counts: EvalCounts) {
        self.counts = counts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quadratic;

    impl Objective for Quadratic {
        type Param = Vec<f64>;
        type Float = f64;
        type Gradient = Vec<f64>;
        type Jacobian = ();
        type Hessian = ();

        fn cost(&self, x: &Self::Param) -> Result<Self::Float, Error> {
            Ok(x.iter().map(|xi| xi * xi).sum())
        }

        fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
            Ok(x.iter().map(|xi| 2.0 * xi).collect())
        }
    }

    #[test]
    fn counts_increment_per_capability() {
        let mut problem = Problem::new(Quadratic);
        let x = vec![1.0, 2.0];

        problem.cost(&x).unwrap();
        problem.cost(&x).unwrap();
        problem.gradient(&x).unwrap();

        let counts = problem.counts();
        assert_eq!(counts.cost, 2);
        assert_eq!(counts.gradient, 1);
        assert_eq!(counts.jacobian, 0);
        assert_eq!(counts.hessian, 0);
    }

    #[test]
    fn missing_capability_fails_typed() {
        let mut problem = Problem::new(Quadratic);

        let error = problem.hessian(&vec![0.0]).unwrap_err();
        assert!(matches!(error, Error::NotImplemented("hessian")));
    }

    #[test]
    fn counts_increment_even_on_failure() {
        let mut problem = Problem::new(Quadratic);

        problem.jacobian(&vec![0.0]).unwrap_err();
        assert_eq!(problem.counts().jacobian, 1);
    }
}
