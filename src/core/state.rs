//! State types recording the progress of an optimization run.
//!
//! A state carries the current and best-known solution, the iteration and
//! evaluation counters, elapsed time and the termination status. The
//! [`State`] trait is the contract the [`Executor`](crate::Executor) needs;
//! three shapes implement it:
//!
//! * [`IterState`] -- point-based algorithms (gradient descent, Newton
//!   variants, line searches, ...),
//! * [`PopulationState`] -- population-based algorithms (particle swarm,
//!   evolutionary methods, ...),
//! * [`LinearProgramState`] -- algorithms that carry a plain solution vector
//!   of a linear program.

mod iter;
mod linear_program;
mod population;

pub use iter::IterState;
pub use linear_program::LinearProgramState;
pub use population::PopulationState;

use std::time::Duration;

use super::float::Float;
use super::kv::Kv;
use super::problem::EvalCounts;
use super::termination::{TerminationReason, TerminationStatus};

/// Common interface of optimization states, as required by the
/// [`Executor`](crate::Executor).
///
/// Implementations must uphold two invariants that the provided state types
/// already take care of: the best cost never increases over iterations, and
/// the termination status is set at most once.
pub trait State {
    /// Type of the parameter point. Opaque to the library.
    type Param: Clone;
    /// Type of the scalar, usually f32 or f64.
    type Float: Float;

    /// Creates a fresh state with the iteration counter at zero, costs at
    /// infinity and no termination status.
    fn new() -> Self;

    /// Performs the best-tracking update for the current iteration.
    ///
    /// If the current cost is *strictly* smaller than the best known cost,
    /// the best point and cost are replaced and the no-improvement streak is
    /// reset; otherwise the streak is incremented. Ties deliberately do not
    /// count as improvements, which keeps the streak semantics stable.
    fn update(&mut self);

    /// Returns reference to the current point.
    fn get_param(&self) -> Option<&Self::Param>;

    /// Returns reference to the best point found so far.
    fn get_best_param(&self) -> Option<&Self::Param>;

    /// Returns the current cost.
    fn get_cost(&self) -> Self::Float;

    /// Returns the best cost found so far.
    fn get_best_cost(&self) -> Self::Float;

    /// Returns the current iteration number.
    fn get_iter(&self) -> u64;

    /// Increments the iteration counter.
    fn increment_iter(&mut self);

    /// Returns the iteration in which the best point was found.
    fn last_best_iter(&self) -> u64;

    /// Returns the number of consecutive iterations without improvement of
    /// the best cost.
    fn stall_iter(&self) -> u64;

    /// Returns true if the last [`update`](State::update) recorded a new
    /// best point.
    fn is_best(&self) -> bool;

    /// Sets the termination status to given reason, unless the state is
    /// already terminated.
    fn terminate_with(&mut self, reason: TerminationReason);

    /// Clears the termination status.
    ///
    /// Used by the executor when resuming from a checkpoint: the persisted
    /// status reflects the limits of the interrupted run, while the resumed
    /// run evaluates its own.
    fn reset_termination(&mut self);

    /// Returns the termination status.
    fn termination_status(&self) -> &TerminationStatus;

    /// Returns true if the state is terminated.
    fn terminated(&self) -> bool {
        self.termination_status().terminated()
    }

    /// Returns the termination reason, if the state is terminated.
    fn termination_reason(&self) -> Option<&TerminationReason> {
        self.termination_status().reason()
    }

    /// Returns time elapsed since the start of the run, if measured already.
    fn time(&self) -> Option<Duration>;

    /// Sets the elapsed time.
    fn set_time(&mut self, time: Duration);

    /// Returns the evaluation counts mirrored from the problem.
    fn counts(&self) -> EvalCounts;

    /// Mirrors the evaluation counts from the problem.
    fn set_counts(&mut self, counts: EvalCounts);

    /// Attaches the diagnostic record of the current iteration.
    fn set_kv(&mut self, kv: Kv);

    /// Returns the diagnostic record of the current iteration.
    fn kv(&self) -> &Kv;
}

// JSON has no representation for non-finite floats (serde_json emits null),
// while the cost fields of a fresh state sit at infinity until the first
// update. The scalar cost fields therefore snapshot through an explicit
// representation that round-trips infinities and NaN.
pub(crate) mod float_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special(String),
    }

    fn encode<F: num_traits::Float>(value: F) -> Repr {
        if value.is_finite() {
            Repr::Finite(value.to_f64().unwrap_or(f64::NAN))
        } else if value.is_nan() {
            Repr::Special(String::from("nan"))
        } else if value.is_sign_positive() {
            Repr::Special(String::from("inf"))
        } else {
            Repr::Special(String::from("-inf"))
        }
    }

    fn decode<F, E>(repr: Repr) -> Result<F, E>
    where
        F: num_traits::Float + num_traits::FromPrimitive,
        E: serde::de::Error,
    {
        match repr {
            Repr::Finite(value) => {
                F::from_f64(value).ok_or_else(|| E::custom("scalar out of range"))
            }
            Repr::Special(token) => match token.as_str() {
                "inf" => Ok(F::infinity()),
                "-inf" => Ok(F::neg_infinity()),
                "nan" => Ok(F::nan()),
                _ => Err(E::custom(format!("invalid scalar `{}`", token))),
            },
        }
    }

    pub fn serialize<F, S>(value: &F, serializer: S) -> Result<S::Ok, S::Error>
    where
        F: num_traits::Float,
        S: Serializer,
    {
        encode(*value).serialize(serializer)
    }

    pub fn deserialize<'de, F, D>(deserializer: D) -> Result<F, D::Error>
    where
        F: num_traits::Float + num_traits::FromPrimitive,
        D: Deserializer<'de>,
    {
        decode(Repr::deserialize(deserializer)?)
    }

    pub mod option_vec {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        use super::{decode, encode, Repr};

        pub fn serialize<F, S>(value: &Option<Vec<F>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            F: num_traits::Float,
            S: Serializer,
        {
            value
                .as_ref()
                .map(|costs| costs.iter().map(|cost| encode(*cost)).collect::<Vec<_>>())
                .serialize(serializer)
        }

        pub fn deserialize<'de, F, D>(deserializer: D) -> Result<Option<Vec<F>>, D::Error>
        where
            F: num_traits::Float + num_traits::FromPrimitive,
            D: Deserializer<'de>,
        {
            match Option::<Vec<Repr>>::deserialize(deserializer)? {
                Some(costs) => costs
                    .into_iter()
                    .map(decode)
                    .collect::<Result<Vec<F>, D::Error>>()
                    .map(Some),
                None => Ok(None),
            }
        }
    }
}
