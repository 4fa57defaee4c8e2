use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason why the iterative process stopped.
///
/// The executor's own checks produce [`MaxItersReached`](TerminationReason::MaxItersReached),
/// [`TargetCostReached`](TerminationReason::TargetCostReached),
/// [`NoImprovementStreak`](TerminationReason::NoImprovementStreak),
/// [`TimeBudgetExceeded`](TerminationReason::TimeBudgetExceeded) and
/// [`Aborted`](TerminationReason::Aborted). Solvers can declare convergence by
/// their own criterion with [`SolverConverged`](TerminationReason::SolverConverged)
/// or [`TargetPrecisionReached`](TerminationReason::TargetPrecisionReached), or
/// report any other algorithm-specific cause with
/// [`SolverExit`](TerminationReason::SolverExit).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TerminationReason {
    /// Maximum number of iterations was reached.
    MaxItersReached,
    /// Best cost reached the configured target.
    TargetCostReached,
    /// The change between iterations dropped below the configured precision.
    TargetPrecisionReached,
    /// The best cost did not improve for the given number of consecutive
    /// iterations.
    NoImprovementStreak(u64),
    /// Elapsed time exceeded the configured budget.
    TimeBudgetExceeded,
    /// The run was cancelled from the outside.
    Aborted,
    /// The solver converged by its own numerical criterion.
    SolverConverged,
    /// The solver stopped for an algorithm-specific reason.
    SolverExit(String),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::MaxItersReached => {
                write!(f, "maximum number of iterations reached")
            }
            TerminationReason::TargetCostReached => write!(f, "target cost reached"),
            TerminationReason::TargetPrecisionReached => write!(f, "target precision reached"),
            TerminationReason::NoImprovementStreak(n) => {
                write!(f, "no improvement in {} consecutive iterations", n)
            }
            TerminationReason::TimeBudgetExceeded => write!(f, "time budget exceeded"),
            TerminationReason::Aborted => write!(f, "aborted"),
            TerminationReason::SolverConverged => write!(f, "solver converged"),
            TerminationReason::SolverExit(reason) => write!(f, "solver exit: {}", reason),
        }
    }
}

/// Whether the iterative process has stopped, and if so, why.
///
/// The status starts as [`NotTerminated`](TerminationStatus::NotTerminated)
/// and is set at most once by [`State::terminate_with`](crate::State::terminate_with).
/// Once terminated, the executor performs no further solver steps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum TerminationStatus {
    /// The process is still running.
    #[default]
    NotTerminated,
    /// The process stopped for the given reason.
    Terminated(TerminationReason),
}

impl TerminationStatus {
    /// Returns true if the process has stopped.
    pub fn terminated(&self) -> bool {
        matches!(self, TerminationStatus::Terminated(_))
    }

    /// Returns the termination reason, if the process has stopped.
    pub fn reason(&self) -> Option<&TerminationReason> {
        match self {
            TerminationStatus::NotTerminated => None,
            TerminationStatus::Terminated(reason) => Some(reason),
        }
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationStatus::NotTerminated => write!(f, "not terminated"),
            TerminationStatus::Terminated(reason) => write!(f, "{}", reason),
        }
    }
}
