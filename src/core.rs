//! Core abstractions of the library.
//!
//! * [`Objective`] -- the problem as the user defines it, with the
//!   capabilities (cost, gradient, Jacobian, Hessian) it actually provides,
//! * [`Problem`] -- the counting wrapper through which solvers evaluate the
//!   objective,
//! * [`State`] and its implementations -- progress bookkeeping of a run,
//! * [`Solver`] -- the iterative algorithm,
//! * [`Executor`] -- the loop connecting all of the above with termination
//!   policies, observers and checkpointing,
//! * [`OptimizationResult`] -- what a finished run returns.

mod error;
mod executor;
mod float;
mod kv;
mod problem;
mod result;
mod solver;
mod state;
mod termination;

pub use error::{DynError, Error};
pub use executor::Executor;
pub use float::Float;
pub use kv::{Kv, KvValue};
pub use problem::{EvalCounts, Objective, Problem};
pub use result::OptimizationResult;
pub use solver::Solver;
pub use state::{IterState, LinearProgramState, PopulationState, State};
pub use termination::{TerminationReason, TerminationStatus};
