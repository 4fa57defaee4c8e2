#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # Optex
//!
//! An execution engine for iterative optimization algorithms written entirely
//! in Rust.
//!
//! This library separates an optimization run into independent pieces with a
//! fixed contract between them: the *objective* defines the problem, the
//! *solver* produces the next iterate from the previous one, and the
//! *executor* drives the loop while taking care of everything that is not the
//! algorithm itself -- best-solution tracking, evaluation counting,
//! termination policies, progress observation and checkpointing. A solver
//! written against this contract gets all of that for free and stays a few
//! dozen lines of algorithm.
//!
//! ## Problem
//!
//! The problem is any type that implements the [`Objective`] trait. Only the
//! capabilities the algorithm of choice needs have to be provided; the
//! remaining ones keep their default implementation, which reports
//! [`Error::NotImplemented`] when a solver asks for them.
//!
//! ```rust
//! use optex::{Error, Objective};
//!
//! struct Rosenbrock {
//!     a: f64,
//!     b: f64,
//! }
//!
//! impl Objective for Rosenbrock {
//!     type Param = Vec<f64>;
//!     type Float = f64;
//!     type Gradient = Vec<f64>;
//!     type Jacobian = ();
//!     type Hessian = ();
//!
//!     fn cost(&self, x: &Self::Param) -> Result<f64, Error> {
//!         Ok((self.a - x[0]).powi(2) + self.b * (x[1] - x[0].powi(2)).powi(2))
//!     }
//! }
//! ```
//!
//! ## Solver
//!
//! The algorithm is any type that implements the [`Solver`] trait for a state
//! shape of its choice ([`IterState`] for point-based algorithms,
//! [`PopulationState`] for population-based ones). See the documentation of
//! [`Solver`] for a complete worked example.
//!
//! ## Executor
//!
//! The [`Executor`] connects a problem with a solver and runs the loop until
//! one of the configured termination criteria fires:
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use optex::observers::{ConsoleObserver, ObserverMode};
//! use optex::Executor;
//!
//! let result = Executor::new(problem, solver)
//!     .with_state(|state| state.param(initial_point))
//!     .with_max_iters(1000)
//!     .with_target_cost(1e-8)
//!     .with_timeout(Duration::from_secs(60))
//!     .with_observer("progress", ConsoleObserver::new(), ObserverMode::Every(10))?
//!     .run()?;
//!
//! println!("{}", result);
//! ```
//!
//! Runs can additionally be persisted and resumed with the stores in
//! [`checkpointing`], which is useful for expensive objectives.
//!
//! ## Features
//!
//! * `testing` -- exposes the `testing` module with simple objectives,
//!   solvers and observers useful for testing solvers built on top of this
//!   library.

mod core;
pub mod checkpointing;
pub mod observers;

pub use crate::core::*;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
