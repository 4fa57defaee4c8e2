//! Periodic persistence of `(solver, state)` snapshots.
//!
//! A checkpoint store persists the pair under a run identifier chosen at
//! construction time; the format is up to the store. The executor saves
//! according to the configured [`CheckpointingFrequency`] plus once at loop
//! exit, and loads an existing snapshot at the start of
//! [`Executor::run`](crate::Executor::run), resuming the loop at the stored
//! iteration instead of at zero.
//!
//! Because solvers keep all cross-iteration data in `self` and in the state
//! (see [`Solver`](crate::Solver)), a resumed run of a deterministic solver
//! reproduces the behavior of an uninterrupted one.

mod file;

pub use file::FileCheckpoint;

use crate::core::Error;

/// How often the executor persists a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointingFrequency {
    /// Only the final snapshot at loop exit is persisted.
    Never,
    /// Persist on every iteration.
    Always,
    /// Persist on iterations whose number is a multiple of the period.
    ///
    /// A period of zero is rejected when the store is attached to the
    /// executor.
    Every(u64),
}

impl CheckpointingFrequency {
    pub(crate) fn fires(&self, iter: u64) -> bool {
        match *self {
            CheckpointingFrequency::Never => false,
            CheckpointingFrequency::Always => true,
            CheckpointingFrequency::Every(period) => period != 0 && iter % period == 0,
        }
    }
}

/// Interface of a checkpoint store.
pub trait Checkpoint<S, I> {
    /// Persists the snapshot, replacing a previous one.
    fn save(&self, solver: &S, state: &I) -> Result<(), Error>;

    /// Loads the previously persisted snapshot, or `None` if the store holds
    /// none.
    fn load(&self) -> Result<Option<(S, I)>, Error>;

    /// Returns how often the executor should save.
    fn frequency(&self) -> CheckpointingFrequency;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_fires() {
        assert!(!CheckpointingFrequency::Never.fires(0));
        assert!(CheckpointingFrequency::Always.fires(17));
        assert!(CheckpointingFrequency::Every(5).fires(0));
        assert!(CheckpointingFrequency::Every(5).fires(10));
        assert!(!CheckpointingFrequency::Every(5).fires(11));
    }
}
