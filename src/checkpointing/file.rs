use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};

use crate::checkpointing::{Checkpoint, CheckpointingFrequency};
use crate::core::Error;

/// Checkpoint store writing snapshots to a JSON file.
///
/// The snapshot is keyed by a directory and a run name; a save replaces the
/// previous snapshot. The file is written to a temporary sibling first and
/// renamed into place, so an interrupted save leaves the previous snapshot
/// intact.
///
/// ```rust
/// use optex::checkpointing::{CheckpointingFrequency, FileCheckpoint};
///
/// let checkpoint = FileCheckpoint::new(
///     "checkpoints",
///     "rosenbrock-run-1",
///     CheckpointingFrequency::Every(20),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct FileCheckpoint {
    directory: PathBuf,
    name: String,
    frequency: CheckpointingFrequency,
}

impl FileCheckpoint {
    /// Creates a store saving into `directory/name.json`.
    pub fn new(
        directory: impl Into<PathBuf>,
        name: impl Into<String>,
        frequency: CheckpointingFrequency,
    ) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            frequency,
        }
    }

    /// Returns the path of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(format!("{}.json", self.name))
    }
}

impl<S, I> Checkpoint<S, I> for FileCheckpoint
where
    S: Serialize + DeserializeOwned,
    I: Serialize + DeserializeOwned,
{
    fn save(&self, solver: &S, state: &I) -> Result<(), Error> {
        fs::create_dir_all(&self.directory).map_err(Error::checkpoint)?;

        let temporary = self.directory.join(format!("{}.json.tmp", self.name));
        let file = File::create(&temporary).map_err(Error::checkpoint)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &(solver, state)).map_err(Error::checkpoint)?;
        drop(writer);

        fs::rename(temporary, self.path()).map_err(Error::checkpoint)
    }

    fn load(&self) -> Result<Option<(S, I)>, Error> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path).map_err(Error::checkpoint)?;
        let pair = serde_json::from_reader(BufReader::new(file)).map_err(Error::checkpoint)?;
        Ok(Some(pair))
    }

    fn frequency(&self) -> CheckpointingFrequency {
        self.frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IterState, State};
    use crate::testing::scratch_dir;

    type TestState = IterState<Vec<f64>, (), (), (), f64>;

    #[test]
    fn save_load_roundtrip() {
        let directory = scratch_dir("checkpoint-roundtrip");
        let checkpoint =
            FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Always);

        let empty: Option<((), TestState)> = checkpoint.load().unwrap();
        assert!(empty.is_none());

        let mut state = TestState::empty().param(vec![1.0, 2.0]).cost(3.0);
        state.update();
        state.increment_iter();

        checkpoint.save(&(), &state).unwrap();
        let (_, restored): ((), TestState) = checkpoint.load().unwrap().unwrap();

        assert_eq!(restored.get_iter(), 1);
        assert_eq!(restored.get_best_cost(), 3.0);
        assert_eq!(restored.get_best_param(), Some(&vec![1.0, 2.0]));

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let directory = scratch_dir("checkpoint-replace");
        let checkpoint =
            FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Always);

        let first = TestState::empty().cost(2.0);
        let second = TestState::empty().cost(1.0);
        checkpoint.save(&(), &first).unwrap();
        checkpoint.save(&(), &second).unwrap();

        let (_, restored): ((), TestState) = checkpoint.load().unwrap().unwrap();
        assert_eq!(restored.get_cost(), 1.0);

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn fresh_state_costs_roundtrip() {
        // A state saved before the first update still has its costs at
        // infinity and must load back.
        let directory = scratch_dir("checkpoint-fresh");
        let checkpoint = FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Always);

        checkpoint.save(&(), &TestState::empty()).unwrap();
        let (_, restored): ((), TestState) = checkpoint.load().unwrap().unwrap();

        assert!(restored.get_cost().is_infinite());
        assert!(restored.get_best_cost().is_infinite());

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn load_failure_is_typed() {
        let directory = scratch_dir("checkpoint-corrupt");
        fs::create_dir_all(&directory).unwrap();
        fs::write(directory.join("run.json"), "not json").unwrap();

        let checkpoint =
            FileCheckpoint::new(&directory, "run", CheckpointingFrequency::Always);
        let result: Result<Option<((), TestState)>, _> = checkpoint.load();
        assert!(matches!(result, Err(Error::Checkpoint(_))));

        fs::remove_dir_all(directory).unwrap();
    }
}
