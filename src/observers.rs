//! Observers receiving per-iteration progress records.
//!
//! An observer is a named sink registered with the
//! [`Executor`](crate::Executor) together with an [`ObserverMode`] that
//! decides on which iterations it fires. Observers are diagnostic, not a
//! correctness dependency: a failing sink is logged and the run continues.
//!
//! Two sinks are built in: [`ConsoleObserver`] writes structured single-line
//! records to an explicitly owned writer (stdout by default) and
//! [`FileObserver`] appends one serialized record per fired iteration to a
//! file.

mod console;
mod file;

pub use console::ConsoleObserver;
pub use file::FileObserver;

use log::warn;

use crate::core::{Error, Kv};

/// Interface of an observer sink.
pub trait Observe {
    /// Called once when the observer is registered. File-backed sinks
    /// typically open their target and write a header here.
    fn observe_init(&mut self, name: &str) -> Result<(), Error> {
        let _ = name;
        Ok(())
    }

    /// Called with the diagnostic record of every iteration the observer's
    /// mode fires for.
    fn observe_iter(&mut self, record: &Kv) -> Result<(), Error>;
}

/// When an observer fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverMode {
    /// Fire on every iteration.
    Always,
    /// Never fire.
    Never,
    /// Fire on iterations whose number is a multiple of the period.
    ///
    /// A period of zero is rejected at registration time.
    Every(u64),
    /// Fire only on iterations that improved the best cost.
    NewBest,
}

impl ObserverMode {
    fn fires(&self, iter: u64, is_best: bool) -> bool {
        match *self {
            ObserverMode::Always => true,
            ObserverMode::Never => false,
            ObserverMode::Every(period) => period != 0 && iter % period == 0,
            ObserverMode::NewBest => is_best,
        }
    }
}

struct Registered {
    name: String,
    observer: Box<dyn Observe>,
    mode: ObserverMode,
}

/// Ordered registry of named observers.
///
/// Observers are invoked synchronously and in registration order. Failures
/// of a sink are reported with [`log::warn!`] and do not abort the run or
/// the dispatch to the remaining observers.
#[derive(Default)]
pub struct Observers {
    registered: Vec<Registered>,
}

impl Observers {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer under given name and calls its
    /// [`observe_init`](Observe::observe_init).
    ///
    /// Fails with [`Error::InvalidConfiguration`] if the name is taken or
    /// the mode is `Every(0)`. An [`observe_init`](Observe::observe_init)
    /// failure is fatal here as well, since a sink that cannot even set up
    /// would silently observe nothing.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mut observer: impl Observe + 'static,
        mode: ObserverMode,
    ) -> Result<(), Error> {
        let name = name.into();

        if self.registered.iter().any(|entry| entry.name == name) {
            return Err(Error::invalid_configuration(format!(
                "observer `{}` is already registered",
                name
            )));
        }

        if mode == ObserverMode::Every(0) {
            return Err(Error::invalid_configuration(
                "observer period must be positive",
            ));
        }

        observer.observe_init(&name)?;
        self.registered.push(Registered {
            name,
            observer: Box::new(observer),
            mode,
        });

        Ok(())
    }

    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Returns true if no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub(crate) fn notify(&mut self, iter: u64, is_best: bool, record: &Kv) {
        for entry in &mut self.registered {
            if !entry.mode.fires(iter, is_best) {
                continue;
            }
            if let Err(error) = entry.observer.observe_iter(record) {
                warn!("observer `{}` failed: {}", entry.name, error);
            }
        }
    }
}
