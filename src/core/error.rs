use thiserror::Error;

/// Type for any error that can be the source of a crate [`Error`].
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Error encountered while running an optimization.
///
/// The executor treats [`NotImplemented`](Error::NotImplemented),
/// [`Solver`](Error::Solver) and [`InvalidConfiguration`](Error::InvalidConfiguration)
/// as fatal. [`Observer`](Error::Observer) errors are always recoverable and
/// [`Checkpoint`](Error::Checkpoint) errors are recoverable unless configured
/// otherwise (see [`Executor::with_fatal_checkpoint_errors`](crate::Executor::with_fatal_checkpoint_errors)).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The objective does not provide the requested evaluation capability.
    #[error("`{0}` is not implemented by the objective")]
    NotImplemented(&'static str),
    /// The executor was set up with invalid settings (e.g., a zero period).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The solver is unable to proceed (e.g., singular matrix).
    #[error("solver error: {0}")]
    Solver(DynError),
    /// An observer sink failed to consume a progress record.
    #[error("observer error: {0}")]
    Observer(DynError),
    /// A checkpoint store failed to persist or load a snapshot.
    #[error("checkpoint error: {0}")]
    Checkpoint(DynError),
}

impl Error {
    /// Creates an [`Error::Solver`] from any error or message.
    pub fn solver(error: impl Into<DynError>) -> Self {
        Error::Solver(error.into())
    }

    /// Creates an [`Error::Observer`] from any error or message.
    pub fn observer(error: impl Into<DynError>) -> Self {
        Error::Observer(error.into())
    }

    /// Creates an [`Error::Checkpoint`] from any error or message.
    pub fn checkpoint(error: impl Into<DynError>) -> Self {
        Error::Checkpoint(error.into())
    }

    /// Creates an [`Error::InvalidConfiguration`] with given message.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::NotImplemented("gradient").to_string(),
            "`gradient` is not implemented by the objective"
        );
        assert_eq!(
            Error::invalid_configuration("period must be positive").to_string(),
            "invalid configuration: period must be positive"
        );
        assert_eq!(
            Error::solver("singular matrix").to_string(),
            "solver error: singular matrix"
        );
    }
}
