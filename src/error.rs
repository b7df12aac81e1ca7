//! Error types for rollsync operations.

use std::path::PathBuf;

use thiserror::Error;

/// Error raised by a listener callback.
///
/// Listeners report failures as boxed errors; the emitting stream collects
/// every failure raised during one emission cycle into a
/// [`ListenerFailures`] chain so that no failure is lost when several
/// listeners are registered.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// A chain of listener failures collected during a single emission cycle.
#[derive(Debug)]
pub struct ListenerFailures {
    /// The collected failures, in listener registration order.
    pub failures: Vec<ListenerError>,
}

impl ListenerFailures {
    pub(crate) fn new(failures: Vec<ListenerError>) -> Self {
        Self { failures }
    }
}

impl std::fmt::Display for ListenerFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} listener callback(s) failed", self.failures.len())?;
        if let Some(first) = self.failures.first() {
            write!(f, ": {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ListenerFailures {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Errors that can occur during rollsync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// I/O error during read/write operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A tunable failed validation when building a [`crate::Configuration`].
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A copy instruction was encountered but no basis is available.
    #[error("copy instruction found but no basis is available")]
    BasisMissing,

    /// A copy instruction reads past the end of the basis.
    #[error("copy out of bounds: offset {offset} + length {length} exceeds basis size {basis_size}")]
    BasisTooShort {
        /// Copy offset in the basis.
        offset: u64,
        /// Copy length.
        length: u32,
        /// Total basis size.
        basis_size: u64,
    },

    /// An out-of-place rebuild was asked to read and write the same path.
    #[error("basis and destination are the same file: {}", .0.display())]
    SameFile(PathBuf),

    /// One or more listener callbacks failed during an emission cycle.
    #[error(transparent)]
    Listener(#[from] ListenerFailures),
}

/// Result type for rollsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Invoke `f` for each listener, collecting failures into a chain.
///
/// All listeners observe the emission even when an earlier one fails.
pub(crate) fn notify_all<L, F>(listeners: &mut [L], mut f: F) -> Result<()>
where
    F: FnMut(&mut L) -> std::result::Result<(), ListenerError>,
{
    let mut failures = Vec::new();
    for listener in listeners.iter_mut() {
        if let Err(e) = f(listener) {
            failures.push(e);
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ListenerFailures::new(failures).into())
    }
}
