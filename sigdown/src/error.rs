//! Error types for the shutdown coordinator.

use thiserror::Error;
use tokio::task::JoinError;

/// A fault attached to a trigger or produced by a cleanup hook.
pub type Fault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by [`Coordinator`](crate::Coordinator) construction and
/// hook registration.
#[derive(Debug, Error)]
pub enum Error {
    /// The builder was not given a logger.
    #[error("a logger is required: supply a valid logger instance")]
    MissingLogger,

    /// The builder was not given a server.
    #[error("a server is required: supply a valid listening server instance")]
    MissingServer,

    /// The coordinator was built outside of a tokio runtime.
    #[error("the coordinator must be built from within a tokio runtime")]
    NoRuntime,

    /// An OS signal handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    /// A cleanup hook was registered after shutdown had already begun.
    #[error("shutdown already in progress, cleanup hook not registered")]
    ShutdownInProgress,
}

/// Reasons a cleanup hook did not settle successfully.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// The hook returned an error.
    #[error("cleanup failed: {0}")]
    Failed(#[source] Fault),

    /// The hook panicked or its task was cancelled.
    #[error("cleanup aborted: {0}")]
    Aborted(#[from] JoinError),
}
