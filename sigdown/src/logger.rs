//! Logging capability consumed by the coordinator.

/// Sink for the coordinator's user-visible log lines.
///
/// Any backend works as long as it can record informational and error
/// messages. [`TracingLogger`] forwards to [`tracing`].
pub trait Logger: Send + Sync {
    /// Records an informational message.
    fn info(&self, message: &str);

    /// Records an error message.
    fn error(&self, message: &str);
}

/// [`Logger`] backed by the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "sigdown", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "sigdown", "{message}");
    }
}
