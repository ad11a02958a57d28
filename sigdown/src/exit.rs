//! Process termination.

/// Terminates the process with an exit code.
///
/// Production code uses [`ProcessExit`]. Any `Fn(i32)` closure is also an
/// `Exit`, which lets tests observe the code instead of dying.
pub trait Exit: Send + Sync {
    /// Ends the process. Implementations other than [`ProcessExit`] may return.
    fn exit(&self, code: i32);
}

/// Calls [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Exit for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

impl<F> Exit for F
where
    F: Fn(i32) + Send + Sync,
{
    fn exit(&self, code: i32) {
        self(code);
    }
}
