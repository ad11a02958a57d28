//! Shutdown triggers.

use std::fmt;

/// Why the shutdown sequence was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The host's main work finished and the process is winding down.
    BeforeExit,
    /// `SIGABRT` was delivered.
    AbortSignal,
    /// `SIGQUIT` (or Ctrl-Break on Windows) was delivered.
    QuitSignal,
    /// `SIGINT` (or Ctrl-C) was delivered.
    InterruptSignal,
    /// `SIGTERM` (or console close on Windows) was delivered.
    TerminateSignal,
    /// A thread panicked.
    UncaughtFault,
    /// A task spawned through the coordinator returned an error.
    UnhandledRejection,
}

impl Trigger {
    /// Every trigger, in subscription order.
    pub const ALL: [Self; 7] = [
        Self::BeforeExit,
        Self::AbortSignal,
        Self::QuitSignal,
        Self::InterruptSignal,
        Self::TerminateSignal,
        Self::UncaughtFault,
        Self::UnhandledRejection,
    ];

    /// Stable kebab-case name, used in log lines and passed to hooks.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeExit => "before-exit",
            Self::AbortSignal => "abort-signal",
            Self::QuitSignal => "quit-signal",
            Self::InterruptSignal => "interrupt-signal",
            Self::TerminateSignal => "terminate-signal",
            Self::UncaughtFault => "uncaught-fault",
            Self::UnhandledRejection => "unhandled-rejection",
        }
    }

    /// Whether this trigger reports a fault rather than a requested stop.
    #[must_use]
    pub const fn is_fault(self) -> bool {
        matches!(self, Self::UncaughtFault | Self::UnhandledRejection)
    }

    /// Process exit code applied once cleanup settles.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        if self.is_fault() { 1 } else { 0 }
    }

    /// POSIX name of the signal behind this trigger, if any.
    #[must_use]
    pub const fn signal_name(self) -> Option<&'static str> {
        match self {
            Self::AbortSignal => Some("SIGABRT"),
            Self::QuitSignal => Some("SIGQUIT"),
            Self::InterruptSignal => Some("SIGINT"),
            Self::TerminateSignal => Some("SIGTERM"),
            Self::BeforeExit | Self::UncaughtFault | Self::UnhandledRejection => None,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fault_triggers_exit_non_zero() {
        for trigger in Trigger::ALL {
            let expected = i32::from(trigger.is_fault());
            assert_eq!(trigger.exit_code(), expected, "{trigger}");
        }
        assert_eq!(Trigger::UncaughtFault.exit_code(), 1);
        assert_eq!(Trigger::UnhandledRejection.exit_code(), 1);
        assert_eq!(Trigger::InterruptSignal.exit_code(), 0);
        assert_eq!(Trigger::BeforeExit.exit_code(), 0);
    }

    #[test]
    fn signal_triggers_name_their_signal() {
        let named: Vec<_> = Trigger::ALL
            .iter()
            .filter_map(|t| t.signal_name())
            .collect();
        assert_eq!(named, ["SIGABRT", "SIGQUIT", "SIGINT", "SIGTERM"]);
    }

    #[test]
    fn display_uses_kebab_case() {
        assert_eq!(Trigger::InterruptSignal.to_string(), "interrupt-signal");
        assert_eq!(Trigger::UnhandledRejection.to_string(), "unhandled-rejection");
    }
}
