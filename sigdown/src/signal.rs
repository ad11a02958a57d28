//! OS signal and panic subscriptions.
//!
//! [`Signals`] listens for SIGABRT/SIGQUIT/SIGINT/SIGTERM on Unix
//! (Ctrl+C, Ctrl+Break and console close on Windows) and yields the
//! matching [`Trigger`]. [`install_panic_hook`] turns panics into
//! [`Trigger::UncaughtFault`] events.

use std::fmt;
use std::panic::{self, PanicHookInfo};

use tokio::sync::mpsc::UnboundedSender;

use crate::coordinator::{Event, send_event};
use crate::trigger::Trigger;

/// OS signal streams the coordinator subscribes to.
#[allow(missing_debug_implementations)]
pub(crate) struct Signals {
    #[cfg(unix)]
    abort: tokio::signal::unix::Signal,
    #[cfg(unix)]
    quit: tokio::signal::unix::Signal,
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
    #[cfg(windows)]
    ctrl_break: tokio::signal::windows::CtrlBreak,
    #[cfg(windows)]
    ctrl_close: tokio::signal::windows::CtrlClose,
}

impl Signals {
    /// Registers the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    #[cfg(unix)]
    pub(crate) fn try_new() -> Result<Self, std::io::Error> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            abort: signal(SignalKind::from_raw(libc::SIGABRT))?,
            quit: signal(SignalKind::quit())?,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Registers the console control handlers.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if handler registration fails.
    #[cfg(windows)]
    pub(crate) fn try_new() -> Result<Self, std::io::Error> {
        use tokio::signal::windows;

        Ok(Self {
            ctrl_c: windows::ctrl_c()?,
            ctrl_break: windows::ctrl_break()?,
            ctrl_close: windows::ctrl_close()?,
        })
    }

    /// Waits for the next signal. `None` once every stream has closed.
    #[cfg(unix)]
    pub(crate) async fn recv(&mut self) -> Option<Trigger> {
        tokio::select! {
            Some(()) = self.abort.recv() => Some(Trigger::AbortSignal),
            Some(()) = self.quit.recv() => Some(Trigger::QuitSignal),
            Some(()) = self.interrupt.recv() => Some(Trigger::InterruptSignal),
            Some(()) = self.terminate.recv() => Some(Trigger::TerminateSignal),
            else => None,
        }
    }

    /// Waits for the next console event. `None` once every stream has closed.
    #[cfg(windows)]
    pub(crate) async fn recv(&mut self) -> Option<Trigger> {
        tokio::select! {
            Some(()) = self.ctrl_c.recv() => Some(Trigger::InterruptSignal),
            Some(()) = self.ctrl_break.recv() => Some(Trigger::QuitSignal),
            Some(()) = self.ctrl_close.recv() => Some(Trigger::TerminateSignal),
            else => None,
        }
    }
}

/// Fault raised by a panicking thread.
#[derive(Debug)]
pub struct PanicFault {
    message: String,
    location: Option<String>,
}

impl PanicFault {
    fn from_hook(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_owned());
        Self {
            message,
            location: info.location().map(ToString::to_string),
        }
    }

    /// The panic message, or `Box<dyn Any>` for non-string payloads.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "panicked at {location}: {}", self.message),
            None => write!(f, "panicked: {}", self.message),
        }
    }
}

impl std::error::Error for PanicFault {}

/// Chains a panic hook that reports every panic as an uncaught fault.
///
/// The previously installed hook still runs first, so the usual panic
/// message is printed. Sends after the coordinator stopped listening are
/// dropped.
pub(crate) fn install_panic_hook(events: UnboundedSender<Event>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        previous(info);
        let fault = PanicFault::from_hook(info);
        send_event(&events, Event::fault(Trigger::UncaughtFault, fault));
    }));
}
