//! The shutdown coordinator.
//!
//! A [`Coordinator`] subscribes to every termination trigger as soon as it
//! is built and funnels them into one shutdown sequence that runs at most
//! once:
//!
//! 1. log the trigger, and its fault if any;
//! 2. run the registered cleanup hook, or a ready stand-in;
//! 3. wait until every part of it has settled;
//! 4. log the outcome;
//! 5. exit with the trigger's code, whatever the cleanup outcome was.
//!
//! Listener bind faults (permission denied, address in use) bypass the
//! sequence entirely and exit with code 1. A second signal received while
//! cleanup is still running also exits with code 1, without waiting.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::cleanup::{self, CleanupHook};
use crate::error::{Error, Fault};
use crate::exit::{Exit, ProcessExit};
use crate::logger::Logger;
use crate::server::{Disposition, Server, ServerError, Syscall};
use crate::signal::{self, Signals};
use crate::trigger::Trigger;

/// Lifecycle of a [`Coordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// No trigger has fired yet.
    Idle = 0,
    /// A trigger fired and cleanup is running.
    ShuttingDown = 1,
    /// Exit has been invoked.
    Terminated = 2,
}

impl State {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::ShuttingDown,
            _ => Self::Terminated,
        }
    }
}

/// A trigger together with the fault that caused it, if any.
#[derive(Debug)]
pub(crate) struct Event {
    trigger: Trigger,
    fault: Option<Fault>,
}

impl Event {
    pub(crate) const fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            fault: None,
        }
    }

    pub(crate) fn fault(trigger: Trigger, fault: impl Into<Fault>) -> Self {
        Self {
            trigger,
            fault: Some(fault.into()),
        }
    }
}

/// Builder for [`Coordinator`].
///
/// A logger and a server are mandatory; see [`CoordinatorBuilder::build`].
#[must_use]
#[allow(missing_debug_implementations)]
pub struct CoordinatorBuilder {
    logger: Option<Arc<dyn Logger>>,
    server: Option<Arc<dyn Server>>,
    exit: Arc<dyn Exit>,
    handle_panics: bool,
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self {
            logger: None,
            server: None,
            exit: Arc::new(ProcessExit),
            handle_panics: true,
        }
    }
}

impl CoordinatorBuilder {
    /// Sets the logger that records the shutdown's user-visible lines.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the server whose bind faults the coordinator handles.
    pub fn server(mut self, server: Arc<dyn Server>) -> Self {
        self.server = Some(server);
        self
    }

    /// Replaces [`ProcessExit`] with another way of terminating.
    pub fn exit(mut self, exit: impl Exit + 'static) -> Self {
        self.exit = Arc::new(exit);
        self
    }

    /// Whether panics are reported as [`Trigger::UncaughtFault`]. Defaults
    /// to `true`.
    ///
    /// The panic hook is process-wide; disable it when several coordinators
    /// share a process.
    ///
    /// The hook runs before unwinding, so it cannot tell whether a panic
    /// will later be caught. Every panic starts shutdown, including ones
    /// recovered by [`std::panic::catch_unwind`] or observed through a
    /// [`JoinHandle`](tokio::task::JoinHandle), such as a request handler
    /// panicking inside a spawned connection task. Disable this if such
    /// panics are expected and handled elsewhere.
    pub fn handle_panics(mut self, enabled: bool) -> Self {
        self.handle_panics = enabled;
        self
    }

    /// Builds the coordinator and subscribes it to every trigger.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingLogger`] / [`Error::MissingServer`] when either
    ///   capability was not supplied;
    /// - [`Error::NoRuntime`] outside of a tokio runtime;
    /// - [`Error::Signal`] if OS signal registration fails.
    pub fn build(self) -> Result<Coordinator, Error> {
        let logger = self.logger.ok_or(Error::MissingLogger)?;
        let server = self.server.ok_or(Error::MissingServer)?;
        tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let signals = Signals::try_new().map_err(Error::Signal)?;

        let inner = Arc::new(Inner {
            logger,
            server: Arc::clone(&server),
            exit: self.exit,
            hook: RwLock::new(None),
            state: AtomicU8::new(State::Idle as u8),
            shutdown_token: CancellationToken::new(),
            terminated: CancellationToken::new(),
        });

        let weak = Arc::downgrade(&inner);
        server.on_error(Box::new(move |err| on_server_error(&weak, err)));

        let (events, receiver) = mpsc::unbounded_channel();
        if self.handle_panics {
            signal::install_panic_hook(events.clone());
        }

        let task_tracker = TaskTracker::new();
        task_tracker.spawn(dispatch(Arc::clone(&inner), signals, receiver));
        task_tracker.close();

        tracing::debug!(port = server.port(), "shutdown coordinator listening");
        Ok(Coordinator {
            inner,
            events,
            task_tracker,
        })
    }
}

/// Coordinates graceful shutdown for one process.
///
/// Cloning is cheap; clones share the same hook, latch and triggers.
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct Coordinator {
    inner: Arc<Inner>,
    events: UnboundedSender<Event>,
    task_tracker: TaskTracker,
}

impl Coordinator {
    /// Starts building a coordinator.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Registers the cleanup hook run during shutdown.
    ///
    /// The callback receives the trigger and returns a future; synchronous
    /// logic can return [`std::future::ready`]. A panic inside the callback
    /// or its future counts as a failed cleanup. Registering again replaces
    /// the previous hook.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutdownInProgress`] once shutdown has begun.
    pub fn on_exit<F, Fut, T, E>(&self, callback: F) -> Result<(), Error>
    where
        F: Fn(Trigger) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: 'static,
        E: Into<Fault> + 'static,
    {
        self.inner.register(cleanup::single(callback))
    }

    /// Registers a cleanup hook made of several futures awaited together.
    ///
    /// Shutdown waits for all of them, even after one has failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutdownInProgress`] once shutdown has begun.
    pub fn on_exit_each<F, I, Fut, T, E>(&self, callback: F) -> Result<(), Error>
    where
        F: Fn(Trigger) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: 'static,
        E: Into<Fault> + 'static,
    {
        self.inner.register(cleanup::each(callback))
    }

    /// Reports that the host's main work is done, firing
    /// [`Trigger::BeforeExit`]. Safe to call more than once.
    pub fn before_exit(&self) {
        self.send(Event::new(Trigger::BeforeExit));
    }

    /// Spawns `task`; if it returns an error, shutdown starts with
    /// [`Trigger::UnhandledRejection`].
    pub fn spawn<F, E>(&self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<Fault> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(err) = task.await {
                send_event(&events, Event::fault(Trigger::UnhandledRejection, err));
            }
        });
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.state()
    }

    /// Token cancelled as soon as the shutdown sequence starts.
    ///
    /// Hand it to subsystems that should stop accepting work while the
    /// cleanup hook drains them.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown_token.clone()
    }

    /// Waits until exit has been invoked and the dispatcher has finished.
    ///
    /// With [`ProcessExit`] the process ends first, so this only returns when
    /// a custom [`Exit`] is installed.
    pub async fn wait(&self) {
        self.inner.terminated.cancelled().await;
        self.task_tracker.wait().await;
    }

    fn send(&self, event: Event) {
        send_event(&self.events, event);
    }
}

/// Hands `event` to the dispatcher. Once it has stopped the event is dropped.
pub(crate) fn send_event(events: &UnboundedSender<Event>, event: Event) {
    if let Err(SendError(event)) = events.send(event) {
        tracing::debug!(
            trigger = %event.trigger,
            "shutdown dispatcher already stopped, trigger dropped"
        );
    }
}

struct Inner {
    logger: Arc<dyn Logger>,
    server: Arc<dyn Server>,
    exit: Arc<dyn Exit>,
    hook: RwLock<Option<CleanupHook>>,
    state: AtomicU8,
    shutdown_token: CancellationToken,
    terminated: CancellationToken,
}

impl Inner {
    fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    fn register(&self, hook: CleanupHook) -> Result<(), Error> {
        if self.state() != State::Idle {
            return Err(Error::ShutdownInProgress);
        }
        let previous = self
            .hook
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(hook);
        if previous.is_some() {
            tracing::warn!("cleanup hook registered twice, previous hook replaced");
        }
        Ok(())
    }

    fn terminate(&self, code: i32) {
        self.exit.exit(code);
        self.state.store(State::Terminated as u8, Ordering::Release);
        self.terminated.cancel();
    }

    async fn shutdown(&self, event: Event) {
        let Event { trigger, fault } = event;
        if self
            .state
            .compare_exchange(
                State::Idle as u8,
                State::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!(%trigger, "shutdown already started, trigger ignored");
            return;
        }
        self.shutdown_token.cancel();

        self.logger.info(&format!("{trigger}. Exiting..."));
        if let Some(fault) = fault {
            self.logger.error(&fault.to_string());
        }

        let hook = self
            .hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match cleanup::settle(hook, trigger).await {
            Ok(()) => self.logger.info("Graceful shutdown complete."),
            Err(err) => self.logger.error(&format!("Graceful shutdown failed: {err}")),
        }

        self.terminate(trigger.exit_code());
    }

    fn bind_fault(&self, err: &ServerError) -> Disposition {
        if err.syscall() != Syscall::Listen {
            return Disposition::Propagate;
        }
        let port = self.server.port();
        let message = match err.kind() {
            io::ErrorKind::PermissionDenied => format!("{port} requires elevated privileges"),
            io::ErrorKind::AddrInUse => format!("{port} is already in use"),
            _ => return Disposition::Propagate,
        };
        if self
            .state
            .compare_exchange(
                State::Idle as u8,
                State::Terminated as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!(
                error = %err,
                "bind fault after shutdown started, exit left to the sequence"
            );
            return Disposition::Handled;
        }
        self.logger.error(&message);
        self.terminate(1);
        Disposition::Handled
    }

    /// Exits at once when a signal arrives while cleanup is still running.
    fn force_exit(&self, trigger: Trigger) {
        self.logger.error(&format!(
            "{} received again during shutdown, forcing exit",
            trigger.signal_name().unwrap_or(trigger.as_str())
        ));
        self.terminate(FORCED_EXIT_CODE);
    }
}

/// Exit code used when a repeated signal cuts cleanup short.
const FORCED_EXIT_CODE: i32 = 1;

fn on_server_error(inner: &Weak<Inner>, err: &ServerError) -> Disposition {
    inner
        .upgrade()
        .map_or(Disposition::Propagate, |inner| inner.bind_fault(err))
}

/// Waits for the first trigger from any source and runs the sequence for it.
///
/// Signals are still watched while cleanup runs: a second one exits at
/// once. Returns early if a bind fault already terminated the process.
async fn dispatch(
    inner: Arc<Inner>,
    mut signals: Signals,
    mut events: UnboundedReceiver<Event>,
) {
    let event = tokio::select! {
        () = inner.terminated.cancelled() => return,
        Some(trigger) = signals.recv() => Event::new(trigger),
        Some(event) = events.recv() => event,
        else => return,
    };

    let shutdown = inner.shutdown(event);
    tokio::pin!(shutdown);
    tokio::select! {
        biased;
        () = &mut shutdown => {}
        Some(trigger) = signals.recv() => inner.force_exit(trigger),
    }
}
