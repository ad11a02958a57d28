//! Listening-server capability and a TCP implementation of it.
//!
//! The coordinator never owns the server. It only needs two things from it:
//! the port it serves on, for log lines, and a way to hear about server
//! errors. [`Listener`] provides both for a plain tokio [`TcpListener`].

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::{OnceLock, PoisonError, RwLock};

use thiserror::Error;
use tokio::net::TcpListener;

/// Operation a [`ServerError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    /// Binding the listening socket.
    Listen,
    /// Accepting or serving connections after the socket was bound.
    Serve,
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listen => f.write_str("listen"),
            Self::Serve => f.write_str("serve"),
        }
    }
}

/// An I/O failure reported by a server.
#[derive(Debug, Error)]
#[error("{syscall} {addr}: {source}")]
pub struct ServerError {
    syscall: Syscall,
    addr: SocketAddr,
    #[source]
    source: io::Error,
}

impl ServerError {
    /// Creates an error raised while binding `addr`.
    #[must_use]
    pub const fn listen(addr: SocketAddr, source: io::Error) -> Self {
        Self {
            syscall: Syscall::Listen,
            addr,
            source,
        }
    }

    /// Creates an error raised while serving on `addr`.
    #[must_use]
    pub const fn serve(addr: SocketAddr, source: io::Error) -> Self {
        Self {
            syscall: Syscall::Serve,
            addr,
            source,
        }
    }

    /// The operation that failed.
    #[must_use]
    pub const fn syscall(&self) -> Syscall {
        self.syscall
    }

    /// The address involved.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// OS classification of the underlying error.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// What an error handler did with a [`ServerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The handler dealt with the error.
    Handled,
    /// The handler declined; the error goes back to whoever raised it.
    Propagate,
}

/// Callback invoked for every server error.
pub type ErrorHandler = Box<dyn Fn(&ServerError) -> Disposition + Send + Sync>;

/// A listening server as seen by the coordinator.
pub trait Server: Send + Sync {
    /// Port the server is (or is about to be) listening on.
    fn port(&self) -> u16;

    /// Subscribes `handler` to the server's error events.
    fn on_error(&self, handler: ErrorHandler);
}

/// A [`Server`] that binds a tokio [`TcpListener`] and reports failures to
/// its subscribers before returning them.
pub struct Listener {
    addr: SocketAddr,
    bound: OnceLock<SocketAddr>,
    handlers: RwLock<Vec<ErrorHandler>>,
}

impl Listener {
    /// Creates an unbound listener for `addr`.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            bound: OnceLock::new(),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Address the listener is bound to, or the requested one before binding.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.bound.get().copied().unwrap_or(self.addr)
    }

    /// Binds the socket.
    ///
    /// # Errors
    ///
    /// A bind failure is first passed to every subscribed handler, then
    /// returned to the caller.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        match TcpListener::bind(self.addr).await {
            Ok(listener) => {
                let local = listener.local_addr().unwrap_or(self.addr);
                let _ = self.bound.set(local);
                tracing::debug!(addr = %local, "listener bound");
                Ok(listener)
            }
            Err(source) => {
                let err = ServerError::listen(self.addr, source);
                self.emit(&err);
                Err(err)
            }
        }
    }

    /// Reports `err` to the subscribed handlers, stopping at the first one
    /// that handles it.
    pub fn emit(&self, err: &ServerError) -> Disposition {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for handler in handlers.iter() {
            if handler(err) == Disposition::Handled {
                return Disposition::Handled;
            }
        }
        Disposition::Propagate
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl Server for Listener {
    fn port(&self) -> u16 {
        self.local_addr().port()
    }

    fn on_error(&self, handler: ErrorHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, TcpListener as StdTcpListener};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, port))
    }

    #[tokio::test]
    async fn bind_reports_the_assigned_port() {
        let listener = Listener::new(loopback(0));
        assert_eq!(listener.port(), 0);

        let socket = listener.bind().await.expect("bind ephemeral port");
        let local = socket.local_addr().expect("local addr");
        assert_eq!(listener.port(), local.port());
        assert_ne!(listener.port(), 0);
    }

    #[tokio::test]
    async fn bind_failure_reaches_handlers_and_caller() {
        let taken = StdTcpListener::bind(loopback(0)).expect("reserve port");
        let addr = taken.local_addr().expect("local addr");

        let seen = Arc::new(AtomicUsize::new(0));
        let listener = Listener::new(addr);
        let counter = Arc::clone(&seen);
        listener.on_error(Box::new(move |err| {
            assert_eq!(err.syscall(), Syscall::Listen);
            assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
            counter.fetch_add(1, Ordering::SeqCst);
            Disposition::Propagate
        }));

        let err = listener.bind().await.expect_err("port is taken");
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
        assert_eq!(err.addr(), addr);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emit_stops_at_first_handler_that_handles() {
        let calls = Arc::new(AtomicUsize::new(0));
        let listener = Listener::new(loopback(9191));
        for disposition in [Disposition::Handled, Disposition::Propagate] {
            let calls = Arc::clone(&calls);
            listener.on_error(Box::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                disposition
            }));
        }

        let err = ServerError::serve(loopback(9191), io::Error::other("reset"));
        assert_eq!(listener.emit(&err), Disposition::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emit_without_handlers_propagates() {
        let listener = Listener::new(loopback(9191));
        let err = ServerError::serve(loopback(9191), io::Error::other("reset"));
        assert_eq!(listener.emit(&err), Disposition::Propagate);
    }
}
