//! Recording doubles shared by the integration tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use sigdown::{Coordinator, Listener, Logger, Server};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Logger that keeps every line, prefixed with its level.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("logger lock").clone()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.lines
            .lock()
            .expect("logger lock")
            .push(format!("INFO {message}"));
    }

    fn error(&self, message: &str) {
        self.lines
            .lock()
            .expect("logger lock")
            .push(format!("ERROR {message}"));
    }
}

/// A built coordinator plus the handles needed to observe it.
pub struct Fixture {
    pub coordinator: Coordinator,
    pub logger: Arc<RecordingLogger>,
    pub listener: Arc<Listener>,
    pub exits: UnboundedReceiver<i32>,
}

/// Builds a coordinator whose exit codes are sent to `Fixture::exits`.
pub fn fixture(handle_panics: bool) -> Fixture {
    fixture_on(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)), handle_panics)
}

/// Like [`fixture`], with the listener pointed at `addr`.
pub fn fixture_on(addr: SocketAddr, handle_panics: bool) -> Fixture {
    let logger = Arc::new(RecordingLogger::default());
    let listener = Arc::new(Listener::new(addr));
    let (tx, exits) = mpsc::unbounded_channel();
    let coordinator = Coordinator::builder()
        .logger(Arc::clone(&logger) as Arc<dyn Logger>)
        .server(Arc::clone(&listener) as Arc<dyn Server>)
        .exit(move |code: i32| {
            let _ = tx.send(code);
        })
        .handle_panics(handle_panics)
        .build()
        .expect("coordinator builds");
    Fixture {
        coordinator,
        logger,
        listener,
        exits,
    }
}
