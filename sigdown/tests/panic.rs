//! Panics become uncaught faults once the coordinator's hook is installed.
//!
//! Kept alone in its own binary: the panic hook is process-wide.

mod common;

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sigdown::Trigger;

#[tokio::test]
async fn panicking_thread_exits_one_after_cleanup() {
    let mut fx = common::fixture(true);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let spy = Arc::clone(&seen);
    fx.coordinator
        .on_exit(move |trigger| {
            spy.lock().expect("spy lock").push(trigger);
            async { Ok::<_, Infallible>(()) }
        })
        .expect("hook registers");

    let worker = std::thread::spawn::<_, ()>(|| panic!("worker lost its connection"));
    assert!(worker.join().is_err());

    let code = tokio::time::timeout(Duration::from_secs(5), fx.exits.recv())
        .await
        .expect("exit within timeout");
    assert_eq!(code, Some(1));

    assert_eq!(*seen.lock().expect("spy lock"), [Trigger::UncaughtFault]);
    let lines = fx.logger.lines();
    assert_eq!(lines[0], "INFO uncaught-fault. Exiting...");
    assert!(lines[1].starts_with("ERROR panicked at "));
    assert!(lines[1].ends_with("worker lost its connection"));
    assert_eq!(lines[2], "INFO Graceful shutdown complete.");
}
