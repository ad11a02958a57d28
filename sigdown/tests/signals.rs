//! A real SIGTERM delivered to this test process reaches the coordinator.
//!
//! Kept alone in its own binary: the signal goes to every coordinator in
//! the process.

#![cfg(unix)]

mod common;

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sigdown::{State, Trigger};

#[tokio::test]
async fn sigterm_runs_cleanup_and_exits_zero() {
    let mut fx = common::fixture(false);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let spy = Arc::clone(&seen);
    fx.coordinator
        .on_exit(move |trigger| {
            spy.lock().expect("spy lock").push(trigger);
            async { Ok::<_, Infallible>(()) }
        })
        .expect("hook registers");

    // Give the dispatcher a moment to start polling the signal streams.
    tokio::time::sleep(Duration::from_millis(20)).await;
    #[allow(unsafe_code)]
    // SAFETY: raising a signal the runtime has a handler installed for.
    let rc = unsafe { libc::raise(libc::SIGTERM) };
    assert_eq!(rc, 0);

    let code = tokio::time::timeout(Duration::from_secs(5), fx.exits.recv())
        .await
        .expect("exit within timeout");
    assert_eq!(code, Some(0));
    fx.coordinator.wait().await;

    assert_eq!(*seen.lock().expect("spy lock"), [Trigger::TerminateSignal]);
    assert_eq!(
        fx.logger.lines(),
        [
            "INFO terminate-signal. Exiting...",
            "INFO Graceful shutdown complete.",
        ]
    );
    assert_eq!(fx.coordinator.state(), State::Terminated);
}
