//! A second SIGINT while cleanup hangs ends the process at once.
//!
//! Kept alone in its own binary: the signal goes to every coordinator in
//! the process.

#![cfg(unix)]

mod common;

use std::convert::Infallible;
use std::future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sigdown::{State, Trigger};

fn raise_interrupt() {
    #[allow(unsafe_code)]
    // SAFETY: raising a signal the runtime has a handler installed for.
    let rc = unsafe { libc::raise(libc::SIGINT) };
    assert_eq!(rc, 0);
}

#[tokio::test]
async fn second_sigint_forces_exit_during_hung_cleanup() {
    let mut fx = common::fixture(false);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let spy = Arc::clone(&seen);
    fx.coordinator
        .on_exit(move |trigger| {
            spy.lock().expect("spy lock").push(trigger);
            future::pending::<Result<(), Infallible>>()
        })
        .expect("hook registers");

    // Give the dispatcher a moment to start polling the signal streams.
    tokio::time::sleep(Duration::from_millis(20)).await;
    raise_interrupt();

    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().expect("spy lock").is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cleanup starts");
    assert_eq!(*seen.lock().expect("spy lock"), [Trigger::InterruptSignal]);
    assert_eq!(fx.coordinator.state(), State::ShuttingDown);
    assert!(fx.exits.try_recv().is_err());

    raise_interrupt();

    let code = tokio::time::timeout(Duration::from_secs(5), fx.exits.recv())
        .await
        .expect("forced exit within timeout");
    assert_eq!(code, Some(1));
    tokio::time::timeout(Duration::from_secs(2), fx.coordinator.wait())
        .await
        .expect("wait returns after the forced exit");

    assert_eq!(
        fx.logger.lines(),
        [
            "INFO interrupt-signal. Exiting...",
            "ERROR SIGINT received again during shutdown, forcing exit",
        ]
    );
    assert_eq!(fx.coordinator.state(), State::Terminated);
    assert_eq!(seen.lock().expect("spy lock").len(), 1);
}
