//! `sigdown serve` command — start the demo HTTP server.
//!
//! Binds the listener under a [`Coordinator`], serves the axum router until
//! the shutdown token fires, and lets the cleanup hook wait for in-flight
//! requests before the process exits.

use std::convert::Infallible;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use dotenvy::dotenv;
use sigdown::{Coordinator, Listener, Server, ServerError, TracingLogger};
use tokio_util::task::TaskTracker;

use crate::config::load_config;
use crate::{routes, telemetry};

/// Execute the `serve` command.
///
/// `host` and `port` override the configured bind address.
///
/// With the default process exit this only returns on errors: every
/// shutdown path ends the process from inside the coordinator.
///
/// # Errors
///
/// Returns an error if configuration loading or coordinator setup fails, or
/// if binding fails for a reason the coordinator does not handle.
pub async fn run(
    config_path: &Path,
    host: Option<IpAddr>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    let config = load_config(config_path)?.with_overrides(host, port);
    telemetry::register(config.log_level());

    let listener = Arc::new(Listener::new(config.addr()));
    let coordinator = Coordinator::builder()
        .logger(Arc::new(TracingLogger))
        .server(Arc::clone(&listener) as Arc<dyn Server>)
        .handle_panics(config.shutdown().handle_panics)
        .build()?;

    let in_flight = TaskTracker::new();
    let grace = config.shutdown().drain_grace();
    let drain = in_flight.clone();
    coordinator.on_exit(move |trigger| {
        let drain = drain.clone();
        async move {
            drain.close();
            drain.wait().await;
            if !grace.is_zero() {
                tokio::time::sleep(grace).await;
            }
            tracing::info!(%trigger, "in-flight requests drained");
            Ok::<_, Infallible>(())
        }
    })?;

    tracing::info!("Starting server at http://{}", config.addr());
    let socket = listener.bind().await?;
    let addr = listener.local_addr();

    let shutdown = coordinator.shutdown_token();
    let app = routes::routes(shutdown.clone()).layer(telemetry::http_tracing());
    let graceful = {
        let shutdown = shutdown.clone();
        async move { shutdown.cancelled().await }
    };
    let serve = {
        let coordinator = coordinator.clone();
        let listener = Arc::clone(&listener);
        async move {
            if let Err(source) = axum::serve(socket, app)
                .with_graceful_shutdown(graceful)
                .await
            {
                let err = ServerError::serve(addr, source);
                listener.emit(&err);
                return Err(err);
            }
            if !shutdown.is_cancelled() {
                coordinator.before_exit();
            }
            Ok(())
        }
    };
    coordinator.spawn(in_flight.track_future(serve));

    coordinator.wait().await;
    Ok(())
}
