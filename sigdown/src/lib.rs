//! Graceful shutdown coordination for long-running network services.
//!
//! A [`Coordinator`] turns every way a service can end (OS signals, panics,
//! failed background tasks, natural wind-down, listener bind failures) into
//! one shutdown sequence that runs at most once, awaits the registered
//! cleanup hook and exits with a code that depends only on the trigger.
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! use sigdown::{Coordinator, Listener, TracingLogger};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = Arc::new(Listener::new(SocketAddr::from(([0, 0, 0, 0], 8080))));
//! let coordinator = Coordinator::builder()
//!     .logger(Arc::new(TracingLogger))
//!     .server(listener.clone())
//!     .build()?;
//!
//! coordinator.on_exit(|trigger| async move {
//!     tracing::info!(%trigger, "closing database pool");
//!     Ok::<_, std::io::Error>(())
//! })?;
//!
//! let socket = listener.bind().await?;
//! # drop(socket);
//! coordinator.wait().await;
//! # Ok(())
//! # }
//! ```

mod cleanup;
mod coordinator;
mod error;
mod exit;
mod logger;
mod server;
mod signal;
mod trigger;

pub use coordinator::{Coordinator, CoordinatorBuilder, State};
pub use error::{CleanupError, Error, Fault};
pub use exit::{Exit, ProcessExit};
pub use logger::{Logger, TracingLogger};
pub use server::{Disposition, ErrorHandler, Listener, Server, ServerError, Syscall};
pub use signal::PanicFault;
pub use trigger::Trigger;
