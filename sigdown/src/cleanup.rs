//! Cleanup hook adaptation and settlement.
//!
//! Callers register ordinary closures. They are wrapped once, at
//! registration, into a [`CleanupHook`] that yields boxed futures, so the
//! shutdown sequence only ever deals with one shape.

use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{CleanupError, Fault};
use crate::trigger::Trigger;

/// One part of a cleanup operation.
pub(crate) type CleanupFuture = Pin<Box<dyn Future<Output = Result<(), Fault>> + Send>>;

/// A registered cleanup hook, already normalized.
pub(crate) type CleanupHook = Arc<dyn Fn(Trigger) -> Vec<CleanupFuture> + Send + Sync>;

fn boxed<Fut, T, E>(fut: Fut) -> CleanupFuture
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: 'static,
    E: Into<Fault> + 'static,
{
    Box::pin(async move { fut.await.map(drop).map_err(Into::into) })
}

/// Wraps a callback returning a single future.
pub(crate) fn single<F, Fut, T, E>(callback: F) -> CleanupHook
where
    F: Fn(Trigger) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: 'static,
    E: Into<Fault> + 'static,
{
    Arc::new(move |trigger| vec![boxed(callback(trigger))])
}

/// Wraps a callback returning several futures that settle together.
pub(crate) fn each<F, I, Fut, T, E>(callback: F) -> CleanupHook
where
    F: Fn(Trigger) -> I + Send + Sync + 'static,
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: 'static,
    E: Into<Fault> + 'static,
{
    Arc::new(move |trigger| callback(trigger).into_iter().map(boxed).collect())
}

/// Runs `hook` for `trigger` and waits until every part has settled.
///
/// Without a hook a ready `Ok(())` stands in. The hook is invoked on its own
/// task so a panicking callback surfaces as [`CleanupError::Aborted`]
/// instead of unwinding through the caller. When several parts fail, the
/// first failure observed is returned.
pub(crate) async fn settle(
    hook: Option<CleanupHook>,
    trigger: Trigger,
) -> Result<(), CleanupError> {
    let pending = tokio::spawn(async move {
        hook.map_or_else(
            || vec![Box::pin(future::ready(Ok(()))) as CleanupFuture],
            |hook| hook(trigger),
        )
    })
    .await?;

    let mut parts = JoinSet::new();
    for part in pending {
        parts.spawn(part);
    }

    let mut failure = None;
    while let Some(joined) = parts.join_next().await {
        let outcome = match joined {
            Ok(result) => result.map_err(CleanupError::Failed),
            Err(err) => Err(CleanupError::Aborted(err)),
        };
        if let Err(err) = outcome {
            tracing::debug!(%trigger, error = %err, "cleanup part failed");
            failure.get_or_insert(err);
        }
    }
    failure.map_or(Ok(()), Err)
}
