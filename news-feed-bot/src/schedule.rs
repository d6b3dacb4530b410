use crate::types::{BotError, Result};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Race `fut` against `cancel`. The future is dropped if the token fires first.
pub async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BotError::Cancelled),
        result = fut => result,
    }
}

/// Bound `fut` by `limit`, reporting `what` when the deadline elapses.
pub async fn with_deadline<F, T>(what: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BotError::Timeout {
            what: what.to_string(),
        }),
    }
}

/// Run `tick` immediately, then once per `period`, until `cancel` fires.
///
/// Tick errors and panics are logged and the loop carries on with the next
/// tick. The loop only ends through cancellation, so the return value is
/// always `Err(BotError::Cancelled)` unless the period is invalid. A tick is
/// expected to observe `cancel` itself and finish its own cleanup; it is not
/// dropped mid-flight.
pub async fn run_on_interval<F, Fut>(
    name: &str,
    period: Duration,
    cancel: &CancellationToken,
    mut tick: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if period.is_zero() {
        return Err(BotError::Config(format!("{} interval must be positive", name)));
    }

    if cancel.is_cancelled() {
        return Err(BotError::Cancelled);
    }

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick of a tokio interval completes immediately.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("{} stopped", name);
                return Err(BotError::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        match AssertUnwindSafe(tick()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_cancelled() => {
                info!("{} stopped", name);
                return Err(BotError::Cancelled);
            }
            Ok(Err(e)) => {
                error!(scheduler = name, "Tick failed: {}", e);
            }
            Err(panic) => {
                error!(scheduler = name, "Tick panicked: {}", panic_message(&panic));
            }
        }
    }
}

pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
