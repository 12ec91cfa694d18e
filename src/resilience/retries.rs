//! Retry-until-success for directory updates.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Run `op` until it succeeds, sleeping `interval` after each failure.
///
/// Returns `None` only when shutdown interrupts a wait between attempts.
/// The wait is abandoned as soon as shutdown fires, so a directory outage
/// never holds up deregistration.
pub async fn retry_until_success<T, E, F, Fut>(
    operation: &'static str,
    interval: Duration,
    shutdown: &mut ShutdownSignal,
    mut op: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempts = attempt, "Directory update succeeded after retries");
                }
                return Some(value);
            }
            Err(e) => {
                tracing::warn!(operation, attempt, error = %e, retry_in = ?interval, "Directory update failed, retrying");
                metrics::record_directory_retry(operation);
                if shutdown.sleep(interval).await {
                    tracing::info!(operation, attempts = attempt, "Retry abandoned for shutdown");
                    return None;
                }
            }
        }
    }
}
