//! Timeout handling for processor calls.

use std::future::Future;
use std::time::Duration;

use super::traits::ProviderError;

/// Await a processor call for at most `timeout`.
///
/// Elapsing the timeout is reported as `Unavailable`, never as success.
/// The inner future is dropped on timeout; callers forward an idempotency
/// key so a request that did reach the processor is not charged twice on retry.
pub async fn with_timeout<F, T>(timeout: Duration, operation: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Unavailable(format!(
            "no response within {}ms",
            timeout.as_millis()
        ))),
    }
}
