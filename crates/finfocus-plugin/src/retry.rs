use std::future::Future;
use std::time::Duration;

use finfocus_core::error::CoreError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Retry `call` up to [`MAX_ATTEMPTS`] times on a retryable [`CoreError`]
/// (`Transport`, `Timeout`, `Unavailable`), backing off exponentially from
/// [`INITIAL_BACKOFF`]. Honors `cancel`: a cancelled token interrupts an
/// in-progress backoff sleep and returns the last error immediately (§4.3).
pub async fn retry_with_backoff<F, Fut, T>(
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = call().await;
        match result {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "retrying plugin call");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = cancel.cancelled() => return Err(err),
                }
                backoff = backoff.mul_f64(BACKOFF_MULTIPLIER);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let result = retry_with_backoff(&cancel, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(CoreError::Transport("dial failed".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let result: Result<(), CoreError> = retry_with_backoff(&cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CoreError::Timeout("slow".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let result: Result<(), CoreError> = retry_with_backoff(&cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CoreError::NotSupported("nope".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
