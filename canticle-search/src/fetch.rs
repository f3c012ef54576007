//! Deadline and cancellation wrapper for provider network calls.
//!
//! Every adapter request goes through [`fetch_with_timeout`], which races
//! the request against an internal deadline and an optional caller token.
//! Both abort paths surface as [`LyricsError::Timeout`]; callers cannot
//! tell a cancelled search from a slow provider.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{LyricsError, Result};

/// Default per-request deadline for provider calls.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `request`, aborting it when `timeout` elapses or `cancel` fires.
///
/// # Errors
///
/// Returns [`LyricsError::Timeout`] on either abort path, otherwise the
/// request's own result.
pub async fn fetch_with_timeout<F, T>(
    request: F,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        () = cancelled => Err(timed_out(timeout)),
        () = tokio::time::sleep(timeout) => Err(timed_out(timeout)),
        result = request => result,
    }
}

fn timed_out(timeout: Duration) -> LyricsError {
    LyricsError::Timeout(format!("request exceeded {}ms", timeout.as_millis()))
}
