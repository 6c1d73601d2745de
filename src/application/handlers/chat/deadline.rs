//! Deadline wrapper for generation calls.
//!
//! Every call through a generation port (routing, domain reply, dispatch)
//! runs under a single wall-clock deadline. Elapsing it drops the in-flight
//! future, which cancels the underlying request, and surfaces a uniform
//! timeout error; no partial result is ever used.

use std::future::Future;
use std::time::Duration;

use crate::ports::GeneratorError;

/// Runs a fallible generation future under a deadline.
///
/// On timeout the future is dropped and the error converts into the
/// caller's error type via `From<GeneratorError>`.
pub async fn run_with_deadline<T, E, F>(timeout: Duration, fut: F) -> Result<T, E>
where
    E: From<GeneratorError>,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(GeneratorError::Timeout {
            timeout_secs: timeout.as_secs(),
        }
        .into()),
    }
}
