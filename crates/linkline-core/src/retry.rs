//! Retry with exponential backoff for transient failures

use std::time::Duration;

/// Errors that know whether another attempt could succeed.
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Retry a fallible operation with exponential backoff.
///
/// On retryable errors, logs the failure, sleeps, and retries up to
/// `max_retries` times. Returns `Ok(T)` on first success, or the final `Err`
/// on exhaustion / non-retryable error.
pub fn retry_with_backoff<T, E: Retryable>(
    label: &str,
    max_retries: u32,
    backoff: impl Fn(u32) -> Duration,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                log::debug!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                std::thread::sleep(backoff(attempt));
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky (retryable: {})", self.0)
        }
    }

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn backoff_exponential() {
        assert_eq!(backoff_duration(1), Duration::from_secs(2));
        assert_eq!(backoff_duration(2), Duration::from_secs(4));
        assert_eq!(backoff_duration(3), Duration::from_secs(8));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = retry_with_backoff("test", 3, |_| Duration::ZERO, || {
            calls += 1;
            if calls < 3 { Err(Flaky(true)) } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff("test", 2, |_| Duration::ZERO, || {
            calls += 1;
            Err(Flaky(true))
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff("test", 5, |_| Duration::ZERO, || {
            calls += 1;
            Err(Flaky(false))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
