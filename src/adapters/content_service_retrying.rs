//! Retry wrapper for remote content service operations.

use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::domain::{CancelFlag, RemoteApiConfig, StoreError};
use crate::ports::{ContentService, DeleteRequest, RemoteContent, RemoteEntry, WriteRequest};

const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
const CANCEL_POLL_MS: u64 = 50;
const MAX_LOG_ERROR_CHARS: usize = 512;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RemoteApiConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay_ms: config.retry_delay_ms.max(1),
            max_delay_ms: DEFAULT_MAX_DELAY_MS.max(config.retry_delay_ms),
        }
    }

    fn delay_for_retry(&self, failed_attempt: u32, error: &StoreError) -> Duration {
        if let StoreError::Transient { retry_after_ms: Some(retry_after_ms), .. } = error {
            return Duration::from_millis((*retry_after_ms).min(self.max_delay_ms));
        }

        // attempt=1 -> base, attempt=2 -> base*2, attempt=3 -> base*4, capped.
        let exponent = failed_attempt.saturating_sub(1).min(6);
        let multiplier = 1_u64 << exponent;
        let backoff_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        let jitter_ms = compute_jitter_ms(backoff_ms);
        Duration::from_millis(backoff_ms.saturating_add(jitter_ms).min(self.max_delay_ms))
    }
}

/// Applies bounded retries to transient failures of an inner service.
///
/// Conflicts, authorization failures and every other non-transient kind are
/// returned on the first attempt.
pub struct RetryingContentService<S: ContentService> {
    inner: S,
    policy: RetryPolicy,
    cancel: CancelFlag,
}

impl<S: ContentService> RetryingContentService<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy, cancel: CancelFlag::new() }
    }

    /// Stop retrying, including mid-backoff, once `cancel` is set.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn run<T>(
        &self,
        operation: &str,
        mut call: impl FnMut(&S) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 1;
        loop {
            self.cancel.check()?;

            let error = match call(&self.inner) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.kind().is_retryable() || attempt >= self.policy.max_attempts {
                return Err(error);
            }

            let delay = self.policy.delay_for_retry(attempt, &error);
            tracing::warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {} ms.",
                operation,
                attempt,
                self.policy.max_attempts,
                sanitize_and_truncate_for_log(&error.to_string()),
                delay.as_millis()
            );
            self.sleep(delay)?;
            attempt += 1;
        }
    }

    fn sleep(&self, delay: Duration) -> Result<(), StoreError> {
        let deadline = Instant::now() + delay;
        loop {
            self.cancel.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(Duration::from_millis(CANCEL_POLL_MS)));
        }
    }
}

impl<S: ContentService> ContentService for RetryingContentService<S> {
    fn get(&self, path: &str) -> Result<RemoteContent, StoreError> {
        self.run("get", |inner| inner.get(path))
    }

    fn put_object(&self, request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError> {
        self.run("put_object", |inner| inner.put_object(request))
    }

    fn delete_object(&self, request: DeleteRequest<'_>) -> Result<(), StoreError> {
        self.run("delete_object", |inner| inner.delete_object(request))
    }

    fn authenticated_user(&self) -> Result<String, StoreError> {
        self.run("authenticated_user", |inner| inner.authenticated_user())
    }
}

fn compute_jitter_ms(backoff_ms: u64) -> u64 {
    if backoff_ms <= 1 {
        return 0;
    }

    let jitter_cap = backoff_ms / 4; // 25% jitter upper bound
    if jitter_cap == 0 {
        return 0;
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.subsec_nanos() as u64)
        .unwrap_or(0);

    nanos % jitter_cap
}

fn sanitize_and_truncate_for_log(input: &str) -> String {
    let mut output = String::new();

    for (count, ch) in input.chars().enumerate() {
        if count >= MAX_LOG_ERROR_CHARS {
            break;
        }
        output.push(if ch.is_control() { ' ' } else { ch });
    }

    let mut compact = output.split_whitespace().collect::<Vec<_>>().join(" ");
    if input.chars().count() > MAX_LOG_ERROR_CHARS {
        compact.push_str(" [truncated]");
    }
    compact.trim().to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::testing::ScriptedContentService;

    fn transient(status: u16) -> StoreError {
        StoreError::Transient { message: "server error".to_string(), status: Some(status), retry_after_ms: None }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, base_delay_ms: 1, max_delay_ms: 2 }
    }

    #[test]
    fn retries_transient_failures_and_succeeds() {
        let inner = ScriptedContentService::with_gets(vec![
            Err(transient(500)),
            Err(transient(429)),
            Ok(RemoteContent::Listing(Vec::new())),
        ]);
        let service = RetryingContentService::new(inner, policy(3));

        let result = service.get("files");
        assert_eq!(result.unwrap(), RemoteContent::Listing(Vec::new()));
        assert_eq!(service.inner.get_calls(), 3);
    }

    #[test]
    fn does_not_retry_conflict() {
        let inner = ScriptedContentService::with_gets(vec![Err(StoreError::Conflict {
            path: "files/a.txt".to_string(),
            message: "does not match".to_string(),
        })]);
        let service = RetryingContentService::new(inner, policy(3));

        let err = service.get("files/a.txt").unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(service.inner.get_calls(), 1);
    }

    #[test]
    fn does_not_retry_not_found() {
        let inner = ScriptedContentService::with_gets(vec![Err(StoreError::NotFound {
            path: "files".to_string(),
        })]);
        let service = RetryingContentService::new(inner, policy(3));

        assert!(service.get("files").unwrap_err().is_not_found());
        assert_eq!(service.inner.get_calls(), 1);
    }

    #[test]
    fn stops_after_max_attempts() {
        let inner = ScriptedContentService::with_gets(vec![
            Err(transient(500)),
            Err(transient(502)),
            Err(transient(503)),
            Ok(RemoteContent::Listing(Vec::new())),
        ]);
        let service = RetryingContentService::new(inner, policy(3));

        let err = service.get("files").unwrap_err();
        assert!(matches!(err, StoreError::Transient { status: Some(503), .. }));
        assert_eq!(service.inner.get_calls(), 3);
    }

    #[test]
    fn cancellation_stops_before_next_attempt() {
        struct CancellingService {
            cancel: CancelFlag,
            calls: AtomicUsize,
        }

        impl ContentService for CancellingService {
            fn get(&self, _path: &str) -> Result<RemoteContent, StoreError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.cancel.cancel();
                Err(transient(500))
            }
            fn put_object(&self, _request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError> {
                unreachable!("test only reads")
            }
            fn delete_object(&self, _request: DeleteRequest<'_>) -> Result<(), StoreError> {
                unreachable!("test only reads")
            }
            fn authenticated_user(&self) -> Result<String, StoreError> {
                unreachable!("test only reads")
            }
        }

        let cancel = CancelFlag::new();
        let inner = CancellingService { cancel: cancel.clone(), calls: AtomicUsize::new(0) };
        let service = RetryingContentService::new(inner, policy(5)).with_cancel_flag(cancel);

        let err = service.get("files").unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        assert_eq!(service.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_after_hint_overrides_backoff() {
        let policy = RetryPolicy { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 30_000 };
        let error = StoreError::Transient {
            message: "rate limited".to_string(),
            status: Some(429),
            retry_after_ms: Some(1500),
        };
        assert_eq!(policy.delay_for_retry(1, &error), Duration::from_millis(1500));

        let capped = RetryPolicy { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 100 };
        assert_eq!(capped.delay_for_retry(1, &error), Duration::from_millis(100));
    }

    #[test]
    fn log_format_sanitizes_control_characters() {
        let formatted = sanitize_and_truncate_for_log("bad\nerror\twith\rcontrols");
        assert_eq!(formatted, "bad error with controls");

        let long = "x".repeat(MAX_LOG_ERROR_CHARS + 10);
        assert!(sanitize_and_truncate_for_log(&long).ends_with("[truncated]"));
    }
}
