//! Configuration for sync passes.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Largest page the remote serves per request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Configuration shared by every pass an engine runs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Items requested per page, at most [`MAX_PAGE_SIZE`].
    pub page_size: u32,
    /// Deadline for a single listing request. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Retry policy for [`SyncEngine::sync_with_retry`](crate::SyncEngine::sync_with_retry).
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration with default page size and no timeout.
    pub fn new() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            request_timeout: None,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Rejects settings that would make a pass misbehave.
    pub fn validate(&self) -> SyncResult<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(SyncError::InvalidConfig(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(SyncError::InvalidConfig(format!(
                "retry.backoff_multiplier must be a finite value of at least 1.0, got {multiplier}"
            )));
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(SyncError::InvalidConfig(
                "request_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Page size for a collection, honoring its override.
    ///
    /// An override can only shrink the page. Zero overrides are rejected.
    pub fn effective_page_size(&self, page_override: Option<u32>) -> SyncResult<u32> {
        match page_override {
            Some(0) => Err(SyncError::InvalidConfig(
                "collection page_size must be non-zero".into(),
            )),
            Some(size) => Ok(size.min(self.page_size)),
            None => Ok(self.page_size),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for caller-level pass retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% random jitter.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a retry configuration with the given attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// A single attempt with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.add_jitter = enabled;
        self
    }

    /// Delay before the given attempt (0-indexed). Attempt 0 never waits.
    ///
    /// The result is always a valid duration, even for a multiplier that
    /// [`SyncConfig::validate`] would reject.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base.min(self.max_delay.as_secs_f64()).max(0.0);

        let total = if self.add_jitter {
            delay_secs + delay_secs * 0.25 * rand::random::<f64>()
        } else {
            delay_secs
        };
        Duration::try_from_secs_f64(total).unwrap_or(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
