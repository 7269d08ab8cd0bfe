//! Configuration for the proxy pool.

use std::time::Duration;

/// Configuration for the proxy pool.
#[derive(Debug, Clone)]
pub struct ProxyPoolConfig {
    /// Provider API address that hands out proxies.
    pub api_addr: String,
    /// Maximum number of backup proxies. Backup proxies cost nothing until promoted.
    pub backup_capacity: usize,
    /// Number of active proxies. Every active proxy is already paid for.
    pub active_capacity: usize,
    /// Interval after which the whole backup queue is discarded.
    pub clear_interval: Duration,
    /// Minimum remaining lifetime for a fetched proxy to enter the backup queue.
    pub freshness_threshold: Duration,
    /// Provider calls per refill cycle.
    pub max_fetch_attempts: usize,
    /// Pause after the provider throttles us or a refill cycle aborts.
    pub throttle_backoff: Duration,
    /// Upper bound on waiting for a backup proxy. `None` waits forever.
    pub promotion_timeout: Option<Duration>,
    /// Number of times the middleware retries a request through another proxy.
    pub retry_count: usize,
    /// Failures of one proxy within a single request before the middleware deletes it.
    pub failures_before_delete: usize,
    /// Timeout for requests sent by the middleware.
    pub request_timeout: Duration,
    /// Maximum requests per second per proxy.
    pub max_requests_per_second: f64,
}

impl ProxyPoolConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProxyPoolConfigBuilder {
        ProxyPoolConfigBuilder::new()
    }
}

/// Builder for `ProxyPoolConfig`.
pub struct ProxyPoolConfigBuilder {
    api_addr: String,
    backup_capacity: Option<usize>,
    active_capacity: Option<usize>,
    clear_interval: Option<Duration>,
    freshness_threshold: Option<Duration>,
    max_fetch_attempts: Option<usize>,
    throttle_backoff: Option<Duration>,
    promotion_timeout: Option<Duration>,
    retry_count: Option<usize>,
    failures_before_delete: Option<usize>,
    request_timeout: Option<Duration>,
    max_requests_per_second: Option<f64>,
}

impl ProxyPoolConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            api_addr: String::new(),
            backup_capacity: None,
            active_capacity: None,
            clear_interval: None,
            freshness_threshold: None,
            max_fetch_attempts: None,
            throttle_backoff: None,
            promotion_timeout: None,
            retry_count: None,
            failures_before_delete: None,
            request_timeout: None,
            max_requests_per_second: None,
        }
    }

    /// Set the provider API address.
    pub fn api_addr(mut self, addr: impl Into<String>) -> Self {
        self.api_addr = addr.into();
        self
    }

    /// Set the maximum number of backup proxies.
    pub fn backup_capacity(mut self, capacity: usize) -> Self {
        self.backup_capacity = Some(capacity);
        self
    }

    /// Set the number of active proxies.
    pub fn active_capacity(mut self, capacity: usize) -> Self {
        self.active_capacity = Some(capacity);
        self
    }

    /// Set the interval after which the backup queue is discarded.
    pub fn clear_interval(mut self, interval: Duration) -> Self {
        self.clear_interval = Some(interval);
        self
    }

    /// Set the minimum remaining lifetime of a backup proxy.
    /// Pick it according to the lifetime of your provider plan.
    pub fn freshness_threshold(mut self, threshold: Duration) -> Self {
        self.freshness_threshold = Some(threshold);
        self
    }

    /// Set the number of provider calls per refill cycle.
    pub fn max_fetch_attempts(mut self, attempts: usize) -> Self {
        self.max_fetch_attempts = Some(attempts);
        self
    }

    /// Set the pause after throttling or an aborted refill.
    pub fn throttle_backoff(mut self, backoff: Duration) -> Self {
        self.throttle_backoff = Some(backoff);
        self
    }

    /// Bound the wait for a backup proxy during promotion.
    pub fn promotion_timeout(mut self, timeout: Duration) -> Self {
        self.promotion_timeout = Some(timeout);
        self
    }

    /// Set the number of times to retry a request with different proxies.
    pub fn retry_count(mut self, count: usize) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Set how many failures of one proxy within a request trigger its deletion.
    pub fn failures_before_delete(mut self, count: usize) -> Self {
        self.failures_before_delete = Some(count);
        self
    }

    /// Set the timeout for proxied requests.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the maximum requests per second per proxy.
    pub fn max_requests_per_second(mut self, rps: f64) -> Self {
        self.max_requests_per_second = Some(rps);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ProxyPoolConfig {
        ProxyPoolConfig {
            api_addr: self.api_addr,
            backup_capacity: self.backup_capacity.unwrap_or(5),
            active_capacity: self.active_capacity.unwrap_or(3),
            clear_interval: self.clear_interval.unwrap_or(Duration::from_secs(600)),
            freshness_threshold: self.freshness_threshold.unwrap_or(Duration::from_secs(300)),
            max_fetch_attempts: self.max_fetch_attempts.unwrap_or(5),
            throttle_backoff: self.throttle_backoff.unwrap_or(Duration::from_secs(5)),
            promotion_timeout: self.promotion_timeout,
            retry_count: self.retry_count.unwrap_or(3),
            failures_before_delete: self.failures_before_delete.unwrap_or(2),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(10)),
            max_requests_per_second: self.max_requests_per_second.unwrap_or(5.0),
        }
    }
}

impl Default for ProxyPoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
