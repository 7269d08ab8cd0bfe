//! Middleware implementation for reqwest.

use crate::error::PoolError;
use crate::pool::ProxyPool;
use crate::proxy::Proxy;

use anyhow::anyhow;
use async_trait::async_trait;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use log::{info, warn};
use reqwest_middleware::{Error, Middleware, Next, Result};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Middleware that sends every request through an active proxy of the pool.
///
/// A proxy that fails `failures_before_delete` times within one request is
/// deleted from the pool, which activates (and pays for) a replacement.
#[derive(Clone)]
pub struct ProxyPoolMiddleware {
    /// The proxy pool.
    pool: Arc<ProxyPool>,
    /// Per-proxy rate limiter, keyed by proxy address.
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl ProxyPoolMiddleware {
    /// Create a middleware over a started pool.
    pub fn new(pool: Arc<ProxyPool>) -> Self {
        let rps = pool.config.max_requests_per_second.ceil() as u32;
        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        Self {
            pool,
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    async fn report_failure(&self, proxy: &Proxy) {
        match self.pool.delete(proxy).await {
            Ok(true) => {
                info!("Deleted failing proxy {}", proxy.address());
                self.limiter.retain_recent();
            }
            Ok(false) => {}
            Err(e) => warn!("Failed to delete proxy {}: {}", proxy.address(), e),
        }
    }
}

#[async_trait]
impl Middleware for ProxyPoolMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        _extensions: &mut http::Extensions,
        _next: Next<'_>,
    ) -> Result<reqwest::Response> {
        let max_attempts = self.pool.config.retry_count + 1;
        let mut failures: HashMap<String, usize> = HashMap::new();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let proxy = self.pool.get().await.map_err(|e| {
                warn!("No proxy available: {}", e);
                Error::Middleware(anyhow!(e))
            })?;
            let proxy_addr = proxy.address();

            let proxied_request = req.try_clone().ok_or_else(|| {
                Error::Middleware(anyhow!(
                    "Request object is not cloneable. Are you passing a streaming body?"
                        .to_string()
                ))
            })?;

            info!("Using proxy: {} (attempt {})", proxy_addr, attempt);

            // Apply rate limiting
            self.limiter.until_key_ready(&proxy_addr).await;

            let client = reqwest::Client::builder()
                .proxy(proxy.to_reqwest_proxy()?)
                .timeout(self.pool.config.request_timeout)
                .build()?;

            match client.execute(proxied_request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    warn!(
                        "Request failed with proxy {} (attempt {}): {}",
                        proxy_addr, attempt, err
                    );
                    let count = failures.entry(proxy_addr).or_default();
                    *count += 1;
                    if *count >= self.pool.config.failures_before_delete {
                        self.report_failure(&proxy).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(match last_error {
            Some(err) => Error::Reqwest(err),
            None => Error::Middleware(anyhow!(PoolError::EmptyPool)),
        })
    }
}
