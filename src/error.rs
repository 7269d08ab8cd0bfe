//! Error types for the zhima-proxy-pool crate.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the pool façade.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No active proxy is held. Either the active capacity is zero or startup
    /// could not fill a single slot.
    #[error("active proxy set is empty, check the pool configuration")]
    EmptyPool,
    /// The configured provider address is not a valid URL.
    #[error("invalid provider address: {0}")]
    InvalidApiAddr(#[from] url::ParseError),
    /// No backup proxy became available within the promotion timeout.
    #[error("no backup proxy available after {0:?}")]
    BackupTimeout(Duration),
    /// Saving or loading the active set failed.
    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),
}

/// Errors reported by a [`ProxyProvider`](crate::provider::ProxyProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request to the provider failed.
    #[error("provider request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The provider answered with something that is not a valid response.
    #[error("malformed provider response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The provider asked us to slow down.
    #[error("provider throttled, retry after {retry_after:?}")]
    Throttled { retry_after: Duration },
    /// Any other application-level failure.
    #[error("provider error {code}: {message}")]
    Api { code: i64, message: String },
}

/// Errors reported by a [`Persister`](crate::persist::Persister).
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
