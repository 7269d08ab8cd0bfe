//! # zhima-proxy-pool
//!
//! An economic pool of paid, time-limited proxies, with a middleware for reqwest.
//!
//! Paid proxies are scarce, so the pool keeps a fixed number of active proxies
//! and reuses them in round-robin order. Expired or deleted active proxies are
//! replaced from a small backup queue that a background task keeps filled from
//! the provider. Backup proxies cost nothing until they are promoted, and the
//! whole backup queue is discarded periodically so it never goes stale.

pub mod backup;
pub mod config;
pub mod error;
pub mod middleware;
pub mod persist;
pub mod pool;
pub mod provider;
pub mod proxy;
mod refill;
#[cfg(test)]
mod testing;

pub use backup::BackupQueue;
pub use config::{ProxyPoolConfig, ProxyPoolConfigBuilder};
pub use error::{PersistError, PoolError, ProviderError};
pub use middleware::ProxyPoolMiddleware;
pub use persist::{FilePersister, NilPersister, Persister};
pub use pool::ProxyPool;
pub use provider::{ProxyProvider, ZhimaProvider};
pub use proxy::Proxy;
