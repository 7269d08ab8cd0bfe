//! Core proxy pool implementation.
//!
//! The pool keeps two tiers of proxies:
//!
//! * a fixed number of **active** proxies, already paid for and handed out in
//!   round-robin order, guarded by an async read/write lock;
//! * a bounded **backup** queue of fetched but not yet used proxies, guarded by
//!   its own lock and refilled by a background task.
//!
//! An active proxy is replaced by promoting a backup proxy when it expires or
//! when the caller deletes it. Promotion always happens under the active-set
//! write lock and then takes the backup-queue lock, never the other way around.
//!
//! Waiting for a backup proxy has no timeout unless
//! [`ProxyPoolConfig::promotion_timeout`] is set: if the provider never
//! supplies fresh proxies, `get` and `delete` wait indefinitely.

use crate::backup::BackupQueue;
use crate::config::ProxyPoolConfig;
use crate::error::PoolError;
use crate::persist::Persister;
use crate::provider::ProxyProvider;
use crate::proxy::Proxy;
use crate::refill;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use url::Url;

/// An economic pool of paid, time-limited proxies.
pub struct ProxyPool {
    /// Configuration for the pool.
    pub config: ProxyPoolConfig,
    api: Url,
    /// Active proxies, one per slot.
    active: RwLock<Vec<Proxy>>,
    /// Round-robin position over the active slots.
    cursor: AtomicUsize,
    backup: Arc<BackupQueue>,
    provider: Arc<dyn ProxyProvider>,
    persister: Arc<dyn Persister>,
    started: AtomicBool,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ProxyPool {
    /// Create a pool, restoring the active proxies the persister saved last time.
    ///
    /// Saved proxies that have expired are dropped. The pool does nothing until
    /// [`start`](Self::start) is called.
    pub async fn new(
        config: ProxyPoolConfig,
        provider: Arc<dyn ProxyProvider>,
        persister: Arc<dyn Persister>,
    ) -> Result<Arc<Self>, PoolError> {
        let api = Url::parse(&config.api_addr)?;

        let mut active = Vec::with_capacity(config.active_capacity);
        match persister.load().await {
            Ok(saved) => {
                let total = saved.len();
                active.extend(
                    saved
                        .into_iter()
                        .filter(|proxy| !proxy.is_expired())
                        .take(config.active_capacity),
                );
                info!("Restored {}/{} saved active proxies", active.len(), total);
            }
            Err(e) => debug!("No saved active proxies loaded: {}", e),
        }

        let (shutdown, _) = watch::channel(false);
        Ok(Arc::new(Self {
            backup: Arc::new(BackupQueue::new(config.backup_capacity)),
            config,
            api,
            active: RwLock::new(active),
            cursor: AtomicUsize::new(0),
            provider,
            persister,
            started: AtomicBool::new(false),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        }))
    }

    /// Start the refiller and flush tasks, then fill the active set.
    ///
    /// Waits for the backup queue as needed. If filling fails (only possible
    /// with a promotion timeout) the pool keeps running with fewer active
    /// proxies. Calling this twice does nothing.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Proxy pool already started");
            return;
        }

        let refiller = refill::spawn_refiller(
            Arc::clone(&self.backup),
            Arc::clone(&self.provider),
            self.api.clone(),
            self.config.clone(),
            self.shutdown.subscribe(),
        );
        let flush = refill::spawn_flush(
            Arc::clone(&self.backup),
            self.config.clear_interval,
            self.shutdown.subscribe(),
        );
        self.tasks.lock().extend([refiller, flush]);

        let mut active = self.active.write().await;
        while active.len() < self.config.active_capacity {
            match self.pop_backup().await {
                Ok(proxy) => {
                    debug!("Activated proxy {}", proxy);
                    active.push(proxy);
                }
                Err(e) => {
                    error!(
                        "Failed to fill active proxies ({}/{}): {}",
                        active.len(),
                        self.config.active_capacity,
                        e
                    );
                    break;
                }
            }
        }
        info!(
            "Proxy pool started with {}/{} active proxies",
            active.len(),
            self.config.active_capacity
        );
    }

    /// Get the next active proxy in round-robin order.
    ///
    /// An expired proxy is replaced with a backup proxy before it would be returned.
    pub async fn get(&self) -> Result<Proxy, PoolError> {
        let active = self.active.read().await;
        if active.is_empty() {
            return Err(PoolError::EmptyPool);
        }
        let pos = self.cursor.fetch_add(1, Ordering::Relaxed) % active.len();
        if !active[pos].is_expired() {
            return Ok(active[pos].clone());
        }
        drop(active);

        let mut active = self.active.write().await;
        // Another caller may have replaced it while we waited for the write lock.
        if active[pos].is_expired() {
            self.promote(&mut active, pos).await?;
        }
        let active = active.downgrade();
        Ok(active[pos].clone())
    }

    /// Replace every active proxy with the same address as `proxy`.
    ///
    /// Use it only once you are sure the proxy is unusable: each replacement
    /// activates, and pays for, a new proxy. Returns whether anything was replaced;
    /// a promotion timeout after at least one replacement still returns `Ok(true)`.
    pub async fn delete(&self, proxy: &Proxy) -> Result<bool, PoolError> {
        let address = proxy.address();
        let mut active = self.active.write().await;
        let positions: Vec<usize> = active
            .iter()
            .enumerate()
            .filter(|(_, current)| current.address() == address)
            .map(|(pos, _)| pos)
            .collect();

        let mut replaced = 0;
        for &pos in &positions {
            match self.promote(&mut active, pos).await {
                Ok(()) => replaced += 1,
                Err(e) if replaced > 0 => {
                    warn!(
                        "Replaced {}/{} slots holding {}: {}",
                        replaced,
                        positions.len(),
                        address,
                        e
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(replaced > 0)
    }

    /// Save the active proxies with the persister.
    pub async fn persist(&self) -> Result<(), PoolError> {
        let active = self.active.read().await;
        self.persister.save(&active).await?;
        debug!("Persisted {} active proxies", active.len());
        Ok(())
    }

    /// Save the active proxies, then stop the refiller and flush tasks.
    ///
    /// The background tasks stop even if saving fails; the save error is returned.
    pub async fn stop(&self) -> Result<(), PoolError> {
        let saved = self.persist().await;
        self.shutdown.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }
        info!("Proxy pool stopped");
        saved
    }

    /// Get statistics about the proxy pool: `(active, backup)` counts.
    pub async fn get_stats(&self) -> (usize, usize) {
        let active = self.active.read().await.len();
        (active, self.backup.len())
    }

    /// Write a backup proxy into slot `pos`. The caller holds the active write lock.
    async fn promote(&self, active: &mut [Proxy], pos: usize) -> Result<(), PoolError> {
        let replacement = self.pop_backup().await?;
        debug!("Replacing active proxy {} with {}", active[pos], replacement);
        active[pos] = replacement;
        Ok(())
    }

    async fn pop_backup(&self) -> Result<Proxy, PoolError> {
        match self.config.promotion_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.backup.pop())
                .await
                .map_err(|_| PoolError::BackupTimeout(timeout)),
            None => Ok(self.backup.pop().await),
        }
    }
}
