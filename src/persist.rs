//! Persistence of the active set across restarts.
//!
//! Active proxies are already paid for; without a persister every restart
//! buys a fresh set.

use crate::error::PersistError;
use crate::proxy::Proxy;

use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;

/// Saves and loads the active proxies.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Save the current active proxies.
    async fn save(&self, proxies: &[Proxy]) -> Result<(), PersistError>;
    /// Load previously saved proxies. The result may contain expired entries.
    async fn load(&self) -> Result<Vec<Proxy>, PersistError>;
}

/// Persister that saves nothing and loads nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NilPersister;

#[async_trait]
impl Persister for NilPersister {
    async fn save(&self, _proxies: &[Proxy]) -> Result<(), PersistError> {
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Proxy>, PersistError> {
        Ok(Vec::new())
    }
}

/// Persister storing the active proxies as a JSON array in a file.
#[derive(Debug, Clone)]
pub struct FilePersister {
    path: PathBuf,
}

impl FilePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Persister for FilePersister {
    async fn save(&self, proxies: &[Proxy]) -> Result<(), PersistError> {
        // Keep whatever was saved before rather than overwrite it with nothing.
        if proxies.is_empty() {
            debug!("No active proxies to save to {}", self.path.display());
            return Ok(());
        }
        let json = serde_json::to_vec(proxies)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Saved {} proxies to {}", proxies.len(), self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Proxy>, PersistError> {
        let json = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&json)?)
    }
}
