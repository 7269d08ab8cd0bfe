//! Test doubles shared by the unit tests.

use crate::error::ProviderError;
use crate::provider::ProxyProvider;
use crate::proxy::Proxy;

use async_trait::async_trait;
use chrono::{Local, TimeDelta};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use url::Url;

/// A proxy with thirty minutes left.
pub(crate) fn fresh_proxy(port: u16) -> Proxy {
    Proxy::new("10.0.0.1", port, Local::now() + TimeDelta::minutes(30))
}

/// A proxy that expired a minute ago.
pub(crate) fn expired_proxy(port: u16) -> Proxy {
    Proxy::new("10.0.0.1", port, Local::now() - TimeDelta::minutes(1))
}

/// Provider replaying scripted responses, then handing out `fallback_batch`
/// fresh proxies with unique ports per call.
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Vec<Proxy>, ProviderError>>>,
    fallback_batch: usize,
    next_port: AtomicU16,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(fallback_batch: usize) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback_batch,
            next_port: AtomicU16::new(10_000),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a response ahead of the fallback batches.
    pub(crate) fn then(self, response: Result<Vec<Proxy>, ProviderError>) -> Self {
        self.script.lock().push_back(response);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyProvider for ScriptedProvider {
    async fn fetch(&self, _api: &Url) -> Result<Vec<Proxy>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.script.lock().pop_front() {
            return response;
        }
        Ok((0..self.fallback_batch)
            .map(|_| fresh_proxy(self.next_port.fetch_add(1, Ordering::SeqCst)))
            .collect())
    }
}
