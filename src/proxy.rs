//! Proxy representation and expiration.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Wall-clock format the provider uses for `expire_time`, in local time.
pub const EXPIRE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A proxy closer than this to its expiration is treated as expired.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// A paid, time-limited proxy issued by the provider.
///
/// Records are never mutated; a slot is replaced with a new record instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    /// IP address of the proxy.
    pub ip: String,
    /// Port of the proxy.
    pub port: u16,
    /// Expiration time as reported by the provider (`2006-01-02 15:04:05`).
    pub expire_time: String,
}

impl Proxy {
    /// Create a proxy that expires at the given local time.
    pub fn new(ip: impl Into<String>, port: u16, expire_at: DateTime<Local>) -> Self {
        Self {
            ip: ip.into(),
            port,
            expire_time: expire_at.format(EXPIRE_TIME_FORMAT).to_string(),
        }
    }

    /// `ip:port` of the proxy. Two records with the same address are the same endpoint.
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Parsed expiration time, or `None` if the provider sent something unparseable.
    pub fn expires_at(&self) -> Option<DateTime<Local>> {
        NaiveDateTime::parse_from_str(&self.expire_time, EXPIRE_TIME_FORMAT)
            .ok()?
            .and_local_timezone(Local)
            .earliest()
    }

    /// Lifetime left at `now`. `None` if already past or unparseable.
    pub fn remaining_at(&self, now: DateTime<Local>) -> Option<Duration> {
        (self.expires_at()? - now).to_std().ok()
    }

    /// Whether the proxy is expired, or about to, at `now`.
    pub fn is_expired_at(&self, now: DateTime<Local>) -> bool {
        self.remaining_at(now)
            .map_or(true, |remaining| remaining < EXPIRY_MARGIN)
    }

    /// Whether the proxy is expired, or about to.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Local::now())
    }

    /// Convert the proxy to a reqwest::Proxy routing all schemes through it.
    pub fn to_reqwest_proxy(&self) -> Result<reqwest::Proxy, reqwest::Error> {
        reqwest::Proxy::all(format!("http://{}", self.address()))
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (expires {})", self.address(), self.expire_time)
    }
}
