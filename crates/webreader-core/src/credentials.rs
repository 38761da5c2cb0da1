//! Credential pools and the shuffle-then-rotate retry protocol.
//!
//! Both pipeline steps use [`rotate`]: every request walks its pool in a fresh random
//! order, one credential at a time, and stops at the first success. Load and rate-limit
//! exposure spread across keys instead of always landing on the first one.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

use crate::{Error, Result, Role};

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPool {
    role: Role,
    keys: Vec<String>,
}

impl CredentialPool {
    pub fn new(role: Role, keys: impl IntoIterator<Item = String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self { role, keys }
    }

    /// Parse a comma-separated config value (`"k1, k2,,k3"`).
    pub fn parse(role: Role, raw: &str) -> Self {
        Self::new(role, raw.split(',').map(str::to_string))
    }

    pub fn empty(role: Role) -> Self {
        Self {
            role,
            keys: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Fail fast when nothing is configured: retrying cannot fix a missing key.
    pub fn require(&self, var: &str) -> Result<&Self> {
        if self.is_empty() {
            return Err(Error::NotConfigured(format!(
                "no {} credentials configured (set {var})",
                self.role
            )));
        }
        Ok(self)
    }

    pub fn shuffled(&self) -> Vec<&str> {
        self.shuffled_with(&mut rand::thread_rng())
    }

    pub fn shuffled_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<&str> {
        let mut order: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        order.shuffle(rng);
        order
    }
}

// Keys are secrets: never print them, even in debug output.
impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("role", &self.role)
            .field("keys", &self.keys.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Rotated<T> {
    pub value: T,
    /// 1-based number of credentials tried, including the successful one.
    pub attempts: usize,
}

/// Try `attempt` with each credential of `pool` in random order until one succeeds.
///
/// Failures are logged and skipped. When the pool is exhausted the error carries the
/// last failure's message. An empty pool is a configuration error and makes no attempt.
pub async fn rotate<'a, T, F, Fut>(
    pool: &'a CredentialPool,
    provider: &str,
    mut attempt: F,
) -> Result<Rotated<T>>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if pool.is_empty() {
        return Err(Error::NotConfigured(format!(
            "no {} credentials configured for {provider}",
            pool.role
        )));
    }

    let order = pool.shuffled();
    let total = order.len();
    let mut last_error = String::new();

    for (i, key) in order.into_iter().enumerate() {
        let n = i + 1;
        match attempt(key).await {
            Ok(value) => {
                debug!(role = %pool.role, provider, attempt = n, of = total, "credential succeeded");
                return Ok(Rotated { value, attempts: n });
            }
            Err(e) => {
                warn!(role = %pool.role, provider, attempt = n, of = total, error = %e, "credential failed, rotating");
                last_error = e.to_string();
            }
        }
    }

    Err(Error::AllCredentialsFailed {
        role: pool.role,
        attempts: total,
        last_error,
    })
}
