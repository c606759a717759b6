use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::task::AbortOnDropHandle;
use tracing::debug;
use url::Url;

use crate::config::DEFAULT_WARMUP_SETTLE;

pub trait DnsWarmup: Send + Sync {
    /// Hint that `url`'s origin is about to be contacted, then wait briefly.
    fn warmup(&self, url: &str) -> impl Future<Output = ()> + Send;
}

/// Does nothing; for environments with no resolver worth pre-touching.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopWarmup;

impl DnsWarmup for NoopWarmup {
    async fn warmup(&self, _url: &str) {}
}

/// Origins with a live warmup hint, counted so overlapping hints nest.
#[derive(Clone, Debug, Default)]
pub struct HintRegistry {
    origins: Arc<Mutex<HashMap<String, usize>>>,
}

impl HintRegistry {
    pub fn contains(&self, origin: &str) -> bool {
        self.lock().contains_key(origin)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn insert(&self, origin: &str) -> HintGuard {
        *self.lock().entry(origin.to_string()).or_insert(0) += 1;
        HintGuard {
            registry: self.clone(),
            origin: origin.to_string(),
        }
    }

    fn remove(&self, origin: &str) {
        let mut origins = self.lock();
        if let Some(count) = origins.get_mut(origin) {
            *count -= 1;
            if *count == 0 {
                origins.remove(origin);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.origins.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct HintGuard {
    registry: HintRegistry,
    origin: String,
}

impl Drop for HintGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.origin);
    }
}

/// Pre-resolves the origin host through the system resolver.
///
/// The lookup runs in the background for at most `settle`. It is aborted at
/// the deadline, or as soon as the warmup future is dropped. Warmup never
/// fails the caller.
#[derive(Clone, Debug)]
pub struct ResolverWarmup {
    registry: HintRegistry,
    settle: Duration,
}

impl Default for ResolverWarmup {
    fn default() -> Self {
        Self::new(DEFAULT_WARMUP_SETTLE)
    }
}

impl ResolverWarmup {
    pub fn new(settle: Duration) -> Self {
        Self {
            registry: HintRegistry::default(),
            settle,
        }
    }

    pub fn registry(&self) -> &HintRegistry {
        &self.registry
    }
}

impl DnsWarmup for ResolverWarmup {
    async fn warmup(&self, url: &str) {
        let Some(target) = HintTarget::parse(url) else {
            debug!(url, "dns warmup skipped: no resolvable origin");
            return;
        };

        let _hint = self.registry.insert(&target.origin);
        let authority = target.authority.clone();
        // Dropping the warmup early cancels the lookup along with the hint.
        let lookup = AbortOnDropHandle::new(tokio::spawn(async move {
            tokio::net::lookup_host(authority)
                .await
                .map(|addrs| addrs.count())
        }));

        tokio::time::sleep(self.settle).await;

        if !lookup.is_finished() {
            lookup.abort();
            debug!(origin = %target.origin, "dns warmup still resolving at settle deadline");
            return;
        }
        match lookup.await {
            Ok(Ok(addresses)) => debug!(origin = %target.origin, addresses, "dns warmup resolved"),
            Ok(Err(error)) => debug!(origin = %target.origin, %error, "dns warmup failed"),
            Err(error) => debug!(origin = %target.origin, %error, "dns warmup task ended"),
        }
    }
}

/// Scheme+host+port of a URL, plus the `host:port` string handed to the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HintTarget {
    pub origin: String,
    pub authority: String,
}

impl HintTarget {
    pub fn parse(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        let port = parsed.port_or_known_default()?;
        Some(Self {
            origin: parsed.origin().ascii_serialization(),
            authority: format!("{host}:{port}"),
        })
    }
}
