//! Lock and schedule seam.
//!
//! A retention cycle runs under a cluster-exclusive named lock. Acquisition,
//! keep-alive and release belong to the surrounding lock framework; the core
//! only sees a [`CycleLease`]: the cooperative cancellation signal plus an
//! `extend` hook for frameworks that expose manual keep-alive. Leases release
//! on drop.
//!
//! [`LocalLockProvider`] implements process-local mutual exclusion for
//! standalone mode and tests. Clustered deployments supply their own
//! [`LockProvider`] backed by their coordination layer.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An acquired lock lease for one retention cycle.
#[async_trait]
pub trait CycleLease: Send + Sync {
    /// Cooperative cancellation signal, checked between rules and between
    /// deletion waves.
    fn signal(&self) -> &CancellationToken;

    /// Ask the lock framework to extend the lease. The retention core never
    /// calls this; it exists for providers whose keep-alive is caller-driven.
    async fn extend(&self) -> anyhow::Result<()>;
}

/// Named-lock acquisition.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Try to acquire the named lock. Returns `None` when another holder has
    /// it; the returned lease releases the lock when dropped.
    async fn try_lock(&self, key: &str) -> anyhow::Result<Option<Box<dyn CycleLease>>>;
}

/// Process-local lock provider.
///
/// Mutual exclusion is only guaranteed within this process. All leases share
/// cancellation ancestry with the provider's shutdown token, so requesting
/// shutdown cancels every outstanding cycle.
pub struct LocalLockProvider {
    held: Arc<Mutex<HashSet<String>>>,
    shutdown: CancellationToken,
}

impl LocalLockProvider {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashSet::new())),
            shutdown,
        }
    }
}

#[async_trait]
impl LockProvider for LocalLockProvider {
    async fn try_lock(&self, key: &str) -> anyhow::Result<Option<Box<dyn CycleLease>>> {
        let mut held = self
            .held
            .lock()
            .map_err(|_| anyhow::anyhow!("lock registry poisoned"))?;
        if !held.insert(key.to_string()) {
            return Ok(None);
        }
        Ok(Some(Box::new(LocalLease {
            key: key.to_string(),
            held: Arc::clone(&self.held),
            signal: self.shutdown.child_token(),
        })))
    }
}

struct LocalLease {
    key: String,
    held: Arc<Mutex<HashSet<String>>>,
    signal: CancellationToken,
}

#[async_trait]
impl CycleLease for LocalLease {
    fn signal(&self) -> &CancellationToken {
        &self.signal
    }

    async fn extend(&self) -> anyhow::Result<()> {
        // Nothing to keep alive in-process.
        Ok(())
    }
}

impl Drop for LocalLease {
    fn drop(&mut self) {
        if let Ok(mut held) = self.held.lock() {
            held.remove(&self.key);
        }
    }
}
