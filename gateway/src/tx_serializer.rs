// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-sender mutual exclusion for transaction submission.
//!
//! Every gateway process that wants to submit for a sender address must
//! first claim that sender's lease row in the shared store. The lease is a
//! single conditional upsert, so no database transaction stays open while
//! the holder talks to the ledger, and a crashed holder's lease simply
//! expires.

use std::sync::Arc;

use ethers::types::Address;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SenderLockConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::metrics::GatewayMetrics;
use crate::store::SenderLockStore;

pub struct TransactionSerializer {
    store: Arc<dyn SenderLockStore>,
    config: SenderLockConfig,
    metrics: Arc<GatewayMetrics>,
}

impl TransactionSerializer {
    pub fn new(
        store: Arc<dyn SenderLockStore>,
        config: SenderLockConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    /// Claims the lease for `sender`, retrying up to the configured count
    /// with a fixed delay. No nonce has been consumed when this fails, so a
    /// [`GatewayError::LockTimeout`] is always safe to retry.
    pub async fn acquire(&self, sender: Address) -> GatewayResult<SenderLockGuard> {
        let holder = Uuid::new_v4();
        let lease = self.config.lease();
        let mut attempt = 0u32;
        loop {
            if self.store.try_claim(sender, holder, lease).await? {
                debug!(sender = %format!("{sender:#x}"), %holder, "sender lease acquired");
                return Ok(SenderLockGuard {
                    store: self.store.clone(),
                    sender,
                    holder,
                    released: false,
                });
            }
            if attempt >= self.config.retry_count {
                self.metrics.sender_lock_timeouts.inc();
                return Err(GatewayError::LockTimeout(format!("{sender:#x}")));
            }
            attempt += 1;
            self.metrics.sender_lock_retries.inc();
            tokio::time::sleep(self.config.retry_delay()).await;
        }
    }
}

/// Holds a claimed sender lease. Call [`release`](SenderLockGuard::release)
/// once the transaction has been broadcast; dropping the guard without
/// releasing falls back to a spawned release, and failing that the lease
/// expires on its own.
pub struct SenderLockGuard {
    store: Arc<dyn SenderLockStore>,
    sender: Address,
    holder: Uuid,
    released: bool,
}

impl std::fmt::Debug for SenderLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderLockGuard")
            .field("sender", &self.sender)
            .field("holder", &self.holder)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl SenderLockGuard {
    pub fn sender(&self) -> Address {
        self.sender
    }

    pub async fn release(mut self) -> GatewayResult<()> {
        self.released = true;
        self.store.release(self.sender, self.holder).await
    }
}

impl Drop for SenderLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            sender = %format!("{:#x}", self.sender),
            "sender lease guard dropped without release"
        );
        // Best effort; the lease expiry covers the case where no runtime is
        // available to run the release.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = self.store.clone();
            let sender = self.sender;
            let holder = self.holder;
            handle.spawn(async move {
                let _ = store.release(sender, holder).await;
            });
        }
    }
}
