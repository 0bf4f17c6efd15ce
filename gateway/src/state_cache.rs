// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Read-through cache for token attribute snapshots.
//!
//! Attribute reads fan out into a dozen contract calls, so snapshots are
//! cached in the shared store with a jittered TTL. Correctness comes from
//! write-side invalidation: every attribute-mutating write records an update
//! marker, and a snapshot older than the newest marker is never served.
//!
//! Reads that hit the ledger between another process's broadcast and its
//! marker write can still cache a pre-write snapshot for up to the TTL.
//! This window is accepted; the markers bound it to writes that were
//! in flight during the read.

use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use ethers::types::Address;
use rand::Rng;
use tracing::debug;

use crate::config::TokenCacheConfig;
use crate::error::GatewayResult;
use crate::metrics::GatewayMetrics;
use crate::store::TokenStateStore;
use crate::types::{AttributeSnapshot, TokenAttributes};

pub struct StateCache {
    store: Arc<dyn TokenStateStore>,
    config: TokenCacheConfig,
    metrics: Arc<GatewayMetrics>,
}

/// A snapshot is servable iff it has not expired and no attribute write was
/// recorded after it was taken.
pub fn is_fresh(
    snapshot: &AttributeSnapshot,
    latest_update: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> bool {
    if now >= snapshot.expires_at {
        return false;
    }
    match latest_update {
        Some(updated_at) => updated_at <= snapshot.cached_at,
        None => true,
    }
}

impl StateCache {
    pub fn new(
        store: Arc<dyn TokenStateStore>,
        config: TokenCacheConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    /// Serves `token`'s attributes from a fresh snapshot, falling back to
    /// `loader` and re-caching its result.
    pub async fn read_through<F, Fut>(
        &self,
        token: Address,
        loader: F,
    ) -> GatewayResult<TokenAttributes>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<TokenAttributes>>,
    {
        if self.config.enabled {
            if let Some(snapshot) = self.store.snapshot(token).await? {
                let latest_update = self.store.latest_attr_update(token).await?;
                if is_fresh(&snapshot, latest_update, Utc::now().naive_utc()) {
                    self.metrics.token_cache_hits.inc();
                    return Ok(snapshot.attributes);
                }
            }
        }

        self.metrics.token_cache_misses.inc();
        let attributes = loader().await?;

        if self.config.enabled {
            let now = Utc::now().naive_utc();
            let snapshot = AttributeSnapshot {
                token_address: token,
                attributes: attributes.clone(),
                cached_at: now,
                expires_at: now + chrono::Duration::seconds(self.jittered_ttl_secs()),
            };
            self.store.put_snapshot(snapshot).await?;
            debug!(token = %format!("{token:#x}"), "attribute snapshot cached");
        }
        Ok(attributes)
    }

    /// Write-side invalidation, called after every attribute-mutating write.
    pub async fn invalidate(&self, token: Address) -> GatewayResult<()> {
        self.store.invalidate(token, Utc::now().naive_utc()).await
    }

    // Uniform in [ttl - jitter, ttl + jitter] so a burst of snapshots taken
    // together doesn't expire together.
    fn jittered_ttl_secs(&self) -> i64 {
        let ttl = self.config.ttl_secs as i64;
        let jitter = self.config.ttl_jitter_secs as i64;
        if jitter == 0 {
            return ttl;
        }
        rand::thread_rng().gen_range(ttl - jitter..=ttl + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::types::{BondAttributes, CommonAttributes};
    use ethers::types::U256;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn token() -> Address {
        Address::repeat_byte(0x11)
    }

    fn attributes(name: &str) -> TokenAttributes {
        TokenAttributes::Bond(BondAttributes {
            common: CommonAttributes {
                issuer_address: Address::repeat_byte(0xaa),
                name: name.to_string(),
                symbol: "BND".to_string(),
                total_supply: U256::from(10_000u64),
                tradable_exchange_contract_address: Address::zero(),
                personal_info_contract_address: Address::zero(),
                require_personal_info_registered: true,
                contact_information: String::new(),
                privacy_policy: String::new(),
                status: true,
                transferable: true,
                is_offering: false,
                transfer_approval_required: false,
            },
            face_value: U256::from(100u64),
            face_value_currency: "JPY".to_string(),
            interest_rate: U256::zero(),
            redemption_date: String::new(),
            redemption_value: U256::zero(),
            purpose: String::new(),
            memo: String::new(),
            is_redeemed: false,
        })
    }

    fn cache(store: Arc<MemoryStore>, enabled: bool) -> StateCache {
        StateCache::new(
            store,
            TokenCacheConfig {
                enabled,
                ttl_secs: 3_600,
                ttl_jitter_secs: 0,
            },
            Arc::new(GatewayMetrics::new_for_testing()),
        )
    }

    async fn read_counting(
        cache: &StateCache,
        loads: &AtomicU32,
        name: &str,
    ) -> TokenAttributes {
        cache
            .read_through(token(), || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(attributes(name))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store, true);
        let loads = AtomicU32::new(0);

        let first = read_counting(&cache, &loads, "v1").await;
        let second = read_counting(&cache, &loads, "v2").await;

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone(), true);
        let loads = AtomicU32::new(0);

        read_counting(&cache, &loads, "v1").await;
        cache.invalidate(token()).await.unwrap();
        assert!(!store.has_snapshot(token()));

        let reloaded = read_counting(&cache, &loads, "v2").await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(reloaded, attributes("v2"));
    }

    #[tokio::test]
    async fn test_update_marker_beats_lingering_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone(), true);
        let loads = AtomicU32::new(0);

        read_counting(&cache, &loads, "v1").await;
        // Marker written without dropping the snapshot, as when another
        // process's delete raced a concurrent re-cache.
        store
            .record_attr_update(
                token(),
                Utc::now().naive_utc() + chrono::Duration::seconds(1),
            )
            .await
            .unwrap();

        read_counting(&cache, &loads, "v2").await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_not_served() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone(), true);
        let loads = AtomicU32::new(0);

        let past = Utc::now().naive_utc() - chrono::Duration::seconds(10);
        store
            .put_snapshot(AttributeSnapshot {
                token_address: token(),
                attributes: attributes("old"),
                cached_at: past - chrono::Duration::seconds(3_600),
                expires_at: past,
            })
            .await
            .unwrap();

        let loaded = read_counting(&cache, &loads, "fresh").await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(loaded, attributes("fresh"));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_loads() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone(), false);
        let loads = AtomicU32::new(0);

        read_counting(&cache, &loads, "v1").await;
        read_counting(&cache, &loads, "v2").await;

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(!store.has_snapshot(token()));
    }

    #[test]
    fn test_is_fresh_boundaries() {
        let now = Utc::now().naive_utc();
        let snapshot = AttributeSnapshot {
            token_address: token(),
            attributes: attributes("x"),
            cached_at: now,
            expires_at: now + chrono::Duration::seconds(60),
        };

        assert!(is_fresh(&snapshot, None, now));
        // Marker at exactly cached_at belongs to the write that produced
        // this snapshot.
        assert!(is_fresh(&snapshot, Some(now), now));
        assert!(!is_fresh(
            &snapshot,
            Some(now + chrono::Duration::seconds(1)),
            now
        ));
        assert!(!is_fresh(&snapshot, None, snapshot.expires_at));
    }

    #[test]
    fn test_jittered_ttl_stays_in_bounds() {
        let cache = StateCache::new(
            Arc::new(MemoryStore::new()),
            TokenCacheConfig {
                enabled: true,
                ttl_secs: 43_200,
                ttl_jitter_secs: 21_600,
            },
            Arc::new(GatewayMetrics::new_for_testing()),
        );
        for _ in 0..100 {
            let ttl = cache.jittered_ttl_secs();
            assert!((21_600..=64_800).contains(&ttl));
        }
    }
}
