// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;
use url::Url;

/// Chain id the gateway signs for unless overridden.
pub const DEFAULT_CHAIN_ID: u64 = 2017;
/// Fixed gas limit attached to every gateway transaction.
pub const DEFAULT_TX_GAS_LIMIT: u64 = 6_000_000;
/// Base lifetime of a cached attribute snapshot, in seconds (12h).
pub const DEFAULT_TOKEN_CACHE_TTL_SECS: u64 = 43_200;
/// Uniform jitter applied to the TTL, in seconds (6h).
pub const DEFAULT_TOKEN_CACHE_TTL_JITTER_SECS: u64 = 21_600;

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LedgerConfig {
    // Rpc url for the ledger fullnode, used for queries and submissions.
    pub ledger_rpc_url: String,
    // The chain id transactions are signed against.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    // Gas limit attached to every transaction.
    #[serde(default = "default_tx_gas_limit")]
    pub tx_gas_limit: u64,
    // How long to poll for a receipt before reporting an unknown outcome.
    #[serde(default = "default_inclusion_timeout_secs")]
    pub inclusion_timeout_secs: u64,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SenderLockConfig {
    // Attempts to claim the sender lease before giving up.
    #[serde(default = "default_lock_retry_count")]
    pub retry_count: u32,
    // Pause between claim attempts, in milliseconds.
    #[serde(default = "default_lock_retry_delay_ms")]
    pub retry_delay_ms: u64,
    // How long a claimed lease stays valid if the holder dies.
    #[serde(default = "default_lock_lease_secs")]
    pub lease_secs: u64,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TokenCacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_token_cache_ttl_secs")]
    pub ttl_secs: u64,
    // Uniform jitter in [ttl - jitter, ttl + jitter] so snapshots taken in
    // a burst don't all expire together.
    #[serde(default = "default_token_cache_ttl_jitter_secs")]
    pub ttl_jitter_secs: u64,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GatewayConfig {
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub sender_lock: SenderLockConfig,
    #[serde(default)]
    pub token_cache: TokenCacheConfig,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_tx_gas_limit() -> u64 {
    DEFAULT_TX_GAS_LIMIT
}

fn default_inclusion_timeout_secs() -> u64 {
    10
}

fn default_lock_retry_count() -> u32 {
    120
}

fn default_lock_retry_delay_ms() -> u64 {
    100
}

fn default_lock_lease_secs() -> u64 {
    30
}

fn default_cache_enabled() -> bool {
    true
}

fn default_token_cache_ttl_secs() -> u64 {
    DEFAULT_TOKEN_CACHE_TTL_SECS
}

fn default_token_cache_ttl_jitter_secs() -> u64 {
    DEFAULT_TOKEN_CACHE_TTL_JITTER_SECS
}

impl Default for SenderLockConfig {
    fn default() -> Self {
        Self {
            retry_count: default_lock_retry_count(),
            retry_delay_ms: default_lock_retry_delay_ms(),
            lease_secs: default_lock_lease_secs(),
        }
    }
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_token_cache_ttl_secs(),
            ttl_jitter_secs: default_token_cache_ttl_jitter_secs(),
        }
    }
}

impl SenderLockConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}

impl LedgerConfig {
    pub fn inclusion_timeout(&self) -> Duration {
        Duration::from_secs(self.inclusion_timeout_secs)
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.ledger.ledger_rpc_url)
            .map_err(|e| anyhow!("invalid ledger-rpc-url: {e}"))?;
        if self.ledger.tx_gas_limit == 0 {
            return Err(anyhow!("tx-gas-limit must be positive"));
        }
        if self.ledger.inclusion_timeout_secs == 0 {
            return Err(anyhow!("inclusion-timeout-secs must be positive"));
        }
        if self.sender_lock.lease_secs == 0 {
            return Err(anyhow!("sender-lock lease-secs must be positive"));
        }
        if self.token_cache.ttl_jitter_secs >= self.token_cache.ttl_secs {
            return Err(anyhow!(
                "token-cache ttl-jitter-secs must be smaller than ttl-secs"
            ));
        }
        Ok(())
    }
}
