// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Histogram, IntCounter, IntCounterVec, Registry,
};

const INCLUSION_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10., 12., 15., 20., 30., 45.,
    60., 90., 120.,
];

#[derive(Clone, Debug)]
pub struct GatewayMetrics {
    pub(crate) tx_submitted: IntCounter,
    pub(crate) tx_confirmed: IntCounter,
    pub(crate) tx_failed: IntCounterVec,
    pub(crate) tx_inclusion_latency: Histogram,

    pub(crate) token_cache_hits: IntCounter,
    pub(crate) token_cache_misses: IntCounter,

    pub(crate) sender_lock_retries: IntCounter,
    pub(crate) sender_lock_timeouts: IntCounter,
}

impl GatewayMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            tx_submitted: register_int_counter_with_registry!(
                "gateway_tx_submitted",
                "Total number of transactions broadcast to the ledger",
                registry,
            )
            .unwrap(),
            tx_confirmed: register_int_counter_with_registry!(
                "gateway_tx_confirmed",
                "Total number of transactions confirmed with success status",
                registry,
            )
            .unwrap(),
            tx_failed: register_int_counter_vec_with_registry!(
                "gateway_tx_failed",
                "Total number of failed submissions, by error type",
                &["error_type"],
                registry,
            )
            .unwrap(),
            tx_inclusion_latency: register_histogram_with_registry!(
                "gateway_tx_inclusion_latency",
                "Seconds between broadcast and receipt availability",
                INCLUSION_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            token_cache_hits: register_int_counter_with_registry!(
                "gateway_token_cache_hits",
                "Total number of attribute reads served from a fresh snapshot",
                registry,
            )
            .unwrap(),
            token_cache_misses: register_int_counter_with_registry!(
                "gateway_token_cache_misses",
                "Total number of attribute reads that fell through to the ledger",
                registry,
            )
            .unwrap(),
            sender_lock_retries: register_int_counter_with_registry!(
                "gateway_sender_lock_retries",
                "Total number of sender lease acquisition retries",
                registry,
            )
            .unwrap(),
            sender_lock_timeouts: register_int_counter_with_registry!(
                "gateway_sender_lock_timeouts",
                "Total number of submissions rejected after exhausting lease retries",
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}
