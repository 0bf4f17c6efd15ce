// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! On-chain write-serialization and read-consistency core of the security
//! token gateway.
//!
//! The gateway issues, updates and settles security-token transfers on a
//! shared EVM ledger on behalf of multiple issuers. This crate is the part
//! where correctness depends on cross-request ordering and partial
//! observability of ledger state:
//!
//! - [`tx_serializer`]: per-sender mutual exclusion over the shared store,
//!   so concurrent submissions cannot race on nonce assignment.
//! - [`tx_submitter`]: simulate, sign, broadcast, wait; maps revert codes to
//!   domain messages and keeps the error taxonomy honest.
//! - [`state_cache`]: read-through cache of multi-field token attribute
//!   reads, invalidated by the gateway's own writes.
//! - [`transfer_approval`] / [`dvp`]: pure lifecycle derivation over raw
//!   rows populated by the out-of-process indexer.
//!
//! The HTTP layer, keyfile handling and the indexer itself live elsewhere
//! and talk to this crate through the traits in [`store`] and
//! [`ledger_client`].

pub mod config;
pub mod dvp;
pub mod error;
pub mod ledger_client;
pub mod metrics;
pub mod pg_store;
pub mod revert_codes;
pub mod state_cache;
pub mod store;
pub mod token;
pub mod transfer_approval;
pub mod tx_serializer;
pub mod tx_submitter;
pub mod types;

#[cfg(test)]
pub mod memory_store;

#[cfg(test)]
pub mod mock_ledger_client;
