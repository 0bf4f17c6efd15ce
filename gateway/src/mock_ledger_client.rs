// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scriptable ledger client used by unit tests.
//!
//! Broadcast transactions are decoded from their signed RLP so tests can
//! assert on the recovered sender, nonce and calldata without a node.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TxHash, U256, U64};
use ethers::utils::rlp::Rlp;

use crate::error::{GatewayError, GatewayResult};
use crate::ledger_client::{CallOutcome, LedgerClient};

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastRecord {
    pub from: Address,
    pub to: Address,
    pub nonce: U256,
    pub calldata: Bytes,
    pub tx_hash: TxHash,
}

#[derive(Default)]
struct Inner {
    pending_nonces: HashMap<Address, u64>,
    call_returns: HashMap<Vec<u8>, Bytes>,
    simulate_revert: Option<String>,
    replay_revert: Option<String>,
    broadcast_error: Option<String>,
    // None means the receipt never shows up (inclusion timeout)
    receipt_status: Option<u64>,
    broadcasts: Vec<BroadcastRecord>,
}

#[derive(Default)]
pub struct MockLedgerClient {
    inner: Mutex<Inner>,
}

impl MockLedgerClient {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                receipt_status: Some(1),
                ..Inner::default()
            }),
        }
    }

    /// Scripts the return data for a call with exactly this calldata.
    /// Unscripted calls succeed with empty return data.
    pub fn set_call_return(&self, calldata: impl Into<Vec<u8>>, output: Bytes) {
        self.inner
            .lock()
            .unwrap()
            .call_returns
            .insert(calldata.into(), output);
    }

    /// Makes latest-block simulations revert with the given payload.
    pub fn set_simulate_revert(&self, payload: &str) {
        self.inner.lock().unwrap().simulate_revert = Some(payload.to_string());
    }

    /// Makes historical-block replays revert with the given payload, without
    /// touching latest-block simulations.
    pub fn set_replay_revert(&self, payload: &str) {
        self.inner.lock().unwrap().replay_revert = Some(payload.to_string());
    }

    pub fn set_broadcast_error(&self, message: Option<&str>) {
        self.inner.lock().unwrap().broadcast_error = message.map(str::to_string);
    }

    /// `Some(1)` confirms, `Some(0)` fails on-chain, `None` never includes.
    pub fn set_receipt_status(&self, status: Option<u64>) {
        self.inner.lock().unwrap().receipt_status = status;
    }

    pub fn set_pending_nonce(&self, address: Address, nonce: u64) {
        self.inner.lock().unwrap().pending_nonces.insert(address, nonce);
    }

    pub fn broadcasts(&self) -> Vec<BroadcastRecord> {
        self.inner.lock().unwrap().broadcasts.clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn call_at(
        &self,
        _from: Address,
        _to: Address,
        calldata: Bytes,
        block: Option<u64>,
    ) -> GatewayResult<CallOutcome> {
        let inner = self.inner.lock().unwrap();
        let scripted_revert = if block.is_some() {
            inner.replay_revert.clone()
        } else {
            inner.simulate_revert.clone()
        };
        if let Some(payload) = scripted_revert {
            return Ok(CallOutcome::Revert(payload));
        }
        let output = inner
            .call_returns
            .get(calldata.as_ref())
            .cloned()
            .unwrap_or_default();
        Ok(CallOutcome::Success(output))
    }

    async fn pending_nonce(&self, address: Address) -> GatewayResult<U256> {
        let inner = self.inner.lock().unwrap();
        Ok(U256::from(
            inner.pending_nonces.get(&address).copied().unwrap_or(0),
        ))
    }

    async fn broadcast(&self, raw: Bytes) -> GatewayResult<TxHash> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = &inner.broadcast_error {
            return Err(GatewayError::Transport(message.clone()));
        }
        let (tx, signature) = TypedTransaction::decode_signed(&Rlp::new(raw.as_ref()))
            .map_err(|e| GatewayError::Transport(format!("undecodable raw transaction: {e}")))?;
        let from = tx.from().copied().unwrap_or_else(|| {
            // Legacy transactions carry no explicit from; recover it.
            signature
                .recover(tx.sighash())
                .unwrap_or_else(|_| Address::zero())
        });
        let record = BroadcastRecord {
            from,
            to: tx
                .to()
                .and_then(|to| to.as_address().copied())
                .unwrap_or_else(Address::zero),
            nonce: tx.nonce().copied().unwrap_or_default(),
            calldata: tx.data().cloned().unwrap_or_default(),
            tx_hash: tx.hash(&signature),
        };
        let tx_hash = record.tx_hash;
        *inner.pending_nonces.entry(from).or_insert(0) += 1;
        inner.broadcasts.push(record);
        Ok(tx_hash)
    }

    async fn wait_for_inclusion(
        &self,
        tx_hash: TxHash,
        _timeout: Duration,
    ) -> GatewayResult<Option<TransactionReceipt>> {
        let inner = self.inner.lock().unwrap();
        match inner.receipt_status {
            None => Ok(None),
            Some(status) => Ok(Some(TransactionReceipt {
                transaction_hash: tx_hash,
                status: Some(U64::from(status)),
                block_number: Some(U64::from(5)),
                ..TransactionReceipt::default()
            })),
        }
    }
}
