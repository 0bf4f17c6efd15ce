// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Simulate, sign, broadcast and wait.
//!
//! The submitter owns the lifecycle of a single contract write and keeps
//! the error taxonomy honest:
//!
//! - Deterministic rejections are caught by simulating before the sender
//!   lease is even taken, so they consume no nonce.
//! - The lease is held only from nonce read to broadcast. Waiting for
//!   inclusion happens unlocked since the nonce is consumed by then.
//! - A transaction that is included but marked failed is replayed at the
//!   block before inclusion to recover the revert reason the receipt does
//!   not carry.

use std::sync::Arc;
use std::time::Instant;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, TxHash, U64};
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::ledger_client::{CallOutcome, LedgerClient};
use crate::metrics::GatewayMetrics;
use crate::revert_codes::error_code_msg;
use crate::tx_serializer::TransactionSerializer;

pub struct TransactionSubmitter {
    client: Arc<dyn LedgerClient>,
    serializer: TransactionSerializer,
    config: LedgerConfig,
    metrics: Arc<GatewayMetrics>,
}

impl TransactionSubmitter {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        serializer: TransactionSerializer,
        config: LedgerConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            client,
            serializer,
            config,
            metrics,
        }
    }

    /// Submits a contract write and waits for its receipt.
    pub async fn submit(
        &self,
        wallet: &LocalWallet,
        to: Address,
        calldata: Bytes,
    ) -> GatewayResult<TransactionReceipt> {
        let result = self.submit_inner(wallet, to, calldata).await;
        match &result {
            Ok(_) => self.metrics.tx_confirmed.inc(),
            Err(error) => self
                .metrics
                .tx_failed
                .with_label_values(&[error.error_type()])
                .inc(),
        }
        result
    }

    /// Broadcasts a contract write without waiting for inclusion. The
    /// returned hash is the caller's handle for later reconciliation.
    pub async fn submit_no_wait(
        &self,
        wallet: &LocalWallet,
        to: Address,
        calldata: Bytes,
    ) -> GatewayResult<TxHash> {
        let from = wallet.address();
        self.simulate(from, to, calldata.clone()).await?;
        let result = self.broadcast_serialized(wallet, to, calldata).await;
        if let Err(error) = &result {
            self.metrics
                .tx_failed
                .with_label_values(&[error.error_type()])
                .inc();
        }
        result
    }

    async fn submit_inner(
        &self,
        wallet: &LocalWallet,
        to: Address,
        calldata: Bytes,
    ) -> GatewayResult<TransactionReceipt> {
        let from = wallet.address();
        self.simulate(from, to, calldata.clone()).await?;

        let tx_hash = self.broadcast_serialized(wallet, to, calldata.clone()).await?;

        let started = Instant::now();
        let receipt = self
            .client
            .wait_for_inclusion(tx_hash, self.config.inclusion_timeout())
            .await?;
        let receipt = match receipt {
            Some(receipt) => receipt,
            None => return Err(GatewayError::InclusionTimeout(tx_hash)),
        };
        self.metrics
            .tx_inclusion_latency
            .observe(started.elapsed().as_secs_f64());

        if receipt.status == Some(U64::zero()) {
            return Err(self.inspect_tx_failure(from, to, calldata, &receipt).await);
        }
        info!(?tx_hash, "transaction confirmed");
        Ok(receipt)
    }

    /// Runs the write as an `eth_call` first. A revert here is deterministic
    /// and is returned as the mapped domain error before any nonce is used.
    async fn simulate(&self, from: Address, to: Address, calldata: Bytes) -> GatewayResult<()> {
        match self.client.call(from, to, calldata).await? {
            CallOutcome::Success(_) => Ok(()),
            CallOutcome::Revert(payload) => Err(classify_revert(&payload)),
        }
    }

    /// Nonce read, sign and broadcast, all under the sender lease.
    async fn broadcast_serialized(
        &self,
        wallet: &LocalWallet,
        to: Address,
        calldata: Bytes,
    ) -> GatewayResult<TxHash> {
        let from = wallet.address();
        let guard = self.serializer.acquire(from).await?;
        let result = self.sign_and_broadcast(wallet, from, to, calldata).await;
        if let Err(error) = guard.release().await {
            // The broadcast outcome stands; the lease will expire on its own.
            warn!(%error, "failed to release sender lease");
        }
        result
    }

    async fn sign_and_broadcast(
        &self,
        wallet: &LocalWallet,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> GatewayResult<TxHash> {
        let nonce = self.client.pending_nonce(from).await?;
        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(to)
            .data(calldata)
            .gas(self.config.tx_gas_limit)
            .gas_price(0)
            .nonce(nonce)
            .chain_id(self.config.chain_id)
            .into();
        let wallet = wallet.clone().with_chain_id(self.config.chain_id);
        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| GatewayError::Generic(format!("signing failed: {e}")))?;
        let raw = tx.rlp_signed(&signature);
        let tx_hash = self.client.broadcast(raw).await?;
        self.metrics.tx_submitted.inc();
        info!(?tx_hash, nonce = nonce.as_u64(), "transaction broadcast");
        Ok(tx_hash)
    }

    /// Receipts don't carry revert reasons, so a failed transaction is
    /// replayed as a call against the state right before its inclusion
    /// block.
    async fn inspect_tx_failure(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
        receipt: &TransactionReceipt,
    ) -> GatewayError {
        let replay_block = receipt
            .block_number
            .map(|n| n.as_u64().saturating_sub(1));
        match self.client.call_at(from, to, calldata, replay_block).await {
            Ok(CallOutcome::Revert(payload)) => classify_revert(&payload),
            Ok(CallOutcome::Success(_)) => GatewayError::Generic(format!(
                "transaction {:?} failed on-chain but replay succeeded",
                receipt.transaction_hash
            )),
            Err(error) => error,
        }
    }
}

fn classify_revert(payload: &str) -> GatewayError {
    let (code, message) = error_code_msg(payload);
    GatewayError::Revert { code, message }
}
