// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Thin, injectable handle over the ledger JSON-RPC node.
//!
//! Everything the gateway needs from the chain goes through the
//! [`LedgerClient`] trait so that the submitter, the cache and the
//! settlement workflow can be exercised against a scripted mock. The
//! production implementation wraps an `ethers` HTTP provider.

use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockId, BlockNumber, Bytes, TransactionReceipt, TransactionRequest, TxHash, U256,
};
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// Interval between receipt polls while waiting for inclusion.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of an `eth_call` simulation.
///
/// Reverts are data, not transport failures: the submitter classifies them
/// into the domain error taxonomy, so the client surfaces the raw revert
/// payload instead of collapsing it into an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success(Bytes),
    /// Revert reason with any "execution reverted: " prefix already stripped.
    Revert(String),
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Simulates a read or write call against the given block, or the latest
    /// block when `block` is `None`.
    async fn call_at(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
        block: Option<u64>,
    ) -> GatewayResult<CallOutcome>;

    async fn call(&self, from: Address, to: Address, calldata: Bytes) -> GatewayResult<CallOutcome> {
        self.call_at(from, to, calldata, None).await
    }

    /// Next nonce for `address` including transactions still in the mempool.
    async fn pending_nonce(&self, address: Address) -> GatewayResult<U256>;

    /// Broadcasts a signed raw transaction and returns its hash.
    async fn broadcast(&self, raw: Bytes) -> GatewayResult<TxHash>;

    /// Polls for the receipt of `tx_hash` for up to `timeout`. `Ok(None)`
    /// means the transaction was still pending when the timeout elapsed.
    async fn wait_for_inclusion(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> GatewayResult<Option<TransactionReceipt>>;
}

/// Production client over an `ethers` HTTP provider.
pub struct JsonRpcLedgerClient<P = Http> {
    provider: Provider<P>,
}

impl JsonRpcLedgerClient<Http> {
    pub fn new(provider_url: &str) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(provider_url)?;
        Ok(Self { provider })
    }
}

impl<P: JsonRpcClient> JsonRpcLedgerClient<P> {
    pub fn from_provider(provider: Provider<P>) -> Self {
        Self { provider }
    }
}

/// Pulls the revert reason out of a provider error, if the node reported
/// one. Geth-style nodes wrap it as `execution reverted: <reason>` inside a
/// JSON-RPC error response.
fn revert_reason(error: &ethers::providers::ProviderError) -> Option<String> {
    use ethers::providers::RpcError;
    let json_rpc_error = error.as_error_response()?;
    let message = &json_rpc_error.message;
    let reason = message
        .strip_prefix("execution reverted: ")
        .or_else(|| message.strip_prefix("execution reverted"))?;
    Some(reason.trim_start_matches(": ").to_string())
}

#[async_trait]
impl<P> LedgerClient for JsonRpcLedgerClient<P>
where
    P: JsonRpcClient + 'static,
{
    async fn call_at(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
        block: Option<u64>,
    ) -> GatewayResult<CallOutcome> {
        let request: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(to)
            .data(calldata)
            .into();
        let block_id = block.map(|n| BlockId::Number(BlockNumber::Number(n.into())));
        match self.provider.call(&request, block_id).await {
            Ok(output) => Ok(CallOutcome::Success(output)),
            Err(error) => match revert_reason(&error) {
                Some(reason) => {
                    debug!(%to, reason, "call reverted");
                    Ok(CallOutcome::Revert(reason))
                }
                None => Err(GatewayError::Transport(error.to_string())),
            },
        }
    }

    async fn pending_nonce(&self, address: Address) -> GatewayResult<U256> {
        self.provider
            .get_transaction_count(address, Some(BlockId::Number(BlockNumber::Pending)))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn broadcast(&self, raw: Bytes) -> GatewayResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_inclusion(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> GatewayResult<Option<TransactionReceipt>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            if let Some(receipt) = receipt {
                return Ok(Some(receipt));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
