// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Delivery-versus-payment settlement workflow.
//!
//! Preconditions are checked against the indexed delivery row before any
//! transaction is built, so an unauthorized or out-of-order request fails
//! without consuming a nonce. The exchange contract re-checks everything;
//! these checks exist to give callers precise errors instead of a revert.

use std::sync::Arc;

use ethers::abi::Token;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionReceipt, U256};
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::store::DvpStore;
use crate::token::encode_call;
use crate::tx_submitter::TransactionSubmitter;
use crate::types::{DeliveryOperation, DeliveryRecord};

/// On-chain delivery lifecycle, as indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DeliveryStatus {
    Created = 0,
    Canceled = 1,
    Confirmed = 2,
    Finished = 3,
    Aborted = 4,
}

pub fn derive_delivery_status(raw: i32) -> GatewayResult<DeliveryStatus> {
    match raw {
        0 => Ok(DeliveryStatus::Created),
        1 => Ok(DeliveryStatus::Canceled),
        2 => Ok(DeliveryStatus::Confirmed),
        3 => Ok(DeliveryStatus::Finished),
        4 => Ok(DeliveryStatus::Aborted),
        other => Err(GatewayError::Generic(format!(
            "unknown delivery status: {}",
            other
        ))),
    }
}

pub struct DvpSettlement {
    store: Arc<dyn DvpStore>,
    submitter: Arc<TransactionSubmitter>,
}

impl DvpSettlement {
    pub fn new(store: Arc<dyn DvpStore>, submitter: Arc<TransactionSubmitter>) -> Self {
        Self { store, submitter }
    }

    /// Cancels a pending delivery. Only the seller that created it may
    /// cancel, and only before the delivery is finished or aborted.
    pub async fn cancel_delivery(
        &self,
        wallet: &LocalWallet,
        exchange: Address,
        delivery_id: u64,
    ) -> GatewayResult<TransactionReceipt> {
        let requester = wallet.address();
        let delivery = self.delivery(exchange, delivery_id).await?;
        if requester != delivery.seller_address {
            return Err(GatewayError::Authorization(
                "only the delivery seller may cancel".to_string(),
            ));
        }
        self.require_open(&delivery)?;
        self.execute(
            wallet,
            exchange,
            delivery_id,
            DeliveryOperation::Cancel,
            "cancelDelivery(uint256)",
        )
        .await
    }

    /// Finishes a confirmed delivery. Only the registered settlement agent
    /// named on the delivery may finish it.
    pub async fn finish_delivery(
        &self,
        wallet: &LocalWallet,
        exchange: Address,
        delivery_id: u64,
    ) -> GatewayResult<TransactionReceipt> {
        let delivery = self.authorize_agent(wallet, exchange, delivery_id).await?;
        if derive_delivery_status(delivery.status)? != DeliveryStatus::Confirmed
            || !delivery.valid
        {
            return Err(GatewayError::Authorization(
                "delivery is not in a finishable state".to_string(),
            ));
        }
        self.execute(
            wallet,
            exchange,
            delivery_id,
            DeliveryOperation::Finish,
            "finishDelivery(uint256)",
        )
        .await
    }

    /// Aborts a delivery that has not completed. Agent-only, like finish.
    pub async fn abort_delivery(
        &self,
        wallet: &LocalWallet,
        exchange: Address,
        delivery_id: u64,
    ) -> GatewayResult<TransactionReceipt> {
        let delivery = self.authorize_agent(wallet, exchange, delivery_id).await?;
        self.require_open(&delivery)?;
        self.execute(
            wallet,
            exchange,
            delivery_id,
            DeliveryOperation::Abort,
            "abortDelivery(uint256)",
        )
        .await
    }

    async fn delivery(&self, exchange: Address, delivery_id: u64) -> GatewayResult<DeliveryRecord> {
        self.store
            .delivery(exchange, delivery_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound("delivery".to_string()))
    }

    /// Agent operations need the requester to be a registered agent account
    /// and to be the agent named on the delivery, in that order: an
    /// unregistered account gets a not-found, a registered but wrong one an
    /// authorization error.
    async fn authorize_agent(
        &self,
        wallet: &LocalWallet,
        exchange: Address,
        delivery_id: u64,
    ) -> GatewayResult<DeliveryRecord> {
        let requester = wallet.address();
        if self.store.agent_account(requester).await?.is_none() {
            return Err(GatewayError::NotFound("agent account".to_string()));
        }
        let delivery = self.delivery(exchange, delivery_id).await?;
        if requester != delivery.agent_address {
            return Err(GatewayError::Authorization(
                "requester is not the delivery agent".to_string(),
            ));
        }
        Ok(delivery)
    }

    fn require_open(&self, delivery: &DeliveryRecord) -> GatewayResult<()> {
        let status = derive_delivery_status(delivery.status)?;
        let open = matches!(status, DeliveryStatus::Created | DeliveryStatus::Confirmed)
            && delivery.valid;
        if open {
            Ok(())
        } else {
            Err(GatewayError::Authorization(format!(
                "delivery is not open (status: {status:?})"
            )))
        }
    }

    async fn execute(
        &self,
        wallet: &LocalWallet,
        exchange: Address,
        delivery_id: u64,
        operation: DeliveryOperation,
        signature: &str,
    ) -> GatewayResult<TransactionReceipt> {
        let calldata = encode_call(signature, &[Token::Uint(U256::from(delivery_id))]);
        let receipt = self.submitter.submit(wallet, exchange, calldata).await?;
        self.store
            .record_operation(exchange, delivery_id, operation, wallet.address())
            .await?;
        info!(
            exchange = %format!("{exchange:#x}"),
            delivery_id,
            operation = operation.as_str(),
            "delivery operation executed"
        );
        Ok(receipt)
    }
}
