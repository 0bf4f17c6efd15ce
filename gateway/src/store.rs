// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Storage seams of the gateway core.
//!
//! Split by concern so each component only sees the tables it owns. The
//! Postgres implementation lives in [`pg_store`](crate::pg_store); tests run
//! against in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use ethers::types::Address;
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::types::{
    AgentAccount, AttributeSnapshot, DeliveryOperation, DeliveryRecord, TransferApprovalRecord,
};

/// Sender lease table. One row per sender address; a lease is free when no
/// row exists, the row's expiry has passed, or it was explicitly released.
#[async_trait]
pub trait SenderLockStore: Send + Sync {
    /// Attempts to claim the lease for `sender` as `holder`, valid for
    /// `lease`. Returns whether the claim succeeded. Must be atomic against
    /// concurrent claimers.
    async fn try_claim(
        &self,
        sender: Address,
        holder: Uuid,
        lease: Duration,
    ) -> GatewayResult<bool>;

    /// Releases the lease for `sender` if it is still held by `holder`. A
    /// no-op when the lease expired and was claimed by someone else.
    async fn release(&self, sender: Address, holder: Uuid) -> GatewayResult<()>;
}

/// Token attribute snapshots and the write markers that invalidate them.
#[async_trait]
pub trait TokenStateStore: Send + Sync {
    async fn snapshot(&self, token: Address) -> GatewayResult<Option<AttributeSnapshot>>;

    async fn put_snapshot(&self, snapshot: AttributeSnapshot) -> GatewayResult<()>;

    async fn delete_snapshot(&self, token: Address) -> GatewayResult<()>;

    /// Timestamp of the most recent attribute-mutating write recorded for
    /// `token`, across all gateway processes.
    async fn latest_attr_update(&self, token: Address) -> GatewayResult<Option<NaiveDateTime>>;

    async fn record_attr_update(&self, token: Address, at: NaiveDateTime) -> GatewayResult<()>;

    /// Write-side invalidation: record the update marker, then drop the
    /// snapshot. The marker goes first so a concurrent reader that re-caches
    /// a stale snapshot in between still sees it as invalid.
    async fn invalidate(&self, token: Address, at: NaiveDateTime) -> GatewayResult<()> {
        self.record_attr_update(token, at).await?;
        self.delete_snapshot(token).await
    }
}

/// Read access to indexer-populated transfer approval rows.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn transfer_approval(
        &self,
        token: Address,
        exchange: Address,
        application_id: u64,
    ) -> GatewayResult<Option<TransferApprovalRecord>>;

    async fn transfer_approvals_for_token(
        &self,
        token: Address,
    ) -> GatewayResult<Vec<TransferApprovalRecord>>;
}

/// DVP delivery rows, registered agent accounts and the operation audit.
#[async_trait]
pub trait DvpStore: Send + Sync {
    async fn delivery(
        &self,
        exchange: Address,
        delivery_id: u64,
    ) -> GatewayResult<Option<DeliveryRecord>>;

    async fn agent_account(&self, account: Address) -> GatewayResult<Option<AgentAccount>>;

    /// Records which operation was last requested on a delivery and by whom.
    async fn record_operation(
        &self,
        exchange: Address,
        delivery_id: u64,
        operation: DeliveryOperation,
        by: Address,
    ) -> GatewayResult<()>;
}
