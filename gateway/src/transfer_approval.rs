// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Transfer-approval lifecycle derivation.
//!
//! The indexer only writes raw event flags; the externally visible status
//! is derived here, on read, so it can never disagree with the row.

use std::sync::Arc;

use ethers::types::Address;

use crate::error::{GatewayError, GatewayResult};
use crate::store::ApprovalStore;
use crate::types::TransferApprovalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TransferApprovalStatus {
    Unapproved = 0,
    EscrowFinished = 1,
    Transferred = 2,
    Canceled = 3,
}

/// Precedence: a cancellation wins over everything, an executed transfer
/// wins over a merely finished escrow. Flags are tri-state; only an
/// explicit `Some(true)` counts as set.
pub fn derive_status(record: &TransferApprovalRecord) -> TransferApprovalStatus {
    if record.cancelled == Some(true) {
        TransferApprovalStatus::Canceled
    } else if record.transfer_approved == Some(true) {
        TransferApprovalStatus::Transferred
    } else if record.escrow_finished == Some(true) {
        TransferApprovalStatus::EscrowFinished
    } else {
        TransferApprovalStatus::Unapproved
    }
}

/// An issuer may cancel an application only while it is still pending
/// (unapproved, or escrow finished but not yet approved) and only for
/// direct transfers. Escrowed applications are canceled through the
/// escrow contract instead.
pub fn is_issuer_cancelable(record: &TransferApprovalRecord) -> bool {
    matches!(
        derive_status(record),
        TransferApprovalStatus::Unapproved | TransferApprovalStatus::EscrowFinished
    ) && record.exchange_address == Address::zero()
}

/// A raw row together with its derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferApprovalView {
    pub record: TransferApprovalRecord,
    pub status: TransferApprovalStatus,
    pub issuer_cancelable: bool,
}

impl From<TransferApprovalRecord> for TransferApprovalView {
    fn from(record: TransferApprovalRecord) -> Self {
        let status = derive_status(&record);
        let issuer_cancelable = is_issuer_cancelable(&record);
        Self {
            record,
            status,
            issuer_cancelable,
        }
    }
}

pub struct TransferApprovalService {
    store: Arc<dyn ApprovalStore>,
}

impl TransferApprovalService {
    pub fn new(store: Arc<dyn ApprovalStore>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        token: Address,
        exchange: Address,
        application_id: u64,
    ) -> GatewayResult<TransferApprovalView> {
        let record = self
            .store
            .transfer_approval(token, exchange, application_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound("transfer approval".to_string()))?;
        Ok(record.into())
    }

    pub async fn list_for_token(&self, token: Address) -> GatewayResult<Vec<TransferApprovalView>> {
        let records = self.store.transfer_approvals_for_token(token).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }
}
