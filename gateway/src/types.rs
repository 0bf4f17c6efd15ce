// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Domain types shared across the gateway core.
//!
//! Addresses and hashes reuse the `ethers` primitives directly. Records that
//! mirror indexer-written rows keep the tri-state `Option<bool>` flags of
//! the raw tables: the indexer leaves a flag NULL until the corresponding
//! event has been observed, and once `cancelled` or `transfer_approved` is
//! set it is never unset.

use chrono::NaiveDateTime;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Raw transfer-approval row for one (token, application id) tuple.
///
/// Written exclusively by the out-of-process indexer; the gateway only
/// derives lifecycle status from it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferApprovalRecord {
    pub token_address: Address,
    /// Zero address marks a direct transfer; anything else is the escrow
    /// contract mediating the transfer.
    pub exchange_address: Address,
    pub application_id: u64,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: u64,
    pub application_datetime: NaiveDateTime,
    pub approval_datetime: Option<NaiveDateTime>,
    pub cancellation_blocktimestamp: Option<NaiveDateTime>,
    pub cancelled: Option<bool>,
    pub escrow_finished: Option<bool>,
    pub transfer_approved: Option<bool>,
}

/// Raw DVP delivery row for one (exchange, delivery id) tuple, plus the
/// gateway's audit of which operation was last requested and by whom.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub exchange_address: Address,
    pub delivery_id: u64,
    pub token_address: Address,
    pub buyer_address: Address,
    pub seller_address: Address,
    pub agent_address: Address,
    pub amount: u64,
    pub confirmed: bool,
    pub valid: bool,
    /// Raw on-chain delivery state as indexed; see
    /// [`derive_delivery_status`](crate::dvp::derive_delivery_status).
    pub status: i32,
    pub last_operation: Option<DeliveryOperation>,
    pub last_operation_by: Option<Address>,
}

/// Caller-initiated DVP operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOperation {
    Cancel,
    Finish,
    Abort,
}

impl DeliveryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOperation::Cancel => "Cancel",
            DeliveryOperation::Finish => "Finish",
            DeliveryOperation::Abort => "Abort",
        }
    }

    pub fn parse(s: &str) -> GatewayResult<Self> {
        match s {
            "Cancel" => Ok(DeliveryOperation::Cancel),
            "Finish" => Ok(DeliveryOperation::Finish),
            "Abort" => Ok(DeliveryOperation::Abort),
            other => Err(GatewayError::Generic(format!(
                "unknown delivery operation: {}",
                other
            ))),
        }
    }
}

/// Registered settlement agent account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAccount {
    pub account_address: Address,
}

/// A full attribute snapshot for one token contract, as stored in the cache
/// table. Valid iff `now < expires_at` and no attribute update record for the
/// address is newer than `cached_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSnapshot {
    pub token_address: Address,
    pub attributes: TokenAttributes,
    pub cached_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

/// Closed set of token kinds the gateway manages, each with an explicit,
/// typed snapshot instead of dynamic field injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TokenAttributes {
    Bond(BondAttributes),
    Share(ShareAttributes),
}

impl TokenAttributes {
    pub fn common(&self) -> &CommonAttributes {
        match self {
            TokenAttributes::Bond(bond) => &bond.common,
            TokenAttributes::Share(share) => &share.common,
        }
    }
}

/// Fields shared by every security token contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonAttributes {
    pub issuer_address: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: U256,
    pub tradable_exchange_contract_address: Address,
    pub personal_info_contract_address: Address,
    pub require_personal_info_registered: bool,
    pub contact_information: String,
    pub privacy_policy: String,
    pub status: bool,
    pub transferable: bool,
    pub is_offering: bool,
    pub transfer_approval_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondAttributes {
    #[serde(flatten)]
    pub common: CommonAttributes,
    pub face_value: U256,
    pub face_value_currency: String,
    pub interest_rate: U256,
    pub redemption_date: String,
    pub redemption_value: U256,
    pub purpose: String,
    pub memo: String,
    pub is_redeemed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareAttributes {
    #[serde(flatten)]
    pub common: CommonAttributes,
    pub issue_price: U256,
    pub principal_value: U256,
    pub dividends: U256,
    pub dividend_record_date: String,
    pub dividend_payment_date: String,
    pub cancellation_date: String,
    pub memo: String,
    pub is_canceled: bool,
}
