// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Row structs for the gateway tables.
//!
//! These stay deliberately close to the on-disk shape (addresses as hex text,
//! UTC-naive timestamps); mapping into domain types happens in the gateway
//! crate's store implementations.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use token_gateway_schema::schema::{dvp_agent_accounts, token_attr_updates, token_caches};

/// Full attribute snapshot for one token contract, upserted on every refresh.
#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = token_caches)]
pub struct TokenCacheRow {
    pub token_address: String,
    pub attributes: serde_json::Value,
    pub cached_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = token_attr_updates)]
pub struct NewTokenAttrUpdate {
    pub token_address: String,
    pub updated_at: NaiveDateTime,
}

/// Raw transfer-approval event row, written exclusively by the indexer.
/// The three flags are tri-state: the indexer leaves them NULL until the
/// corresponding event is observed.
#[derive(Debug, Clone, Queryable)]
pub struct TransferApprovalRow {
    pub id: i64,
    pub token_address: String,
    pub exchange_address: String,
    pub application_id: i64,
    pub from_address: String,
    pub to_address: String,
    pub amount: i64,
    pub application_datetime: NaiveDateTime,
    pub approval_datetime: Option<NaiveDateTime>,
    pub cancellation_blocktimestamp: Option<NaiveDateTime>,
    pub cancelled: Option<bool>,
    pub escrow_finished: Option<bool>,
    pub transfer_approved: Option<bool>,
}

/// Raw DVP delivery row, indexer-written, plus the gateway's operation audit
/// columns (`last_operation`, `last_operation_by`).
#[derive(Debug, Clone, Queryable)]
pub struct DeliveryRow {
    pub id: i64,
    pub exchange_address: String,
    pub delivery_id: i64,
    pub token_address: String,
    pub buyer_address: String,
    pub seller_address: String,
    pub agent_address: String,
    pub amount: i64,
    pub confirmed: bool,
    pub valid: bool,
    pub status: i32,
    pub last_operation: Option<String>,
    pub last_operation_by: Option<String>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = dvp_agent_accounts)]
pub struct AgentAccountRow {
    pub account_address: String,
}
