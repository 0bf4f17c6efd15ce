// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory store used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use ethers::types::Address;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::store::{ApprovalStore, DvpStore, SenderLockStore, TokenStateStore};
use crate::types::{
    AgentAccount, AttributeSnapshot, DeliveryOperation, DeliveryRecord, TransferApprovalRecord,
};

#[derive(Default)]
pub struct MemoryStore {
    leases: Mutex<HashMap<Address, (Uuid, NaiveDateTime)>>,
    snapshots: Mutex<HashMap<Address, AttributeSnapshot>>,
    attr_updates: Mutex<HashMap<Address, Vec<NaiveDateTime>>>,
    approvals: Mutex<HashMap<(Address, Address, u64), TransferApprovalRecord>>,
    deliveries: Mutex<HashMap<(Address, u64), DeliveryRecord>>,
    agents: Mutex<Vec<Address>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expire_lease(&self, sender: Address) {
        let mut leases = self.leases.lock().unwrap();
        if let Some((_, locked_until)) = leases.get_mut(&sender) {
            *locked_until = Utc::now().naive_utc() - chrono::Duration::seconds(1);
        }
    }

    pub fn seed_approval(&self, record: TransferApprovalRecord) {
        let key = (
            record.token_address,
            record.exchange_address,
            record.application_id,
        );
        self.approvals.lock().unwrap().insert(key, record);
    }

    pub fn seed_delivery(&self, record: DeliveryRecord) {
        let key = (record.exchange_address, record.delivery_id);
        self.deliveries.lock().unwrap().insert(key, record);
    }

    pub fn seed_agent(&self, account: Address) {
        self.agents.lock().unwrap().push(account);
    }

    pub fn delivery_audit(
        &self,
        exchange: Address,
        delivery_id: u64,
    ) -> (Option<DeliveryOperation>, Option<Address>) {
        let deliveries = self.deliveries.lock().unwrap();
        let record = deliveries.get(&(exchange, delivery_id)).unwrap();
        (record.last_operation, record.last_operation_by)
    }

    pub fn has_snapshot(&self, token: Address) -> bool {
        self.snapshots.lock().unwrap().contains_key(&token)
    }
}

#[async_trait]
impl SenderLockStore for MemoryStore {
    async fn try_claim(
        &self,
        sender: Address,
        holder: Uuid,
        lease: Duration,
    ) -> GatewayResult<bool> {
        let now = Utc::now().naive_utc();
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| GatewayError::Storage(e.to_string()))?;
        let mut leases = self.leases.lock().unwrap();
        if let Some((_, locked_until)) = leases.get(&sender) {
            if *locked_until > now {
                return Ok(false);
            }
        }
        leases.insert(sender, (holder, now + lease));
        Ok(true)
    }

    async fn release(&self, sender: Address, holder: Uuid) -> GatewayResult<()> {
        let mut leases = self.leases.lock().unwrap();
        if let Some((current_holder, _)) = leases.get(&sender) {
            if *current_holder == holder {
                leases.remove(&sender);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStateStore for MemoryStore {
    async fn snapshot(&self, token: Address) -> GatewayResult<Option<AttributeSnapshot>> {
        Ok(self.snapshots.lock().unwrap().get(&token).cloned())
    }

    async fn put_snapshot(&self, snapshot: AttributeSnapshot) -> GatewayResult<()> {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.token_address, snapshot);
        Ok(())
    }

    async fn delete_snapshot(&self, token: Address) -> GatewayResult<()> {
        self.snapshots.lock().unwrap().remove(&token);
        Ok(())
    }

    async fn latest_attr_update(&self, token: Address) -> GatewayResult<Option<NaiveDateTime>> {
        Ok(self
            .attr_updates
            .lock()
            .unwrap()
            .get(&token)
            .and_then(|updates| updates.iter().max().copied()))
    }

    async fn record_attr_update(&self, token: Address, at: NaiveDateTime) -> GatewayResult<()> {
        self.attr_updates
            .lock()
            .unwrap()
            .entry(token)
            .or_default()
            .push(at);
        Ok(())
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn transfer_approval(
        &self,
        token: Address,
        exchange: Address,
        application_id: u64,
    ) -> GatewayResult<Option<TransferApprovalRecord>> {
        Ok(self
            .approvals
            .lock()
            .unwrap()
            .get(&(token, exchange, application_id))
            .cloned())
    }

    async fn transfer_approvals_for_token(
        &self,
        token: Address,
    ) -> GatewayResult<Vec<TransferApprovalRecord>> {
        let approvals = self.approvals.lock().unwrap();
        let mut records: Vec<_> = approvals
            .values()
            .filter(|record| record.token_address == token)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.application_id);
        Ok(records)
    }
}

#[async_trait]
impl DvpStore for MemoryStore {
    async fn delivery(
        &self,
        exchange: Address,
        delivery_id: u64,
    ) -> GatewayResult<Option<DeliveryRecord>> {
        Ok(self
            .deliveries
            .lock()
            .unwrap()
            .get(&(exchange, delivery_id))
            .cloned())
    }

    async fn agent_account(&self, account: Address) -> GatewayResult<Option<AgentAccount>> {
        Ok(self
            .agents
            .lock()
            .unwrap()
            .iter()
            .find(|a| **a == account)
            .map(|a| AgentAccount { account_address: *a }))
    }

    async fn record_operation(
        &self,
        exchange: Address,
        delivery_id: u64,
        operation: DeliveryOperation,
        by: Address,
    ) -> GatewayResult<()> {
        let mut deliveries = self.deliveries.lock().unwrap();
        let record = deliveries
            .get_mut(&(exchange, delivery_id))
            .ok_or_else(|| GatewayError::NotFound("delivery".to_string()))?;
        record.last_operation = Some(operation);
        record.last_operation_by = Some(by);
        Ok(())
    }
}
