// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Postgres implementation of the store traits, over the shared pool in
//! `token-gateway-pg-db`.
//!
//! Addresses are stored as lowercase `0x`-prefixed text and timestamps as
//! UTC-naive, matching what the indexer writes.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::dsl::max;
use diesel::sql_types;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use ethers::types::Address;
use uuid::Uuid;

use token_gateway_pg_db::model::{
    AgentAccountRow, DeliveryRow, NewTokenAttrUpdate, TokenCacheRow, TransferApprovalRow,
};
use token_gateway_pg_db::{Connection, Db};
use token_gateway_schema::schema::{
    dvp_agent_accounts, dvp_deliveries, token_attr_updates, token_caches, transfer_approvals,
};

use crate::error::{GatewayError, GatewayResult};
use crate::store::{ApprovalStore, DvpStore, SenderLockStore, TokenStateStore};
use crate::types::{
    AgentAccount, AttributeSnapshot, DeliveryOperation, DeliveryRecord, TokenAttributes,
    TransferApprovalRecord,
};

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn connect(&self) -> GatewayResult<Connection<'_>> {
        self.db
            .connect()
            .await
            .map_err(|e| GatewayError::Storage(e.to_string()))
    }
}

fn storage_err(error: diesel::result::Error) -> GatewayError {
    GatewayError::Storage(error.to_string())
}

fn addr_hex(address: Address) -> String {
    format!("{address:#x}")
}

fn parse_address(raw: &str) -> GatewayResult<Address> {
    Address::from_str(raw)
        .map_err(|e| GatewayError::Storage(format!("malformed address {raw:?}: {e}")))
}

fn parse_amount(raw: i64) -> GatewayResult<u64> {
    u64::try_from(raw).map_err(|_| GatewayError::Storage(format!("negative amount: {raw}")))
}

// The write-side counterpart of `parse_amount`: domain ids are u64, the
// columns are bigint.
fn db_id(value: u64) -> GatewayResult<i64> {
    i64::try_from(value).map_err(|_| GatewayError::Storage(format!("id out of range: {value}")))
}

fn approval_from_row(row: TransferApprovalRow) -> GatewayResult<TransferApprovalRecord> {
    Ok(TransferApprovalRecord {
        token_address: parse_address(&row.token_address)?,
        exchange_address: parse_address(&row.exchange_address)?,
        application_id: parse_amount(row.application_id)?,
        from_address: parse_address(&row.from_address)?,
        to_address: parse_address(&row.to_address)?,
        amount: parse_amount(row.amount)?,
        application_datetime: row.application_datetime,
        approval_datetime: row.approval_datetime,
        cancellation_blocktimestamp: row.cancellation_blocktimestamp,
        cancelled: row.cancelled,
        escrow_finished: row.escrow_finished,
        transfer_approved: row.transfer_approved,
    })
}

fn delivery_from_row(row: DeliveryRow) -> GatewayResult<DeliveryRecord> {
    let last_operation = row
        .last_operation
        .as_deref()
        .map(DeliveryOperation::parse)
        .transpose()?;
    let last_operation_by = row
        .last_operation_by
        .as_deref()
        .map(parse_address)
        .transpose()?;
    Ok(DeliveryRecord {
        exchange_address: parse_address(&row.exchange_address)?,
        delivery_id: parse_amount(row.delivery_id)?,
        token_address: parse_address(&row.token_address)?,
        buyer_address: parse_address(&row.buyer_address)?,
        seller_address: parse_address(&row.seller_address)?,
        agent_address: parse_address(&row.agent_address)?,
        amount: parse_amount(row.amount)?,
        confirmed: row.confirmed,
        valid: row.valid,
        status: row.status,
        last_operation,
        last_operation_by,
    })
}

fn snapshot_from_row(row: TokenCacheRow) -> GatewayResult<AttributeSnapshot> {
    let attributes: TokenAttributes = serde_json::from_value(row.attributes)
        .map_err(|e| GatewayError::Storage(format!("malformed cached attributes: {e}")))?;
    Ok(AttributeSnapshot {
        token_address: parse_address(&row.token_address)?,
        attributes,
        cached_at: row.cached_at,
        expires_at: row.expires_at,
    })
}

#[async_trait]
impl SenderLockStore for PgStore {
    async fn try_claim(
        &self,
        sender: Address,
        holder: Uuid,
        lease: Duration,
    ) -> GatewayResult<bool> {
        let now = Utc::now().naive_utc();
        let locked_until = now
            + chrono::Duration::from_std(lease)
                .map_err(|e| GatewayError::Storage(e.to_string()))?;
        let mut conn = self.connect().await?;

        // Single atomic upsert: wins iff the row is absent, released, or its
        // lease has expired.
        let claimed = diesel::sql_query(
            "INSERT INTO sender_locks (sender_address, holder, locked_until) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (sender_address) DO UPDATE \
             SET holder = EXCLUDED.holder, locked_until = EXCLUDED.locked_until \
             WHERE sender_locks.holder IS NULL \
                OR sender_locks.locked_until IS NULL \
                OR sender_locks.locked_until < $4",
        )
        .bind::<sql_types::Text, _>(addr_hex(sender))
        .bind::<sql_types::Uuid, _>(holder)
        .bind::<sql_types::Timestamp, _>(locked_until)
        .bind::<sql_types::Timestamp, _>(now)
        .execute(&mut conn)
        .await
        .map_err(storage_err)?;

        Ok(claimed == 1)
    }

    async fn release(&self, sender: Address, holder: Uuid) -> GatewayResult<()> {
        use token_gateway_schema::schema::sender_locks::dsl;

        let mut conn = self.connect().await?;
        diesel::update(
            dsl::sender_locks
                .filter(dsl::sender_address.eq(addr_hex(sender)))
                .filter(dsl::holder.eq(Some(holder))),
        )
        .set((
            dsl::holder.eq(None::<Uuid>),
            dsl::locked_until.eq(None::<NaiveDateTime>),
        ))
        .execute(&mut conn)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl TokenStateStore for PgStore {
    async fn snapshot(&self, token: Address) -> GatewayResult<Option<AttributeSnapshot>> {
        let mut conn = self.connect().await?;
        let row: Option<TokenCacheRow> = token_caches::table
            .find(addr_hex(token))
            .first(&mut conn)
            .await
            .optional()
            .map_err(storage_err)?;
        row.map(snapshot_from_row).transpose()
    }

    async fn put_snapshot(&self, snapshot: AttributeSnapshot) -> GatewayResult<()> {
        let attributes = serde_json::to_value(&snapshot.attributes)
            .map_err(|e| GatewayError::Storage(e.to_string()))?;
        let row = TokenCacheRow {
            token_address: addr_hex(snapshot.token_address),
            attributes,
            cached_at: snapshot.cached_at,
            expires_at: snapshot.expires_at,
        };

        let mut conn = self.connect().await?;
        diesel::insert_into(token_caches::table)
            .values(&row)
            .on_conflict(token_caches::token_address)
            .do_update()
            .set((
                token_caches::attributes.eq(excluded(token_caches::attributes)),
                token_caches::cached_at.eq(excluded(token_caches::cached_at)),
                token_caches::expires_at.eq(excluded(token_caches::expires_at)),
            ))
            .execute(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_snapshot(&self, token: Address) -> GatewayResult<()> {
        let mut conn = self.connect().await?;
        diesel::delete(token_caches::table.find(addr_hex(token)))
            .execute(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn latest_attr_update(&self, token: Address) -> GatewayResult<Option<NaiveDateTime>> {
        let mut conn = self.connect().await?;
        token_attr_updates::table
            .filter(token_attr_updates::token_address.eq(addr_hex(token)))
            .select(max(token_attr_updates::updated_at))
            .first(&mut conn)
            .await
            .map_err(storage_err)
    }

    async fn record_attr_update(&self, token: Address, at: NaiveDateTime) -> GatewayResult<()> {
        let mut conn = self.connect().await?;
        diesel::insert_into(token_attr_updates::table)
            .values(&NewTokenAttrUpdate {
                token_address: addr_hex(token),
                updated_at: at,
            })
            .execute(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    // Marker insert and snapshot delete in one transaction so a reader never
    // observes the delete without the marker.
    async fn invalidate(&self, token: Address, at: NaiveDateTime) -> GatewayResult<()> {
        let token_hex = addr_hex(token);
        let mut conn = self.connect().await?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                diesel::insert_into(token_attr_updates::table)
                    .values(&NewTokenAttrUpdate {
                        token_address: token_hex.clone(),
                        updated_at: at,
                    })
                    .execute(conn)
                    .await?;
                diesel::delete(token_caches::table.find(&token_hex))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(storage_err)
    }
}

#[async_trait]
impl ApprovalStore for PgStore {
    async fn transfer_approval(
        &self,
        token: Address,
        exchange: Address,
        application_id: u64,
    ) -> GatewayResult<Option<TransferApprovalRecord>> {
        let mut conn = self.connect().await?;
        let row: Option<TransferApprovalRow> = transfer_approvals::table
            .filter(transfer_approvals::token_address.eq(addr_hex(token)))
            .filter(transfer_approvals::exchange_address.eq(addr_hex(exchange)))
            .filter(transfer_approvals::application_id.eq(db_id(application_id)?))
            .first(&mut conn)
            .await
            .optional()
            .map_err(storage_err)?;
        row.map(approval_from_row).transpose()
    }

    async fn transfer_approvals_for_token(
        &self,
        token: Address,
    ) -> GatewayResult<Vec<TransferApprovalRecord>> {
        let mut conn = self.connect().await?;
        let rows: Vec<TransferApprovalRow> = transfer_approvals::table
            .filter(transfer_approvals::token_address.eq(addr_hex(token)))
            .order(transfer_approvals::application_id.asc())
            .load(&mut conn)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(approval_from_row).collect()
    }
}

#[async_trait]
impl DvpStore for PgStore {
    async fn delivery(
        &self,
        exchange: Address,
        delivery_id: u64,
    ) -> GatewayResult<Option<DeliveryRecord>> {
        let mut conn = self.connect().await?;
        let row: Option<DeliveryRow> = dvp_deliveries::table
            .filter(dvp_deliveries::exchange_address.eq(addr_hex(exchange)))
            .filter(dvp_deliveries::delivery_id.eq(db_id(delivery_id)?))
            .first(&mut conn)
            .await
            .optional()
            .map_err(storage_err)?;
        row.map(delivery_from_row).transpose()
    }

    async fn agent_account(&self, account: Address) -> GatewayResult<Option<AgentAccount>> {
        let mut conn = self.connect().await?;
        let row: Option<AgentAccountRow> = dvp_agent_accounts::table
            .find(addr_hex(account))
            .first(&mut conn)
            .await
            .optional()
            .map_err(storage_err)?;
        match row {
            Some(row) => Ok(Some(AgentAccount {
                account_address: parse_address(&row.account_address)?,
            })),
            None => Ok(None),
        }
    }

    async fn record_operation(
        &self,
        exchange: Address,
        delivery_id: u64,
        operation: DeliveryOperation,
        by: Address,
    ) -> GatewayResult<()> {
        let mut conn = self.connect().await?;
        let updated = diesel::update(
            dvp_deliveries::table
                .filter(dvp_deliveries::exchange_address.eq(addr_hex(exchange)))
                .filter(dvp_deliveries::delivery_id.eq(db_id(delivery_id)?)),
        )
        .set((
            dvp_deliveries::last_operation.eq(operation.as_str()),
            dvp_deliveries::last_operation_by.eq(addr_hex(by)),
        ))
        .execute(&mut conn)
        .await
        .map_err(storage_err)?;
        if updated == 0 {
            return Err(GatewayError::NotFound("delivery".to_string()));
        }
        Ok(())
    }
}
