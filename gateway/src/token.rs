// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed access to the bond and share token contracts.
//!
//! Attribute reads fan out into one contract call per field and go through
//! the [`StateCache`]; a getter that reverts or returns undecodable data
//! yields the field's default instead of failing the whole read, since old
//! contract versions are missing some getters. Attribute updates are one
//! setter transaction per changed field, followed by cache invalidation.

use std::sync::Arc;

use ethers::abi::{self, ParamType, Token};
use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::id;

use crate::error::{GatewayError, GatewayResult};
use crate::ledger_client::{CallOutcome, LedgerClient};
use crate::state_cache::StateCache;
use crate::tx_submitter::TransactionSubmitter;
use crate::types::{BondAttributes, CommonAttributes, ShareAttributes, TokenAttributes};

/// ABI-encodes a call to `signature` with `args`.
pub(crate) fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    Bytes::from(data)
}

pub struct TokenService {
    client: Arc<dyn LedgerClient>,
    submitter: Arc<TransactionSubmitter>,
    cache: Arc<StateCache>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondUpdateParams {
    pub face_value: Option<U256>,
    pub face_value_currency: Option<String>,
    pub interest_rate: Option<U256>,
    pub redemption_value: Option<U256>,
    pub transferable: Option<bool>,
    pub status: Option<bool>,
    pub is_offering: Option<bool>,
    pub tradable_exchange_contract_address: Option<Address>,
    pub personal_info_contract_address: Option<Address>,
    pub require_personal_info_registered: Option<bool>,
    pub contact_information: Option<String>,
    pub privacy_policy: Option<String>,
    pub transfer_approval_required: Option<bool>,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DividendInformation {
    pub dividends: U256,
    pub dividend_record_date: String,
    pub dividend_payment_date: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShareUpdateParams {
    pub cancellation_date: Option<String>,
    pub principal_value: Option<U256>,
    pub dividend_information: Option<DividendInformation>,
    pub transferable: Option<bool>,
    pub status: Option<bool>,
    pub is_offering: Option<bool>,
    pub tradable_exchange_contract_address: Option<Address>,
    pub personal_info_contract_address: Option<Address>,
    pub require_personal_info_registered: Option<bool>,
    pub contact_information: Option<String>,
    pub privacy_policy: Option<String>,
    pub transfer_approval_required: Option<bool>,
    pub memo: Option<String>,
}

impl BondUpdateParams {
    fn into_writes(mut self) -> Vec<Bytes> {
        let mut writes = Vec::new();
        if let Some(v) = self.face_value {
            writes.push(encode_call("setFaceValue(uint256)", &[Token::Uint(v)]));
        }
        if let Some(v) = self.face_value_currency.take() {
            writes.push(encode_call("setFaceValueCurrency(string)", &[Token::String(v)]));
        }
        if let Some(v) = self.interest_rate {
            writes.push(encode_call("setInterestRate(uint256)", &[Token::Uint(v)]));
        }
        if let Some(v) = self.redemption_value {
            writes.push(encode_call("setRedemptionValue(uint256)", &[Token::Uint(v)]));
        }
        self.shared_writes(&mut writes);
        writes
    }

    fn shared_writes(self, writes: &mut Vec<Bytes>) {
        push_common_writes(
            writes,
            self.transferable,
            self.status,
            self.is_offering,
            self.tradable_exchange_contract_address,
            self.personal_info_contract_address,
            self.require_personal_info_registered,
            self.contact_information,
            self.privacy_policy,
            self.transfer_approval_required,
            self.memo,
        );
    }
}

impl ShareUpdateParams {
    fn into_writes(self) -> Vec<Bytes> {
        let mut writes = Vec::new();
        if let Some(v) = self.cancellation_date {
            writes.push(encode_call("setCancellationDate(string)", &[Token::String(v)]));
        }
        if let Some(v) = self.principal_value {
            writes.push(encode_call("setPrincipalValue(uint256)", &[Token::Uint(v)]));
        }
        if let Some(v) = self.dividend_information {
            writes.push(encode_call(
                "setDividendInformation(uint256,string,string)",
                &[
                    Token::Uint(v.dividends),
                    Token::String(v.dividend_record_date),
                    Token::String(v.dividend_payment_date),
                ],
            ));
        }
        push_common_writes(
            &mut writes,
            self.transferable,
            self.status,
            self.is_offering,
            self.tradable_exchange_contract_address,
            self.personal_info_contract_address,
            self.require_personal_info_registered,
            self.contact_information,
            self.privacy_policy,
            self.transfer_approval_required,
            self.memo,
        );
        writes
    }
}

#[allow(clippy::too_many_arguments)]
fn push_common_writes(
    writes: &mut Vec<Bytes>,
    transferable: Option<bool>,
    status: Option<bool>,
    is_offering: Option<bool>,
    tradable_exchange: Option<Address>,
    personal_info: Option<Address>,
    require_personal_info_registered: Option<bool>,
    contact_information: Option<String>,
    privacy_policy: Option<String>,
    transfer_approval_required: Option<bool>,
    memo: Option<String>,
) {
    if let Some(v) = transferable {
        writes.push(encode_call("setTransferable(bool)", &[Token::Bool(v)]));
    }
    if let Some(v) = status {
        writes.push(encode_call("setStatus(bool)", &[Token::Bool(v)]));
    }
    if let Some(v) = is_offering {
        writes.push(encode_call("changeOfferingStatus(bool)", &[Token::Bool(v)]));
    }
    if let Some(v) = tradable_exchange {
        writes.push(encode_call("setTradableExchange(address)", &[Token::Address(v)]));
    }
    if let Some(v) = personal_info {
        writes.push(encode_call("setPersonalInfoAddress(address)", &[Token::Address(v)]));
    }
    if let Some(v) = require_personal_info_registered {
        writes.push(encode_call(
            "setRequirePersonalInfoRegistered(bool)",
            &[Token::Bool(v)],
        ));
    }
    if let Some(v) = contact_information {
        writes.push(encode_call("setContactInformation(string)", &[Token::String(v)]));
    }
    if let Some(v) = privacy_policy {
        writes.push(encode_call("setPrivacyPolicy(string)", &[Token::String(v)]));
    }
    if let Some(v) = transfer_approval_required {
        writes.push(encode_call(
            "setTransferApprovalRequired(bool)",
            &[Token::Bool(v)],
        ));
    }
    if let Some(v) = memo {
        writes.push(encode_call("setMemo(string)", &[Token::String(v)]));
    }
}

impl TokenService {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        submitter: Arc<TransactionSubmitter>,
        cache: Arc<StateCache>,
    ) -> Self {
        Self {
            client,
            submitter,
            cache,
        }
    }

    pub async fn bond_attributes(&self, token: Address) -> GatewayResult<BondAttributes> {
        let attributes = self
            .cache
            .read_through(token, || async {
                let reader = AttributeReader {
                    client: &*self.client,
                    token,
                };
                Ok(TokenAttributes::Bond(reader.read_bond().await?))
            })
            .await?;
        match attributes {
            TokenAttributes::Bond(bond) => Ok(bond),
            TokenAttributes::Share(_) => Err(GatewayError::Generic(format!(
                "token {token:#x} is cached as a share token"
            ))),
        }
    }

    pub async fn share_attributes(&self, token: Address) -> GatewayResult<ShareAttributes> {
        let attributes = self
            .cache
            .read_through(token, || async {
                let reader = AttributeReader {
                    client: &*self.client,
                    token,
                };
                Ok(TokenAttributes::Share(reader.read_share().await?))
            })
            .await?;
        match attributes {
            TokenAttributes::Share(share) => Ok(share),
            TokenAttributes::Bond(_) => Err(GatewayError::Generic(format!(
                "token {token:#x} is cached as a bond token"
            ))),
        }
    }

    pub async fn update_bond(
        &self,
        wallet: &LocalWallet,
        token: Address,
        params: BondUpdateParams,
    ) -> GatewayResult<()> {
        self.apply_writes(wallet, token, params.into_writes()).await
    }

    pub async fn update_share(
        &self,
        wallet: &LocalWallet,
        token: Address,
        params: ShareUpdateParams,
    ) -> GatewayResult<()> {
        self.apply_writes(wallet, token, params.into_writes()).await
    }

    /// One transaction per changed field. The snapshot is invalidated as
    /// soon as at least one write landed, including when a later write in
    /// the same batch fails.
    async fn apply_writes(
        &self,
        wallet: &LocalWallet,
        token: Address,
        writes: Vec<Bytes>,
    ) -> GatewayResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut wrote = false;
        for calldata in writes {
            match self.submitter.submit(wallet, token, calldata).await {
                Ok(_) => wrote = true,
                Err(error) => {
                    if wrote {
                        self.cache.invalidate(token).await?;
                    }
                    return Err(error);
                }
            }
        }
        self.cache.invalidate(token).await
    }
}

/// Field-by-field contract reader.
struct AttributeReader<'a> {
    client: &'a dyn LedgerClient,
    token: Address,
}

impl AttributeReader<'_> {
    async fn call_tokens(
        &self,
        signature: &str,
        outputs: &[ParamType],
    ) -> GatewayResult<Option<Vec<Token>>> {
        let calldata = Bytes::from(id(signature).to_vec());
        match self
            .client
            .call(Address::zero(), self.token, calldata)
            .await?
        {
            CallOutcome::Revert(_) => Ok(None),
            CallOutcome::Success(output) => Ok(abi::decode(outputs, &output).ok()),
        }
    }

    async fn call_string(&self, signature: &str) -> GatewayResult<String> {
        Ok(self
            .call_tokens(signature, &[ParamType::String])
            .await?
            .and_then(|mut tokens| tokens.pop()?.into_string())
            .unwrap_or_default())
    }

    async fn call_uint(&self, signature: &str) -> GatewayResult<U256> {
        Ok(self
            .call_tokens(signature, &[ParamType::Uint(256)])
            .await?
            .and_then(|mut tokens| tokens.pop()?.into_uint())
            .unwrap_or_default())
    }

    async fn call_address(&self, signature: &str) -> GatewayResult<Address> {
        Ok(self
            .call_tokens(signature, &[ParamType::Address])
            .await?
            .and_then(|mut tokens| tokens.pop()?.into_address())
            .unwrap_or_default())
    }

    async fn call_bool(&self, signature: &str, default: bool) -> GatewayResult<bool> {
        Ok(self
            .call_tokens(signature, &[ParamType::Bool])
            .await?
            .and_then(|mut tokens| tokens.pop()?.into_bool())
            .unwrap_or(default))
    }

    async fn read_common(&self) -> GatewayResult<CommonAttributes> {
        Ok(CommonAttributes {
            issuer_address: self.call_address("owner()").await?,
            name: self.call_string("name()").await?,
            symbol: self.call_string("symbol()").await?,
            total_supply: self.call_uint("totalSupply()").await?,
            tradable_exchange_contract_address: self.call_address("tradableExchange()").await?,
            personal_info_contract_address: self.call_address("personalInfoAddress()").await?,
            require_personal_info_registered: self
                .call_bool("requirePersonalInfoRegistered()", true)
                .await?,
            contact_information: self.call_string("contactInformation()").await?,
            privacy_policy: self.call_string("privacyPolicy()").await?,
            status: self.call_bool("status()", true).await?,
            transferable: self.call_bool("transferable()", false).await?,
            is_offering: self.call_bool("isOffering()", false).await?,
            transfer_approval_required: self
                .call_bool("transferApprovalRequired()", false)
                .await?,
        })
    }

    async fn read_bond(&self) -> GatewayResult<BondAttributes> {
        Ok(BondAttributes {
            common: self.read_common().await?,
            face_value: self.call_uint("faceValue()").await?,
            face_value_currency: self.call_string("faceValueCurrency()").await?,
            interest_rate: self.call_uint("interestRate()").await?,
            redemption_date: self.call_string("redemptionDate()").await?,
            redemption_value: self.call_uint("redemptionValue()").await?,
            purpose: self.call_string("purpose()").await?,
            memo: self.call_string("memo()").await?,
            is_redeemed: self.call_bool("isRedeemed()", false).await?,
        })
    }

    async fn read_share(&self) -> GatewayResult<ShareAttributes> {
        let dividend_information = self
            .call_tokens(
                "dividendInformation()",
                &[ParamType::Uint(256), ParamType::String, ParamType::String],
            )
            .await?;
        let (dividends, record_date, payment_date) = match dividend_information {
            Some(tokens) if tokens.len() == 3 => {
                let mut iter = tokens.into_iter();
                (
                    iter.next().and_then(Token::into_uint).unwrap_or_default(),
                    iter.next().and_then(Token::into_string).unwrap_or_default(),
                    iter.next().and_then(Token::into_string).unwrap_or_default(),
                )
            }
            _ => (U256::zero(), String::new(), String::new()),
        };
        Ok(ShareAttributes {
            common: self.read_common().await?,
            issue_price: self.call_uint("issuePrice()").await?,
            principal_value: self.call_uint("principalValue()").await?,
            dividends,
            dividend_record_date: record_date,
            dividend_payment_date: payment_date,
            cancellation_date: self.call_string("cancellationDate()").await?,
            memo: self.call_string("memo()").await?,
            is_canceled: self.call_bool("isCanceled()", false).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LedgerConfig, SenderLockConfig, TokenCacheConfig};
    use crate::memory_store::MemoryStore;
    use crate::metrics::GatewayMetrics;
    use crate::mock_ledger_client::MockLedgerClient;
    use crate::tx_serializer::TransactionSerializer;
    use rand::thread_rng;

    fn token() -> Address {
        Address::repeat_byte(0x42)
    }

    fn service(client: Arc<MockLedgerClient>, store: Arc<MemoryStore>) -> TokenService {
        let metrics = Arc::new(GatewayMetrics::new_for_testing());
        let serializer = TransactionSerializer::new(
            store.clone(),
            SenderLockConfig {
                retry_count: 2,
                retry_delay_ms: 1,
                lease_secs: 30,
            },
            metrics.clone(),
        );
        let submitter = Arc::new(TransactionSubmitter::new(
            client.clone(),
            serializer,
            LedgerConfig {
                ledger_rpc_url: "http://localhost:8545".to_string(),
                chain_id: 2017,
                tx_gas_limit: 6_000_000,
                inclusion_timeout_secs: 10,
            },
            metrics.clone(),
        ));
        let cache = Arc::new(StateCache::new(
            store,
            TokenCacheConfig {
                enabled: true,
                ttl_secs: 3_600,
                ttl_jitter_secs: 0,
            },
            metrics,
        ));
        TokenService::new(client, submitter, cache)
    }

    fn script_string(client: &MockLedgerClient, signature: &str, value: &str) {
        client.set_call_return(
            id(signature).to_vec(),
            Bytes::from(abi::encode(&[Token::String(value.to_string())])),
        );
    }

    fn script_uint(client: &MockLedgerClient, signature: &str, value: u64) {
        client.set_call_return(
            id(signature).to_vec(),
            Bytes::from(abi::encode(&[Token::Uint(U256::from(value))])),
        );
    }

    fn script_bool(client: &MockLedgerClient, signature: &str, value: bool) {
        client.set_call_return(
            id(signature).to_vec(),
            Bytes::from(abi::encode(&[Token::Bool(value)])),
        );
    }

    #[tokio::test]
    async fn test_bond_read_uses_defaults_for_missing_getters() {
        let client = Arc::new(MockLedgerClient::new());
        script_string(&client, "name()", "Test Bond");
        script_uint(&client, "faceValue()", 100);
        script_bool(&client, "transferable()", true);

        let service = service(client, Arc::new(MemoryStore::new()));
        let bond = service.bond_attributes(token()).await.unwrap();

        assert_eq!(bond.common.name, "Test Bond");
        assert_eq!(bond.face_value, U256::from(100u64));
        assert!(bond.common.transferable);
        // Unscripted getters fall back to defaults.
        assert_eq!(bond.common.symbol, "");
        assert_eq!(bond.common.total_supply, U256::zero());
        assert!(bond.common.status);
        assert!(!bond.is_redeemed);
    }

    #[tokio::test]
    async fn test_share_read_decodes_dividend_tuple() {
        let client = Arc::new(MockLedgerClient::new());
        client.set_call_return(
            id("dividendInformation()").to_vec(),
            Bytes::from(abi::encode(&[
                Token::Uint(U256::from(50u64)),
                Token::String("20260331".to_string()),
                Token::String("20260410".to_string()),
            ])),
        );

        let service = service(client, Arc::new(MemoryStore::new()));
        let share = service.share_attributes(token()).await.unwrap();

        assert_eq!(share.dividends, U256::from(50u64));
        assert_eq!(share.dividend_record_date, "20260331");
        assert_eq!(share.dividend_payment_date, "20260410");
    }

    #[tokio::test]
    async fn test_second_read_served_from_cache() {
        let client = Arc::new(MockLedgerClient::new());
        script_string(&client, "name()", "Before");

        let service = service(client.clone(), Arc::new(MemoryStore::new()));
        let first = service.bond_attributes(token()).await.unwrap();

        // The contract answer changes, but the snapshot is still fresh.
        script_string(&client, "name()", "After");
        let second = service.bond_attributes(token()).await.unwrap();

        assert_eq!(first.common.name, "Before");
        assert_eq!(second.common.name, "Before");
    }

    #[tokio::test]
    async fn test_update_submits_one_tx_per_field_and_invalidates() {
        let client = Arc::new(MockLedgerClient::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(client.clone(), store.clone());
        let wallet = LocalWallet::new(&mut thread_rng());

        // Prime the cache, then write.
        service.bond_attributes(token()).await.unwrap();
        assert!(store.has_snapshot(token()));

        service
            .update_bond(
                &wallet,
                token(),
                BondUpdateParams {
                    face_value: Some(U256::from(200u64)),
                    memo: Some("updated".to_string()),
                    ..BondUpdateParams::default()
                },
            )
            .await
            .unwrap();

        let broadcasts = client.broadcasts();
        assert_eq!(broadcasts.len(), 2);
        assert_eq!(&broadcasts[0].calldata[..4], id("setFaceValue(uint256)").as_slice());
        assert_eq!(&broadcasts[1].calldata[..4], id("setMemo(string)").as_slice());
        assert!(!store.has_snapshot(token()));

        // The next read must reload from the contract.
        script_string(&client, "name()", "Reloaded");
        let bond = service.bond_attributes(token()).await.unwrap();
        assert_eq!(bond.common.name, "Reloaded");
    }

    #[tokio::test]
    async fn test_empty_update_is_a_no_op() {
        let client = Arc::new(MockLedgerClient::new());
        let store = Arc::new(MemoryStore::new());
        let service = service(client.clone(), store.clone());
        let wallet = LocalWallet::new(&mut thread_rng());

        service.bond_attributes(token()).await.unwrap();
        service
            .update_bond(&wallet, token(), BondUpdateParams::default())
            .await
            .unwrap();

        assert!(client.broadcasts().is_empty());
        // Nothing was written, so the snapshot stays valid.
        assert!(store.has_snapshot(token()));
    }

    #[tokio::test]
    async fn test_share_update_encodes_dividend_information() {
        let client = Arc::new(MockLedgerClient::new());
        let service = service(client.clone(), Arc::new(MemoryStore::new()));
        let wallet = LocalWallet::new(&mut thread_rng());

        service
            .update_share(
                &wallet,
                token(),
                ShareUpdateParams {
                    dividend_information: Some(DividendInformation {
                        dividends: U256::from(10u64),
                        dividend_record_date: "20261231".to_string(),
                        dividend_payment_date: "20270110".to_string(),
                    }),
                    ..ShareUpdateParams::default()
                },
            )
            .await
            .unwrap();

        let broadcasts = client.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(
            &broadcasts[0].calldata[..4],
            id("setDividendInformation(uint256,string,string)").as_slice()
        );
    }
}
