//! RedeemableERC20 entities: the sale token, its holders, treasury assets
//! and redemption records.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::tier::TierRef;

/// A redeemable token minted for a sale, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemableErc20 {
    pub id: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    /// Factory address, taken from the Initialize sender.
    pub factory: Option<String>,
    pub admin: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: U256,
    pub minimum_tier: Option<U256>,
    pub tier: Option<TierRef>,
    /// Sale this token belongs to; empty string until a sale claims it.
    pub sale_address: String,
    pub redeems: Vec<String>,
    pub treasury_assets: Vec<String>,
    pub holders: Vec<String>,
    pub granted_senders: Vec<String>,
    pub granted_receivers: Vec<String>,
    pub escrow_supply_token_withdrawers: Vec<String>,
}

impl RedeemableErc20 {
    pub fn new(address: &str, block: u64, timestamp: u64, deployer: &str) -> Self {
        Self {
            id: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            deployer: deployer.to_string(),
            factory: None,
            admin: None,
            name: None,
            symbol: None,
            decimals: None,
            total_supply: U256::ZERO,
            minimum_tier: None,
            tier: None,
            sale_address: String::new(),
            redeems: Vec::new(),
            treasury_assets: Vec::new(),
            holders: Vec::new(),
            granted_senders: Vec::new(),
            granted_receivers: Vec::new(),
            escrow_supply_token_withdrawers: Vec::new(),
        }
    }
}

impl_entity!(RedeemableErc20, RedeemableErc20);

/// One redemption, keyed `txHash - redeemCountForToken`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redeem {
    pub id: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub caller: String,
    pub redeemable: String,
    pub treasury_asset: String,
    pub treasury_asset_amount: U256,
    pub redeem_amount: U256,
    pub sale_address: String,
}

impl_entity!(Redeem, Redeem);

/// A treasury asset registered against a redeemable token, keyed
/// `redeemableAddress - assetAddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryAsset {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: U256,
    /// The redeemable contract's live balance of this asset.
    pub balance: U256,
    /// `balance / redeemable.totalSupply`, 18-decimal fixed point.
    pub redemption_ratio: U256,
    pub redeemable: String,
    pub sale_address: String,
    pub callers: Vec<String>,
    pub redeems: Vec<String>,
}

impl TreasuryAsset {
    pub fn new(id: &str, address: &str, redeemable: &str, block: u64, timestamp: u64) -> Self {
        Self {
            id: id.to_string(),
            address: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            name: None,
            symbol: None,
            decimals: None,
            total_supply: U256::ZERO,
            balance: U256::ZERO,
            redemption_ratio: U256::ZERO,
            redeemable: redeemable.to_string(),
            sale_address: String::new(),
            callers: Vec::new(),
            redeems: Vec::new(),
        }
    }
}

impl_entity!(TreasuryAsset, TreasuryAsset);

/// The caller who announced a treasury asset, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryAssetCaller {
    pub id: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub caller: String,
    pub redeemable_address: String,
    pub sale_address: String,
    pub treasury_asset: String,
}

impl_entity!(TreasuryAssetCaller, TreasuryAssetCaller);
