//! Plain ERC20 registry entities.
//!
//! Any external ERC20 touched by an escrow deposit, a treasury transfer or a
//! stake pool is registered here so its metadata can be queried alongside the
//! entities that reference it.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// An external ERC20 token, keyed by address.
///
/// Metadata reads that reverted at registration time leave the documented
/// defaults in place: `name`/`symbol` `"NONE"`, `decimals` 18, supply zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20 {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    /// Stake contracts whose deposit token this is.
    pub stake_contracts: Vec<String>,
}

impl Erc20 {
    pub fn new(address: &str, block: u64, timestamp: u64) -> Self {
        Self {
            id: address.to_string(),
            name: "NONE".to_string(),
            symbol: "NONE".to_string(),
            decimals: 18,
            total_supply: U256::ZERO,
            deploy_block: block,
            deploy_timestamp: timestamp,
            stake_contracts: Vec::new(),
        }
    }
}

impl_entity!(Erc20, Erc20);

/// A balance-holding account of a redeemable token, keyed
/// `tokenAddress - holderAddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    pub id: String,
    pub address: String,
    pub balance: U256,
}

impl_entity!(Holder, Holder);
