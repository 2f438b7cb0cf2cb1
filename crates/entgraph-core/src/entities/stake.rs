//! Stake pool entities.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// A stake pool contract, keyed by address.
///
/// The three ratio fields are recomputed from live balances on every deposit
/// and withdraw; both directions are carried so consumers never divide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeErc20 {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    pub factory: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: U256,
    pub initial_ratio: Option<U256>,
    /// The deposit token, set at Initialize.
    pub token: Option<String>,
    pub token_pool_size: U256,
    pub token_to_stake_token_ratio: U256,
    pub stake_token_to_token_ratio: U256,
}

impl StakeErc20 {
    pub fn new(address: &str, block: u64, timestamp: u64, deployer: &str, factory: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            deployer: deployer.to_string(),
            factory: factory.to_string(),
            name: None,
            symbol: None,
            decimals: None,
            total_supply: U256::ZERO,
            initial_ratio: None,
            token: None,
            token_pool_size: U256::ZERO,
            token_to_stake_token_ratio: U256::ZERO,
            stake_token_to_token_ratio: U256::ZERO,
        }
    }
}

impl_entity!(StakeErc20, StakeErc20);

/// Per-account position in a stake pool, keyed `stakeAddress-account`.
///
/// Lifetime totals only grow; they survive the balance going to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeHolder {
    pub id: String,
    pub address: String,
    pub token: String,
    pub stake_token: String,
    pub balance: U256,
    pub total_stake: U256,
    pub total_deposited: U256,
    /// Share of the pool this balance is entitled to,
    /// `balance * poolSize / totalSupply`.
    pub total_entitlement: U256,
}

impl StakeHolder {
    pub fn new(id: &str, address: &str, stake_token: &str, token: &str) -> Self {
        Self {
            id: id.to_string(),
            address: address.to_string(),
            token: token.to_string(),
            stake_token: stake_token.to_string(),
            balance: U256::ZERO,
            total_stake: U256::ZERO,
            total_deposited: U256::ZERO,
            total_entitlement: U256::ZERO,
        }
    }
}

impl_entity!(StakeHolder, StakeHolder);

/// One stake deposit, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeDeposit {
    pub id: String,
    pub timestamp: u64,
    pub depositor: String,
    pub stake_token: String,
    pub token: String,
    pub stake_token_minted: U256,
    pub token_pool_size: U256,
    pub value: U256,
    pub deposited_amount: U256,
}

impl_entity!(StakeDeposit, StakeDeposit);

/// One stake withdraw, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeWithdraw {
    pub id: String,
    pub timestamp: u64,
    pub withdrawer: String,
    pub stake_token: String,
    pub token: String,
    pub stake_token_burned: U256,
    pub token_pool_size: U256,
    pub value: U256,
    pub returned_amount: U256,
}

impl_entity!(StakeWithdraw, StakeWithdraw);
