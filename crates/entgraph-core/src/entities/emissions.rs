//! Emissions token entities.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::StateConfig;

/// An emissions token contract, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsErc20 {
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
    pub allow_delegated_claims: Option<bool>,
    pub calculate_claim_state_config: Option<StateConfig>,
    pub claims: Vec<String>,
}

impl EmissionsErc20 {
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
            allow_delegated_claims: None,
            calculate_claim_state_config: None,
            claims: Vec::new(),
        }
    }
}

impl_entity!(EmissionsErc20, EmissionsErc20);

/// One claim against an emissions token, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsClaim {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub sender: String,
    pub claimant: String,
    /// Hex-encoded claim payload.
    pub data: String,
    /// Amount minted, read from the mint transfer in the same transaction.
    pub amount: U256,
    pub emissions: String,
}

impl_entity!(EmissionsClaim, EmissionsClaim);
