//! Tier contract entities and the polymorphic tier reference.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::StateConfig;

/// Which concrete entity a tier reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierKind {
    CombineTier,
    VerifyTier,
    Unknown,
}

/// Tagged reference to a tier contract. Consumers dispatch on `kind` to load
/// the concrete entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRef {
    pub kind: TierKind,
    pub id: String,
}

/// A CombineTier contract, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombineTier {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    pub factory: String,
    pub combined_tiers_length: Option<U256>,
    pub state: Option<StateConfig>,
    pub notices: Vec<String>,
}

impl CombineTier {
    pub fn new(address: &str, block: u64, timestamp: u64, deployer: &str, factory: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            deployer: deployer.to_string(),
            factory: factory.to_string(),
            combined_tiers_length: None,
            state: None,
            notices: Vec::new(),
        }
    }
}

impl_entity!(CombineTier, CombineTier);

/// A VerifyTier contract, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTier {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    pub factory: String,
    /// The verify contract this tier reads, set at Initialize.
    pub verify_contract: Option<String>,
    pub notices: Vec<String>,
}

impl VerifyTier {
    pub fn new(address: &str, block: u64, timestamp: u64, deployer: &str, factory: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            deployer: deployer.to_string(),
            factory: factory.to_string(),
            verify_contract: None,
            notices: Vec::new(),
        }
    }
}

impl_entity!(VerifyTier, VerifyTier);

/// Placeholder for a tier address deployed outside the tracked factories,
/// keyed by address. Created lazily the first time something references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownTier {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    pub notices: Vec<String>,
}

impl UnknownTier {
    pub fn new(address: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            deploy_block: 0,
            deploy_timestamp: 0,
            deployer: crate::ZERO_ADDRESS.to_string(),
            notices: Vec::new(),
        }
    }
}

impl_entity!(UnknownTier, UnknownTier);
