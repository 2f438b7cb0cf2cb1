//! Factory entities.
//!
//! Every tracked contract family is deployed through a factory. All factory
//! entities share the same shape; `kind` records which family the factory
//! mints.

use serde::{Deserialize, Serialize};

/// Which contract family a factory deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactoryKind {
    Sale,
    Verify,
    CombineTier,
    VerifyTier,
    EmissionsErc20,
    StakeErc20,
    GatedNft,
}

impl FactoryKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sale => "Sale",
            Self::Verify => "Verify",
            Self::CombineTier => "CombineTier",
            Self::VerifyTier => "VerifyTier",
            Self::EmissionsErc20 => "EmissionsErc20",
            Self::StakeErc20 => "StakeErc20",
            Self::GatedNft => "GatedNft",
        }
    }
}

/// A factory contract, keyed by its own address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factory {
    pub id: String,
    pub address: String,
    pub kind: FactoryKind,
    /// Implementation address announced by the factory at construction,
    /// unset until the Implementation event arrives.
    pub implementation: Option<String>,
    /// The RedeemableERC20 factory a Sale implementation constructs with.
    pub redeemable_erc20_factory: Option<String>,
    pub children: Vec<String>,
    pub children_count: u64,
}

impl Factory {
    pub fn new(address: &str, kind: FactoryKind) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            kind,
            implementation: None,
            redeemable_erc20_factory: None,
            children: Vec::new(),
            children_count: 0,
        }
    }

    /// Record a newly deployed child. Idempotent per child id.
    pub fn add_child(&mut self, child: &str) {
        if !self.children.iter().any(|c| c == child) {
            self.children.push(child.to_string());
            self.children_count = self.children.len() as u64;
        }
    }
}

impl_entity!(Factory, Factory);
