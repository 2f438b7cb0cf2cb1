//! Deployment manifest.
//!
//! The static sources the engine starts from: one entry per deployed root
//! contract (factories, the notice board, the escrow, the order book).
//! Child contracts and external tokens are registered dynamically at
//! runtime via `SourceRegistrar`.

use serde::{Deserialize, Serialize};

use crate::entities::factory::FactoryKind;
use crate::error::StoreError;

/// Contract family of a static source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    SaleFactory,
    VerifyFactory,
    CombineTierFactory,
    VerifyTierFactory,
    EmissionsErc20Factory,
    StakeErc20Factory,
    GatedNftFactory,
    NoticeBoard,
    ClaimEscrow,
    OrderBook,
}

impl SourceKind {
    /// The factory entity kind this source deploys, if it is a factory.
    pub fn factory_kind(&self) -> Option<FactoryKind> {
        match self {
            Self::SaleFactory => Some(FactoryKind::Sale),
            Self::VerifyFactory => Some(FactoryKind::Verify),
            Self::CombineTierFactory => Some(FactoryKind::CombineTier),
            Self::VerifyTierFactory => Some(FactoryKind::VerifyTier),
            Self::EmissionsErc20Factory => Some(FactoryKind::EmissionsErc20),
            Self::StakeErc20Factory => Some(FactoryKind::StakeErc20),
            Self::GatedNftFactory => Some(FactoryKind::GatedNft),
            _ => None,
        }
    }
}

/// One static source entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub kind: SourceKind,
    pub address: String,
    #[serde(default)]
    pub start_block: u64,
}

/// The full deployment manifest, loaded from JSON at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub network: String,
    pub sources: Vec<SourceEntry>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
                kind: "Manifest",
                id: "manifest".to_string(),
                reason: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Addresses must be lowercase 0x-prefixed hex and unique.
    fn validate(&self) -> Result<(), StoreError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.sources {
            let a = &entry.address;
            let well_formed = a.len() == 42
                && a.starts_with("0x")
                && a[2..]
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
            if !well_formed {
                return Err(StoreError::Corrupt {
                    kind: "Manifest",
                    id: a.clone(),
                    reason: "address must be lowercase 0x-prefixed hex".to_string(),
                });
            }
            if !seen.insert(a.clone()) {
                return Err(StoreError::Corrupt {
                    kind: "Manifest",
                    id: a.clone(),
                    reason: "duplicate source address".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn source_for(&self, address: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.address == address)
    }
}
