//! The persisted entity model.
//!
//! Field names serialize in camelCase to match the graph-store schema the
//! query side consumes. Every entity created from a child-contract
//! deployment carries `address`, `deployBlock`, `deployTimestamp`,
//! `deployer` and a back-reference to its factory.
//!
//! List-valued relationships are owned by the parent entity: children hold a
//! back-reference id, the parent array is the authoritative membership list.

macro_rules! impl_entity {
    ($ty:ty, $kind:ident) => {
        impl crate::store::Entity for $ty {
            const KIND: crate::store::EntityKind = crate::store::EntityKind::$kind;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

pub mod emissions;
pub mod escrow;
pub mod factory;
pub mod gated_nft;
pub mod notice;
pub mod orderbook;
pub mod redeemable;
pub mod sale;
pub mod stake;
pub mod tier;
pub mod token;
pub mod verify;

pub use emissions::*;
pub use escrow::*;
pub use factory::*;
pub use gated_nft::*;
pub use notice::*;
pub use orderbook::*;
pub use redeemable::*;
pub use sale::*;
pub use stake::*;
pub use tier::*;
pub use token::*;
pub use verify::*;

use serde::{Deserialize, Serialize};

/// A VM interpreter state config (sources + constants) captured verbatim
/// from an Initialize event. Shared by Sale, CombineTier and Emissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConfig {
    /// Hex-encoded source bytecode chunks.
    pub sources: Vec<String>,
    pub constants: Vec<alloy_primitives::U256>,
}
