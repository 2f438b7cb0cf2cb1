//! The entity-store boundary.
//!
//! The persistent graph store is an external collaborator; the engine only
//! relies on two operations: point lookup by `(kind, id)` and whole-entity
//! upsert. No transactions span multiple puts: every handler must leave the
//! store consistent after each individual `put`.
//!
//! Entities cross the boundary as JSON values. [`EntityStoreExt`] layers the
//! typed `load`/`save` API used throughout the projection modules.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Every persisted entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Factory,
    Erc20,
    Holder,
    Notice,
    UnknownNotice,
    Sale,
    SaleBuy,
    SaleRefund,
    SaleReceipt,
    SaleStart,
    SaleEnd,
    SaleFeeRecipient,
    UnknownSale,
    Verify,
    VerifyAddress,
    VerifyEventRecord,
    CombineTier,
    VerifyTier,
    UnknownTier,
    RedeemableErc20,
    Redeem,
    TreasuryAsset,
    TreasuryAssetCaller,
    StakeErc20,
    StakeHolder,
    StakeDeposit,
    StakeWithdraw,
    EmissionsErc20,
    EmissionsClaim,
    GatedNft,
    GatedToken,
    GatedTokenOwner,
    NftTransfer,
    OwnershipTransfer,
    RoyaltyRecipientUpdate,
    ClaimEscrow,
    EscrowDeposit,
    EscrowUndeposit,
    EscrowWithdraw,
    EscrowPendingDeposit,
    EscrowDepositor,
    EscrowWithdrawer,
    EscrowSupplyTokenDeposit,
    EscrowSupplyTokenDepositor,
    EscrowSupplyTokenWithdrawer,
    EscrowPendingDepositorToken,
    Order,
    Vault,
    TokenVault,
    VaultDeposit,
    VaultWithdraw,
    OrderClear,
    Bounty,
}

impl EntityKind {
    /// Stable name, used in store keys and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Factory => "Factory",
            Self::Erc20 => "Erc20",
            Self::Holder => "Holder",
            Self::Notice => "Notice",
            Self::UnknownNotice => "UnknownNotice",
            Self::Sale => "Sale",
            Self::SaleBuy => "SaleBuy",
            Self::SaleRefund => "SaleRefund",
            Self::SaleReceipt => "SaleReceipt",
            Self::SaleStart => "SaleStart",
            Self::SaleEnd => "SaleEnd",
            Self::SaleFeeRecipient => "SaleFeeRecipient",
            Self::UnknownSale => "UnknownSale",
            Self::Verify => "Verify",
            Self::VerifyAddress => "VerifyAddress",
            Self::VerifyEventRecord => "VerifyEventRecord",
            Self::CombineTier => "CombineTier",
            Self::VerifyTier => "VerifyTier",
            Self::UnknownTier => "UnknownTier",
            Self::RedeemableErc20 => "RedeemableErc20",
            Self::Redeem => "Redeem",
            Self::TreasuryAsset => "TreasuryAsset",
            Self::TreasuryAssetCaller => "TreasuryAssetCaller",
            Self::StakeErc20 => "StakeErc20",
            Self::StakeHolder => "StakeHolder",
            Self::StakeDeposit => "StakeDeposit",
            Self::StakeWithdraw => "StakeWithdraw",
            Self::EmissionsErc20 => "EmissionsErc20",
            Self::EmissionsClaim => "EmissionsClaim",
            Self::GatedNft => "GatedNft",
            Self::GatedToken => "GatedToken",
            Self::GatedTokenOwner => "GatedTokenOwner",
            Self::NftTransfer => "NftTransfer",
            Self::OwnershipTransfer => "OwnershipTransfer",
            Self::RoyaltyRecipientUpdate => "RoyaltyRecipientUpdate",
            Self::ClaimEscrow => "ClaimEscrow",
            Self::EscrowDeposit => "EscrowDeposit",
            Self::EscrowUndeposit => "EscrowUndeposit",
            Self::EscrowWithdraw => "EscrowWithdraw",
            Self::EscrowPendingDeposit => "EscrowPendingDeposit",
            Self::EscrowDepositor => "EscrowDepositor",
            Self::EscrowWithdrawer => "EscrowWithdrawer",
            Self::EscrowSupplyTokenDeposit => "EscrowSupplyTokenDeposit",
            Self::EscrowSupplyTokenDepositor => "EscrowSupplyTokenDepositor",
            Self::EscrowSupplyTokenWithdrawer => "EscrowSupplyTokenWithdrawer",
            Self::EscrowPendingDepositorToken => "EscrowPendingDepositorToken",
            Self::Order => "Order",
            Self::Vault => "Vault",
            Self::TokenVault => "TokenVault",
            Self::VaultDeposit => "VaultDeposit",
            Self::VaultWithdraw => "VaultWithdraw",
            Self::OrderClear => "OrderClear",
            Self::Bounty => "Bounty",
        }
    }
}

/// A persisted entity: a serde struct with a fixed kind and a string id.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// Raw store access: point lookup + upsert by `(kind, id)`.
///
/// `get_raw` returning `Ok(None)` means "not yet indexed" and is never an
/// error. A failing `put_raw` is fatal to the event being processed.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StoreError>;

    async fn put_raw(&self, kind: EntityKind, id: &str, value: Value) -> Result<(), StoreError>;
}

/// Typed load/save over any [`EntityStore`].
#[async_trait]
pub trait EntityStoreExt: EntityStore {
    /// Load an entity by id; `None` if not yet indexed.
    async fn load<T: Entity>(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(T::KIND, id).await? {
            Some(value) => {
                let entity =
                    serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
                        kind: T::KIND.name(),
                        id: id.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    /// Upsert an entity (full replace of its fields).
    async fn save<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(entity).map_err(|e| StoreError::WriteFailed {
            kind: T::KIND.name(),
            id: entity.id().to_string(),
            reason: e.to_string(),
        })?;
        self.put_raw(T::KIND, entity.id(), value).await
    }
}

impl<S: EntityStore + ?Sized> EntityStoreExt for S {}
