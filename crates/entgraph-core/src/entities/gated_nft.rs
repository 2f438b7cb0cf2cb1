//! Tier-gated NFT entities.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::tier::TierRef;

/// Transfer policy of a gated NFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transferrable {
    NonTransferrable,
    Transferrable,
    TierGatedTransferrable,
}

impl Transferrable {
    /// Decode the on-chain uint representation. Unknown values read as
    /// `NonTransferrable`.
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Transferrable,
            2 => Self::TierGatedTransferrable,
            _ => Self::NonTransferrable,
        }
    }
}

/// A gated NFT contract, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedNft {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    pub factory: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub animation_url: Option<String>,
    pub animation_hash: Option<String>,
    pub image_url: Option<String>,
    pub image_hash: Option<String>,
    pub owner: Option<String>,
    pub tier: Option<TierRef>,
    pub minimum_status: U256,
    pub max_per_address: U256,
    pub transferrable: Transferrable,
    pub max_mintable: U256,
    pub royalty_recipient: Option<String>,
    pub royalty_bps: U256,
    pub royalty_percent: U256,
    /// Count of mints. Burns do not decrement it.
    pub tokens_minted: U256,
    pub gated_tokens: Vec<String>,
    pub gated_token_owners: Vec<String>,
    pub transfer_history: Vec<String>,
    pub ownership_history: Vec<String>,
    pub royalty_history: Vec<String>,
}

impl GatedNft {
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
            description: None,
            animation_url: None,
            animation_hash: None,
            image_url: None,
            image_hash: None,
            owner: None,
            tier: None,
            minimum_status: U256::ZERO,
            max_per_address: U256::ZERO,
            transferrable: Transferrable::NonTransferrable,
            max_mintable: U256::ZERO,
            royalty_recipient: None,
            royalty_bps: U256::ZERO,
            royalty_percent: U256::ZERO,
            tokens_minted: U256::ZERO,
            gated_tokens: Vec::new(),
            gated_token_owners: Vec::new(),
            transfer_history: Vec::new(),
            ownership_history: Vec::new(),
            royalty_history: Vec::new(),
        }
    }
}

impl_entity!(GatedNft, GatedNft);

/// One minted token of a gated NFT, keyed `nftAddress - tokenId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedToken {
    pub id: String,
    pub token_id: U256,
    pub gated_nft: String,
    pub owner: String,
    pub mint_block: u64,
    pub mint_timestamp: u64,
    pub transfer_history: Vec<String>,
}

impl_entity!(GatedToken, GatedToken);

/// Per-owner token count on a gated NFT, keyed `nftAddress - ownerAddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedTokenOwner {
    pub id: String,
    pub address: String,
    pub gated_nft: String,
    pub token_count: U256,
    pub tokens: Vec<String>,
}

impl GatedTokenOwner {
    pub fn new(id: &str, address: &str, gated_nft: &str) -> Self {
        Self {
            id: id.to_string(),
            address: address.to_string(),
            gated_nft: gated_nft.to_string(),
            token_count: U256::ZERO,
            tokens: Vec::new(),
        }
    }
}

impl_entity!(GatedTokenOwner, GatedTokenOwner);

/// One ERC721 transfer (mint, burn or move), keyed
/// `txHash - nftAddress - tokenId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransfer {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub transaction_hash: String,
    pub gated_nft: String,
    pub token_id: U256,
    pub from: String,
    pub to: String,
}

impl_entity!(NftTransfer, NftTransfer);

/// An ownership handover on a gated NFT, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransfer {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub gated_nft: String,
    pub old_owner: String,
    pub new_owner: String,
}

impl_entity!(OwnershipTransfer, OwnershipTransfer);

/// A royalty-recipient change on a gated NFT, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoyaltyRecipientUpdate {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub gated_nft: String,
    pub old_royalty_recipient: String,
    pub new_royalty_recipient: String,
}

impl_entity!(RoyaltyRecipientUpdate, RoyaltyRecipientUpdate);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transferrable_decodes_onchain_values() {
        assert_eq!(Transferrable::from_u8(0), Transferrable::NonTransferrable);
        assert_eq!(Transferrable::from_u8(1), Transferrable::Transferrable);
        assert_eq!(Transferrable::from_u8(2), Transferrable::TierGatedTransferrable);
        assert_eq!(Transferrable::from_u8(7), Transferrable::NonTransferrable);
    }
}
