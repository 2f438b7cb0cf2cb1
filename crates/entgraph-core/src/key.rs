//! Deterministic entity-key construction.
//!
//! Almost every entity key is either a raw contract address (lowercase hex)
//! or a composite of component strings joined with `" - "`, in a fixed field
//! order per entity kind. Two events describing the same logical entity must
//! re-derive byte-identical keys, so all joining goes through this module.
//!
//! `Order` is the exception: its key is content-addressed, the decimal form
//! of `keccak256(abiEncode(config))` over the seven immutable configuration
//! fields, so byte-identical configurations collapse to one entity.

use std::str::FromStr;

use alloy_primitives::{keccak256, Address, Bytes, U256};
use alloy_sol_types::{sol, SolValue};
use serde::{Deserialize, Serialize};

/// Delimiter for composite keys.
pub const DELIM: &str = " - ";

/// Join key components with the standard `" - "` delimiter.
pub fn composite(parts: &[&str]) -> String {
    parts.join(DELIM)
}

/// Join key components with a bare `"-"`.
///
/// Stake-domain keys (`StakeHolder`, deposit/withdraw references) use this
/// tighter form; everything else uses [`composite`].
pub fn tight(parts: &[&str]) -> String {
    parts.join("-")
}

/// The immutable order configuration tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfig {
    pub owner: String,
    pub input_token: String,
    pub input_vault_id: U256,
    pub output_token: String,
    pub output_vault_id: U256,
    pub tracking: U256,
    pub vm_state: Vec<u8>,
}

sol! {
    struct OrderTuple {
        address owner;
        address inputToken;
        uint256 inputVaultId;
        address outputToken;
        uint256 outputVaultId;
        uint256 tracking;
        bytes vmState;
    }
}

/// Content-addressed key for an order: decimal string of the keccak256 hash
/// of the ABI-encoded configuration tuple.
///
/// Unparseable addresses fall back to the zero address; the key is still
/// deterministic for any input.
pub fn order_key(config: &OrderConfig) -> String {
    let tuple = OrderTuple {
        owner: parse_address(&config.owner),
        inputToken: parse_address(&config.input_token),
        inputVaultId: config.input_vault_id,
        outputToken: parse_address(&config.output_token),
        outputVaultId: config.output_vault_id,
        tracking: config.tracking,
        vmState: Bytes::from(config.vm_state.clone()),
    };
    let hash = keccak256(tuple.abi_encode());
    U256::from_be_bytes(hash.0).to_string()
}

fn parse_address(s: &str) -> Address {
    Address::from_str(s).unwrap_or(Address::ZERO)
}
