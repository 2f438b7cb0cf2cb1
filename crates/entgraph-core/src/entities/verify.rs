//! Verify (identity attestation) entities.

use serde::{Deserialize, Serialize};

use crate::chain::VerifyTimes;

/// Attestation status of an account on a verify contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyStatus {
    Nil,
    Added,
    Approved,
    Banned,
}

/// Outstanding request an account has open against a verify contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    None,
    Approve,
    Ban,
    Remove,
}

/// Access-control roles on a verify contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    ApproverAdmin,
    RemoverAdmin,
    BannerAdmin,
    Approver,
    Remover,
    Banner,
}

/// Derive the attestation status from the on-chain threshold timestamps as
/// of `timestamp`.
///
/// Priority on simultaneous thresholds is banned over approved over added.
/// `added_since < 1` means the account has been removed entirely.
pub fn status_at(state: &VerifyTimes, timestamp: u64) -> VerifyStatus {
    if state.added_since < 1 {
        return VerifyStatus::Nil;
    }
    if state.banned_since > 0 && state.banned_since <= timestamp {
        return VerifyStatus::Banned;
    }
    if state.approved_since > 0 && state.approved_since <= timestamp {
        return VerifyStatus::Approved;
    }
    if state.added_since <= timestamp {
        return VerifyStatus::Added;
    }
    VerifyStatus::Nil
}

/// A verify contract, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verify {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    pub factory: String,
    pub verify_event_count: u64,
    pub verify_addresses: Vec<String>,
    pub approvers: Vec<String>,
    pub removers: Vec<String>,
    pub banners: Vec<String>,
    pub approver_admins: Vec<String>,
    pub remover_admins: Vec<String>,
    pub banner_admins: Vec<String>,
    pub approvals: Vec<String>,
    pub removals: Vec<String>,
    pub bans: Vec<String>,
    pub request_approvals: Vec<String>,
    pub request_removals: Vec<String>,
    pub request_bans: Vec<String>,
    pub notices: Vec<String>,
}

impl Verify {
    pub fn new(address: &str, block: u64, timestamp: u64, deployer: &str, factory: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            deployer: deployer.to_string(),
            factory: factory.to_string(),
            verify_event_count: 0,
            verify_addresses: Vec::new(),
            approvers: Vec::new(),
            removers: Vec::new(),
            banners: Vec::new(),
            approver_admins: Vec::new(),
            remover_admins: Vec::new(),
            banner_admins: Vec::new(),
            approvals: Vec::new(),
            removals: Vec::new(),
            bans: Vec::new(),
            request_approvals: Vec::new(),
            request_removals: Vec::new(),
            request_bans: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl_entity!(Verify, Verify);

/// Per-account state on a verify contract, keyed
/// `verifyAddress - accountAddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAddress {
    pub id: String,
    pub verify_contract: String,
    pub address: String,
    pub status: VerifyStatus,
    pub request_status: RequestStatus,
    pub roles: Vec<Role>,
    pub events: Vec<String>,
}

impl VerifyAddress {
    pub fn new(id: &str, verify_contract: &str, address: &str) -> Self {
        Self {
            id: id.to_string(),
            verify_contract: verify_contract.to_string(),
            address: address.to_string(),
            status: VerifyStatus::Nil,
            request_status: RequestStatus::None,
            roles: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn grant(&mut self, role: Role) {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
    }

    pub fn revoke(&mut self, role: Role) {
        self.roles.retain(|r| *r != role);
    }
}

impl_entity!(VerifyAddress, VerifyAddress);

/// The six attestation event shapes share one record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyEventKind {
    Approve,
    Ban,
    Remove,
    RequestApprove,
    RequestBan,
    RequestRemove,
}

/// One attestation event, keyed `txHash - verifyAddress - account`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEventRecord {
    pub id: String,
    pub kind: VerifyEventKind,
    pub block: u64,
    pub timestamp: u64,
    pub transaction_hash: String,
    pub verify_contract: String,
    pub sender: String,
    pub account: String,
    /// Hex-encoded evidence payload.
    pub data: String,
}

impl_entity!(VerifyEventRecord, VerifyEventRecord);
