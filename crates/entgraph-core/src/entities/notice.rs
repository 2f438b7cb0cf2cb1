//! NoticeBoard entities.

use serde::{Deserialize, Serialize};

/// What kind of tracked contract a notice's subject resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeSubjectKind {
    Sale,
    Verify,
    VerifyTier,
    CombineTier,
    ClaimEscrow,
    UnknownTier,
    /// Subject matched no tracked contract; the notice lives in the shared
    /// unknown bucket.
    Unknown,
}

/// An arbitrary data blob posted against a subject contract, keyed by
/// transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub sender: String,
    /// Subject contract address the notice was posted against.
    pub subject: String,
    pub subject_kind: NoticeSubjectKind,
    /// Hex-encoded payload, opaque to the indexer.
    pub data: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
}

impl_entity!(Notice, Notice);

/// Shared bucket for notices whose subject is not a tracked contract.
/// Singleton, keyed by [`UnknownNotice::ID`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownNotice {
    pub id: String,
    pub notices: Vec<String>,
}

impl UnknownNotice {
    pub const ID: &'static str = "UNKNOWN_NOTICES";

    pub fn new() -> Self {
        Self {
            id: Self::ID.to_string(),
            notices: Vec::new(),
        }
    }
}

impl Default for UnknownNotice {
    fn default() -> Self {
        Self::new()
    }
}

impl_entity!(UnknownNotice, UnknownNotice);
