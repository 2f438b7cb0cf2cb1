//! Core types for the entity-graph projection engine.
//!
//! This crate defines the shared vocabulary: the typed event model, the
//! persisted entity model, the store and chain-read traits, deterministic
//! key construction and fixed-point math. The projection handlers live in
//! `entgraph-projections`; store backends live in `entgraph-store`.

pub mod chain;
pub mod entities;
pub mod error;
pub mod event;
pub mod events;
pub mod key;
pub mod manifest;
pub mod math;
pub mod store;

pub use chain::{ChainReader, SourceRegistrar, VerifyTimes};
pub use error::{ProjectionError, StoreError};
pub use event::EventCtx;
pub use events::{EventEnvelope, TrackedEvent};
pub use store::{Entity, EntityKind, EntityStore, EntityStoreExt};

/// The zero address, used as mint/burn counterparty and placeholder
/// deployer.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
