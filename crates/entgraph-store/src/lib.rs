//! Entity store backends for entgraph.
//!
//! Ships the in-memory backend plus the chain-read test doubles the
//! projection test suites build on.

pub mod memory;
pub mod mock;

pub use memory::MemoryStore;
pub use mock::{MockChain, RecordingSources};
