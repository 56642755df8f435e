//! Kernel module - server infrastructure and dependencies.

pub mod blob_store;
pub mod deps;
pub mod kv_store;
pub mod oracle_client;
pub mod outcome_store;
pub mod test_dependencies;
pub mod traits;

pub use blob_store::{InMemoryBlobStore, LocalBlobStore, StoredBlob};
pub use deps::{ServerDeps, TwilioAdapter};
pub use kv_store::{InMemoryKeyValueStore, SweeperHandle};
pub use oracle_client::HttpVerificationOracle;
pub use outcome_store::{InMemoryOutcomeStore, PostgresOutcomeStore, VerifiedUser};
pub use test_dependencies::TestDependencies;
pub use traits::*;
