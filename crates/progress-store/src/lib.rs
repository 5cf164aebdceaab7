//! Durable progress store for ticket sagas.
//!
//! Every status transition of a running saga is checkpointed here before the
//! next step begins. On (re)start the engine loads the latest checkpoint and
//! resumes from it.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod version;

pub use checkpoint::Checkpoint;
pub use common::TicketId;
pub use error::{ProgressStoreError, Result};
pub use memory::InMemoryProgressStore;
pub use postgres::PostgresProgressStore;
pub use query::CheckpointQuery;
pub use store::{CheckpointOptions, ProgressStore, ProgressStoreExt, SharedProgressStore};
pub use version::Version;
