//! In-process store used by tests and single-node deployments without PostgreSQL.

pub mod store;

pub use store::MemoryStore;
