//! # chathub-database
//!
//! Store interfaces consumed by the realtime engine, their PostgreSQL
//! implementations, and a process-local implementation used for
//! development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{CallStore, DeviceStore, DirectoryStore, GroupStore, MessageStore, Stores};
