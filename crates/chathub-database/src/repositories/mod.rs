//! PostgreSQL implementations of the store traits.

pub mod call;
pub mod directory;
pub mod group;
pub mod message;

pub use call::CallRepository;
pub use directory::{DeviceRepository, DirectoryRepository};
pub use group::GroupRepository;
pub use message::MessageRepository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::store::Stores;

/// Build the Postgres-backed store set over one pool.
pub fn postgres_stores(pool: PgPool) -> Stores {
    Stores {
        messages: Arc::new(MessageRepository::new(pool.clone())),
        calls: Arc::new(CallRepository::new(pool.clone())),
        groups: Arc::new(GroupRepository::new(pool.clone())),
        directory: Arc::new(DirectoryRepository::new(pool.clone())),
        devices: Arc::new(DeviceRepository::new(pool)),
    }
}
