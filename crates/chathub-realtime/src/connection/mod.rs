//! WebSocket connection management: handles, pool, registry, heartbeat, auth.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod pool;
pub mod registry;

pub use authenticator::{AuthenticatedUser, WsAuthenticator};
pub use handle::ConnectionHandle;
pub use registry::{ConnectionRegistry, Registration, Unregistered};
