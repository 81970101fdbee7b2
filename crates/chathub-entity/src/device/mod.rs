//! Push notification devices.

pub mod model;

pub use model::Device;
