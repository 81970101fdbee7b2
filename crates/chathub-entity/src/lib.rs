//! # chathub-entity
//!
//! Domain entity models for ChatHub. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! additionally derive `sqlx::FromRow`.

pub mod call;
pub mod device;
pub mod group;
pub mod message;
