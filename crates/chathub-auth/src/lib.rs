//! # chathub-auth
//!
//! Access token handling for ChatHub. Tokens are HS256 JWTs whose
//! subject is the user id; the realtime engine and the HTTP layer both
//! validate them through [`JwtDecoder`].

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
