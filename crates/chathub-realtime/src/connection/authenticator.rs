//! WebSocket authentication: validates the JWT presented at upgrade time.

use std::sync::Arc;

use chathub_auth::jwt::JwtDecoder;
use chathub_core::error::AppError;
use chathub_core::types::UserId;

/// Identity extracted from a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User ID.
    pub user_id: UserId,
    /// Username.
    pub username: String,
}

/// Authenticates WebSocket connections using JWT tokens.
#[derive(Clone)]
pub struct WsAuthenticator {
    decoder: Arc<JwtDecoder>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    /// Creates a new WebSocket authenticator.
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// Authenticates a connection using a JWT token (typically from query parameter).
    ///
    /// Fails with an `Authentication` error; the caller must not register
    /// the connection in that case.
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        if token.is_empty() {
            return Err(AppError::authentication("Missing access token"));
        }
        let claims = self.decoder.decode_access_token(token)?;

        Ok(AuthenticatedUser {
            user_id: claims.user_id(),
            username: claims.username,
        })
    }
}
