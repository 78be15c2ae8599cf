//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed Authorization header
    #[error("Missing or malformed bearer token")]
    MissingToken,

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Token secret is unusable
    #[error("JWT secret must be at least {0} characters")]
    WeakSecret(usize),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// JWT errors are sanitized to prevent information disclosure
    /// about the token structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            AuthError::WeakSecret(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
