//! HS256 access token issuance and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, Principal, Role, UserId},
};

/// Minimum accepted secret length
pub const MIN_SECRET_LEN: usize = 32;

/// Token verifier shared by request handlers
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("access_token_duration", &self.access_token_duration)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Create a verifier
    ///
    /// # Arguments
    ///
    /// * `jwt_secret` - HMAC secret, at least 32 characters
    /// * `access_token_minutes` - Lifetime of issued tokens
    ///
    /// # Errors
    ///
    /// * `AuthError::WeakSecret` - Secret is too short
    pub fn new(jwt_secret: &str, access_token_minutes: i64) -> AuthResult<Self> {
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret(MIN_SECRET_LEN));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_duration: Duration::minutes(access_token_minutes),
        })
    }

    /// Issue an access token for a user
    pub fn issue(&self, user_id: UserId, role: Role) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id,
            role,
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify an access token
    ///
    /// # Arguments
    ///
    /// * `token` - JWT access token
    ///
    /// # Returns
    ///
    /// * `AuthResult<Principal>` - Verified identity or error
    pub fn verify(&self, token: &str) -> AuthResult<Principal> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(Principal::from(&token_data.claims))
    }

    /// Verify the value of an `Authorization: Bearer <token>` header
    pub fn verify_bearer(&self, header: &str) -> AuthResult<Principal> {
        let token = header
            .strip_prefix("Bearer ")
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }
}
