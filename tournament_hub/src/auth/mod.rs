//! Caller identity: roles, verified principals and access tokens.
//!
//! ## Example
//!
//! ```
//! use tournament_hub::auth::{Role, TokenVerifier};
//!
//! let verifier = TokenVerifier::new("a_secret_of_at_least_thirty_two_chars", 60).unwrap();
//! let token = verifier.issue(7, Role::Organizer).unwrap();
//! let principal = verifier.verify(&token).unwrap();
//! assert!(principal.can_manage(7));
//! ```

pub mod errors;
pub mod models;
pub mod verifier;

pub use errors::{AuthError, AuthResult};
pub use models::{AccessTokenClaims, Principal, Role, UserId};
pub use verifier::TokenVerifier;
