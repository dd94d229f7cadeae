//! Accounts and authentication for libris.
//!
//! Passwords are stored as salted bcrypt hashes. Sessions are stateless
//! HMAC-signed tokens carried as `Authorization: Bearer <token>`.

pub mod error;
pub mod guard;
pub mod password;
pub mod service;
pub mod token;

pub use error::AuthError;
pub use guard::{authenticate_headers, bearer_token, CurrentUser};
pub use service::{AuthService, AuthSession, PublicUser};
pub use token::{SessionClaims, TokenError, TokenService};
