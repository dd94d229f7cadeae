//! Registration, login and token verification.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use libris_db::{NewUser, UserRecord, UserRepository};
use libris_kernel::settings::AuthSettings;
use serde::Serialize;

use crate::error::{AuthError, Result};
use crate::password;
use crate::token::{now_secs, TokenService};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const TOKEN_FAILED: &str = "Not authorized, token failed";

/// Account data safe to hand to clients and handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
}

impl From<UserRecord> for PublicUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    #[serde(flatten)]
    pub user: PublicUser,
    pub token: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self {
            users,
            tokens,
            bcrypt_cost,
        }
    }

    pub fn from_settings(
        users: Arc<dyn UserRepository>,
        settings: &AuthSettings,
    ) -> anyhow::Result<Self> {
        let tokens = TokenService::new(
            settings.token_secret.as_bytes().to_vec(),
            Duration::from_secs(settings.token_ttl_secs),
        )
        .context("invalid auth.token_secret")?;
        Ok(Self::new(users, tokens, settings.bcrypt_cost))
    }

    /// Create an account and sign it in.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthSession> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Please enter all fields".to_string()));
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(AuthError::Validation(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::Conflict("User already exists".to_string()));
        }

        let password_hash = password::hash(password.to_string(), self.bcrypt_cost).await?;
        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        self.session_for(user.into())
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Please enter all fields".to_string()));
        }

        let Some(user) = self.users.find_by_username(username).await? else {
            // Unknown accounts cost the same bcrypt work as a password check.
            password::hash(password.to_string(), self.bcrypt_cost).await?;
            tracing::warn!(%username, "login attempt for unknown user");
            return Err(AuthError::Unauthorized(INVALID_CREDENTIALS));
        };

        if !password::verify(password.to_string(), user.password_hash.clone()).await? {
            tracing::warn!(%username, "failed login attempt");
            return Err(AuthError::Unauthorized(INVALID_CREDENTIALS));
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.session_for(user.into())
    }

    /// Validate a bearer token and return the subject's user id.
    pub fn verify_token(&self, token: &str) -> Result<String> {
        match self.tokens.verify(token, now_secs()) {
            Ok(claims) => Ok(claims.sub),
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                Err(AuthError::Unauthorized(TOKEN_FAILED))
            }
        }
    }

    /// Validate a bearer token and load the account it names.
    pub async fn authenticate(&self, token: &str) -> Result<PublicUser> {
        let user_id = self.verify_token(token)?;
        self.users
            .find_by_id(&user_id)
            .await?
            .map(PublicUser::from)
            .ok_or(AuthError::Unauthorized(TOKEN_FAILED))
    }

    fn session_for(&self, user: PublicUser) -> Result<AuthSession> {
        let token = self
            .tokens
            .issue(&user.id, now_secs())
            .context("failed to issue session token")?;
        Ok(AuthSession { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_db::MemoryStore;

    fn service() -> AuthService {
        let tokens = TokenService::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            Duration::from_secs(3600),
        )
        .unwrap();
        AuthService::new(Arc::new(MemoryStore::new()), tokens, 4)
    }

    #[tokio::test]
    async fn register_then_login_resolves_to_same_user() {
        let auth = service();
        let registered = auth.register("reader", "secret123").await.unwrap();
        assert_eq!(registered.user.username, "reader");

        let session = auth.login("reader", "secret123").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);
        assert_eq!(auth.verify_token(&session.token).unwrap(), registered.user.id);

        let current = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(current, registered.user);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let auth = service();
        auth.register("reader", "secret123").await.unwrap();

        assert!(matches!(
            auth.login("reader", "not-it").await,
            Err(AuthError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login("nobody", "secret123").await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn unknown_user_login_still_pays_for_bcrypt() {
        let tokens = TokenService::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            Duration::from_secs(3600),
        )
        .unwrap();
        let auth = AuthService::new(Arc::new(MemoryStore::new()), tokens, 12);

        let started = std::time::Instant::now();
        assert!(matches!(
            auth.login("nobody", "secret123").await,
            Err(AuthError::Unauthorized(_))
        ));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let auth = service();
        auth.register("reader", "secret123").await.unwrap();

        assert!(matches!(
            auth.register("reader", "other-pass").await,
            Err(AuthError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let auth = service();

        for (username, password) in [
            ("", "secret123"),
            ("reader", ""),
            ("   ", "secret123"),
            ("ab", "secret123"),
            ("reader", "12345"),
        ] {
            assert!(
                matches!(
                    auth.register(username, password).await,
                    Err(AuthError::Validation(_))
                ),
                "expected validation error for {username:?}/{password:?}"
            );
        }
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let auth = service();
        assert!(matches!(
            auth.login("", "secret123").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn garbage_tokens_are_unauthorized() {
        let auth = service();
        assert!(matches!(
            auth.verify_token("garbage"),
            Err(AuthError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.authenticate("").await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn token_for_deleted_or_unknown_user_is_unauthorized() {
        let auth = service();
        let token = auth.tokens.issue("65a1f0c2e4b0a1b2c3d4e5f6", now_secs()).unwrap();

        assert!(matches!(
            auth.authenticate(&token).await,
            Err(AuthError::Unauthorized(_))
        ));
    }
}
