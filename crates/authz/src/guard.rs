//! Request guard for routes that need a signed-in user.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use libris_http::error::AppError;

use crate::error::AuthError;
use crate::service::{AuthService, PublicUser};

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
///
/// Handlers take this as an argument instead of reading any global session
/// state; a missing or bad token rejects the request with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub PublicUser);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn username(&self) -> &str {
        &self.0.username
    }
}

/// Extract the bearer token from request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::Unauthorized("Not authorized, no token"))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::Unauthorized("Not authorized, no token")),
    }
}

/// Resolve the caller from request headers.
pub async fn authenticate_headers(
    auth: &AuthService,
    headers: &HeaderMap,
) -> Result<CurrentUser, AuthError> {
    let token = bearer_token(headers)?;
    let user = auth.authenticate(token).await?;
    Ok(CurrentUser(user))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let auth = Arc::<AuthService>::from_ref(state);
        let user = authenticate_headers(&auth, &parts.headers).await?;
        tracing::debug!(user_id = %user.id(), "request authenticated");

        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenService;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use libris_db::MemoryStore;
    use std::time::Duration;
    use tower::ServiceExt;

    fn auth_service() -> Arc<AuthService> {
        let tokens = TokenService::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            Duration::from_secs(3600),
        )
        .unwrap();
        Arc::new(AuthService::new(Arc::new(MemoryStore::new()), tokens, 4))
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers_with("bearer abc")).unwrap(), "abc");
        assert!(bearer_token(&headers_with("Basic abc")).is_err());
        assert!(bearer_token(&headers_with("Bearer ")).is_err());
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }

    async fn whoami(user: CurrentUser) -> String {
        user.username().to_string()
    }

    #[tokio::test]
    async fn guard_admits_valid_token_and_rejects_others() {
        let auth = auth_service();
        let session = auth.register("reader", "secret123").await.unwrap();
        let app = Router::new()
            .route("/me", get(whoami))
            .with_state(auth.clone());

        let ok = app
            .clone()
            .oneshot(
                Request::get("/me")
                    .header("authorization", format!("Bearer {}", session.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = app
            .clone()
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let forged = app
            .oneshot(
                Request::get("/me")
                    .header("authorization", "Bearer forged.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
    }
}
