use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use libris_authz::{AuthService, AuthSession};
use libris_http::error::AppError;
use libris_kernel::{InitCtx, Module};
use serde::Deserialize;
use serde_json::json;

/// Account registration and login.
pub struct AuthModule {
    auth: Arc<AuthService>,
}

impl AuthModule {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            token_ttl_secs = ctx.settings.auth.token_ttl_secs,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/health", get(health_check))
            .with_state(self.auth.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let session = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/AuthSession" }
                    }
                }
            })
        };
        let credentials = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Credentials" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/register": {
                    "post": {
                        "summary": "Create an account",
                        "tags": ["Auth"],
                        "requestBody": credentials,
                        "responses": {
                            "201": session("Account created and signed in"),
                            "400": error("Missing fields, username shorter than 3 or password shorter than 6"),
                            "409": error("User already exists")
                        }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Sign in",
                        "tags": ["Auth"],
                        "requestBody": credentials,
                        "responses": {
                            "200": session("Signed in"),
                            "400": error("Missing fields"),
                            "401": error("Invalid username or password")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Auth health check",
                        "tags": ["Auth"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Credentials": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string", "minLength": 3 },
                            "password": { "type": "string", "minLength": 6 }
                        },
                        "required": ["username", "password"]
                    },
                    "AuthSession": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "username": { "type": "string" },
                            "token": { "type": "string" }
                        },
                        "required": ["id", "username", "token"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module stopped");
        Ok(())
    }
}

async fn health_check() -> &'static str {
    "auth module is healthy"
}

async fn register(
    State(auth): State<Arc<AuthService>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    let Json(credentials) = payload?;
    let session = auth
        .register(&credentials.username, &credentials.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(
    State(auth): State<Arc<AuthService>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthSession>, AppError> {
    let Json(credentials) = payload?;
    let session = auth
        .login(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(session))
}
