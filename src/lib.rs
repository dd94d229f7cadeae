//! libris application library.
//!
//! Wires the configured store, the auth service and the book lifecycle
//! engine into the `auth` and `books` modules, and runs the HTTP server.

use std::future::Future;

use anyhow::Context;
use axum::Router;
use libris_db::Stores;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

pub use modules::AppServices;

/// Register every module against `stores`.
pub fn build_registry(settings: &Settings, stores: &Stores) -> anyhow::Result<ModuleRegistry> {
    let services = AppServices::new(settings, stores)?;
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings, &services)?;
    Ok(registry)
}

/// The registry and the fully layered router, without binding a socket.
pub fn build_app(settings: &Settings, stores: &Stores) -> anyhow::Result<(ModuleRegistry, Router)> {
    let registry = build_registry(settings, stores)?;
    let router = libris_http::build_router(&registry, settings);
    Ok((registry, router))
}

/// Boot the service and serve until `shutdown` resolves.
pub async fn run<F>(settings: Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    libris_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        "libris bootstrap starting"
    );

    let stores = libris_db::connect(&settings.database)
        .await
        .context("failed to open the configured store")?;
    let registry = build_registry(&settings, &stores)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;
    tracing::info!(modules = registry.module_count(), "libris bootstrap complete");

    let served = libris_http::start_server(&registry, &settings, shutdown).await;

    // Modules stop even when the server failed.
    registry.stop_modules().await?;
    served
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
