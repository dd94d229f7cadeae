pub mod auth;
pub mod books;

use std::sync::Arc;

use libris_authz::AuthService;
use libris_db::Stores;
use libris_kernel::{settings::Settings, ModuleRegistry};

use books::lifecycle::{BookLifecycle, LifecyclePolicy};

/// Services shared by the modules, built once per process.
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub lifecycle: Arc<BookLifecycle>,
}

impl AppServices {
    pub fn new(settings: &Settings, stores: &Stores) -> anyhow::Result<Self> {
        let auth = AuthService::from_settings(stores.users.clone(), &settings.auth)?;
        let lifecycle =
            BookLifecycle::new(stores.books.clone(), LifecyclePolicy::from(&settings.books));

        Ok(Self {
            auth: Arc::new(auth),
            lifecycle: Arc::new(lifecycle),
        })
    }
}

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    services: &AppServices,
) -> anyhow::Result<()> {
    registry.register(Arc::new(auth::AuthModule::new(services.auth.clone())))?;
    registry.register(Arc::new(books::BooksModule::new(
        services.lifecycle.clone(),
        services.auth.clone(),
        settings.books.public_listing,
    )))?;
    Ok(())
}
