//! Persistence layer for libris: repository contracts and their backends.

use std::sync::Arc;

use bson::oid::ObjectId;
use libris_kernel::settings::{DatabaseBackend, DatabaseSettings};

pub mod error;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod repository;

pub use error::{DbError, Result};
pub use memory::MemoryStore;
pub use models::{BookChanges, BookDraft, BookRecord, BorrowInfo, NewUser, UserRecord};
pub use mongo::MongoStore;
pub use repository::{BookRepository, UserRepository};

/// Repository handles shared by the services.
#[derive(Clone)]
pub struct Stores {
    pub books: Arc<dyn BookRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Stores {
    /// Both repositories backed by one fresh in-memory store.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            books: store.clone(),
            users: store,
        }
    }
}

/// Open the backend selected in configuration.
pub async fn connect(settings: &DatabaseSettings) -> Result<Stores> {
    match settings.backend {
        DatabaseBackend::Memory => {
            tracing::warn!(
                target: "libris-db",
                "using in-memory store; data is lost on restart"
            );
            Ok(Stores::in_memory())
        }
        DatabaseBackend::Mongo => {
            tracing::info!(
                target: "libris-db",
                endpoint = %settings.endpoint,
                database = %settings.database,
                "connecting to MongoDB"
            );
            let store = Arc::new(MongoStore::connect(&settings.endpoint, &settings.database).await?);
            Ok(Stores {
                books: store.clone(),
                users: store,
            })
        }
    }
}

/// Identifiers are 24-character hex object ids in every backend.
pub(crate) fn parse_object_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| DbError::InvalidIdentifier(id.to_string()))
}
