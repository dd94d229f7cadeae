//! Storage contracts implemented by every backend.
//!
//! Repositories are deliberately dumb: they assign identifiers and
//! timestamps, merge and store. Business rules live with the callers.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BookChanges, BookDraft, BookRecord, NewUser, UserRecord};

/// Book persistence operations
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Store a new book, available and without borrower details
    async fn create(&self, draft: BookDraft) -> Result<BookRecord>;

    /// All stored books, oldest first
    async fn get_all(&self) -> Result<Vec<BookRecord>>;

    /// Find a book by identifier
    async fn get_by_id(&self, id: &str) -> Result<BookRecord>;

    /// Merge `changes` into the stored book and return the result
    async fn update(&self, id: &str, changes: BookChanges) -> Result<BookRecord>;

    /// Remove a book, returning what was stored
    async fn delete(&self, id: &str) -> Result<BookRecord>;
}

/// Account persistence operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new account; fails with `Conflict` when the username exists
    async fn create(&self, user: NewUser) -> Result<UserRecord>;

    /// Exact, case-sensitive username lookup
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Find an account by identifier
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>>;
}
