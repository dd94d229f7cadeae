//! Process-local backend used for development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::{DbError, Result};
use crate::models::{BookChanges, BookDraft, BookRecord, NewUser, UserRecord};
use crate::repository::{BookRepository, UserRepository};
use crate::parse_object_id;

/// In-memory store keyed by object id, so identifiers look and validate
/// exactly like the document store's.
#[derive(Default)]
pub struct MemoryStore {
    books: RwLock<BTreeMap<ObjectId, BookRecord>>,
    users: RwLock<BTreeMap<ObjectId, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn create(&self, draft: BookDraft) -> Result<BookRecord> {
        let id = ObjectId::new();
        let now = OffsetDateTime::now_utc();
        let record = BookRecord {
            id: id.to_hex(),
            title: draft.title,
            author: draft.author,
            genre: draft.genre,
            year: draft.year,
            description: draft.description,
            available: true,
            borrow_info: None,
            created_at: now,
            updated_at: now,
        };

        self.books.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<BookRecord>> {
        Ok(self.books.read().await.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<BookRecord> {
        let key = parse_object_id(id)?;
        self.books
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| DbError::book_not_found(id))
    }

    async fn update(&self, id: &str, changes: BookChanges) -> Result<BookRecord> {
        let key = parse_object_id(id)?;
        let mut books = self.books.write().await;
        let record = books
            .get_mut(&key)
            .ok_or_else(|| DbError::book_not_found(id))?;

        changes.apply_to(record);
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<BookRecord> {
        let key = parse_object_id(id)?;
        self.books
            .write()
            .await
            .remove(&key)
            .ok_or_else(|| DbError::book_not_found(id))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.username == user.username) {
            return Err(DbError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }

        let id = ObjectId::new();
        let record = UserRecord {
            id: id.to_hex(),
            username: user.username,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let key = parse_object_id(id)?;
        Ok(self.users.read().await.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BorrowInfo;
    use time::macros::date;

    fn draft(title: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "Ursula K. Le Guin".to_string(),
            ..BookDraft::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults() {
        let store = MemoryStore::new();
        let book = BookRepository::create(&store, draft("The Dispossessed"))
            .await
            .unwrap();

        assert_eq!(book.id.len(), 24);
        assert!(book.available);
        assert!(book.borrow_info.is_none());
        assert_eq!(store.get_by_id(&book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn get_all_lists_in_creation_order() {
        let store = MemoryStore::new();
        let first = BookRepository::create(&store, draft("A")).await.unwrap();
        let second = BookRepository::create(&store, draft("B")).await.unwrap();

        let ids: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn update_merges_without_enforcing_rules() {
        let store = MemoryStore::new();
        let book = BookRepository::create(&store, draft("Lathe")).await.unwrap();

        let changes = BookChanges {
            available: Some(false),
            borrow_info: Some(Some(BorrowInfo {
                name: "X".to_string(),
                department: "Y".to_string(),
                section: "Z".to_string(),
                borrow_date: date!(2024 - 01 - 01),
            })),
            ..BookChanges::default()
        };
        let updated = store.update(&book.id, changes).await.unwrap();

        assert!(!updated.available);
        assert_eq!(updated.title, "Lathe");
        assert!(updated.updated_at >= book.updated_at);
    }

    #[tokio::test]
    async fn malformed_id_is_distinguished_from_missing() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.get_by_id("not-an-id").await,
            Err(DbError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.delete(&ObjectId::new().to_hex()).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let store = MemoryStore::new();
        let book = BookRepository::create(&store, draft("Gone")).await.unwrap();

        let deleted = store.delete(&book.id).await.unwrap();
        assert_eq!(deleted.id, book.id);
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        let user = NewUser {
            username: "reader".to_string(),
            password_hash: "hash".to_string(),
        };

        let created = UserRepository::create(&store, user.clone()).await.unwrap();
        assert!(matches!(
            UserRepository::create(&store, user).await,
            Err(DbError::Conflict(_))
        ));

        let found = store.find_by_username("reader").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_by_username("Reader").await.unwrap().is_none());
        assert_eq!(
            store.find_by_id(&created.id).await.unwrap().map(|u| u.username),
            Some("reader".to_string())
        );
    }
}
