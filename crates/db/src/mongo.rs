//! MongoDB backend.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures_util::stream::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{DbError, Result};
use crate::models::{BookChanges, BookDraft, BookRecord, BorrowInfo, NewUser, UserRecord};
use crate::parse_object_id;
use crate::repository::{BookRepository, UserRepository};

const BOOKS: &str = "books";
const USERS: &str = "users";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    author: String,
    genre: Option<String>,
    year: Option<i32>,
    description: Option<String>,
    available: bool,
    borrow_info: Option<BorrowInfo>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl From<BookDocument> for BookRecord {
    fn from(doc: BookDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            title: doc.title,
            author: doc.author,
            genre: doc.genre,
            year: doc.year,
            description: doc.description,
            available: doc.available,
            borrow_info: doc.borrow_info,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    username: String,
    password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl From<UserDocument> for UserRecord {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            username: doc.username,
            password_hash: doc.password_hash,
            created_at: doc.created_at,
        }
    }
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, database_name: &str) -> Self {
        Self {
            db: client.database(database_name),
        }
    }

    /// Connect and make sure the indexes the repositories rely on exist.
    pub async fn connect(endpoint: &str, database_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(endpoint).await?;
        let store = Self::new(client, database_name);
        store.init_indexes().await?;
        Ok(store)
    }

    fn books(&self) -> Collection<BookDocument> {
        self.db.collection(BOOKS)
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection(USERS)
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.users().create_index(username_index).await?;

        tracing::info!(target: "libris-db", "database indexes created");
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

fn change_set(changes: &BookChanges, now: OffsetDateTime) -> Result<Document> {
    let mut set = doc! { "updatedAt": bson::to_bson(&Rfc3339(now))? };

    if let Some(title) = &changes.title {
        set.insert("title", title.as_str());
    }
    if let Some(author) = &changes.author {
        set.insert("author", author.as_str());
    }
    if let Some(genre) = &changes.genre {
        set.insert("genre", nullable(genre.as_deref()));
    }
    if let Some(year) = changes.year {
        set.insert("year", year.map_or(Bson::Null, Bson::Int32));
    }
    if let Some(description) = &changes.description {
        set.insert("description", nullable(description.as_deref()));
    }
    if let Some(available) = changes.available {
        set.insert("available", available);
    }
    if let Some(borrow_info) = &changes.borrow_info {
        let value = match borrow_info {
            Some(info) => bson::to_bson(info)?,
            None => Bson::Null,
        };
        set.insert("borrowInfo", value);
    }

    Ok(set)
}

fn nullable(value: Option<&str>) -> Bson {
    value.map_or(Bson::Null, |text| Bson::String(text.to_string()))
}

/// Serializes a timestamp the same way the document structs do.
#[derive(Serialize)]
struct Rfc3339(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

#[async_trait]
impl BookRepository for MongoStore {
    async fn create(&self, draft: BookDraft) -> Result<BookRecord> {
        let now = OffsetDateTime::now_utc();
        let document = BookDocument {
            id: ObjectId::new(),
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

        self.books().insert_one(&document).await?;
        Ok(document.into())
    }

    async fn get_all(&self) -> Result<Vec<BookRecord>> {
        let cursor = self.books().find(doc! {}).sort(doc! { "_id": 1 }).await?;
        let documents: Vec<BookDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(BookRecord::from).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<BookRecord> {
        let key = parse_object_id(id)?;
        self.books()
            .find_one(doc! { "_id": key })
            .await?
            .map(BookRecord::from)
            .ok_or_else(|| DbError::book_not_found(id))
    }

    async fn update(&self, id: &str, changes: BookChanges) -> Result<BookRecord> {
        let key = parse_object_id(id)?;
        let set = change_set(&changes, OffsetDateTime::now_utc())?;

        self.books()
            .find_one_and_update(doc! { "_id": key }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
            .map(BookRecord::from)
            .ok_or_else(|| DbError::book_not_found(id))
    }

    async fn delete(&self, id: &str) -> Result<BookRecord> {
        let key = parse_object_id(id)?;
        self.books()
            .find_one_and_delete(doc! { "_id": key })
            .await?
            .map(BookRecord::from)
            .ok_or_else(|| DbError::book_not_found(id))
    }
}

#[async_trait]
impl UserRepository for MongoStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord> {
        let document = UserDocument {
            id: ObjectId::new(),
            username: user.username,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };

        match self.users().insert_one(&document).await {
            Ok(_) => Ok(document.into()),
            Err(err) if is_duplicate_key(&err) => Err(DbError::Conflict(format!(
                "username '{}' is already taken",
                document.username
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let user = self
            .users()
            .find_one(doc! { "username": username })
            .await?;
        Ok(user.map(UserRecord::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let key = parse_object_id(id)?;
        let user = self.users().find_one(doc! { "_id": key }).await?;
        Ok(user.map(UserRecord::from))
    }
}
