//! Stored record shapes for books and users.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Borrower details attached to a book while it is out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowInfo {
    #[serde(alias = "borrowerName")]
    pub name: String,
    pub department: String,
    pub section: String,
    #[serde(with = "iso_date")]
    pub borrow_date: Date,
}

/// A book as stored and as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub available: bool,
    pub borrow_info: Option<BorrowInfo>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BookRecord {
    /// `available == false` exactly when borrower details are present.
    pub fn is_consistent(&self) -> bool {
        self.available == self.borrow_info.is_none()
    }
}

/// Fields needed to create a book. Already validated by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
}

/// Fields to merge into a stored book. `None` leaves the field untouched.
///
/// Nullable fields distinguish "not given" (`None`) from "clear it"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<Option<String>>,
    pub year: Option<Option<i32>>,
    pub description: Option<Option<String>>,
    pub available: Option<bool>,
    pub borrow_info: Option<Option<BorrowInfo>>,
}

impl BookChanges {
    /// Merge into `record` in place. Timestamps are left to the repository.
    pub fn apply_to(&self, record: &mut BookRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(author) = &self.author {
            record.author = author.clone();
        }
        if let Some(genre) = &self.genre {
            record.genre = genre.clone();
        }
        if let Some(year) = self.year {
            record.year = year;
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(available) = self.available {
            record.available = available;
        }
        if let Some(borrow_info) = &self.borrow_info {
            record.borrow_info = borrow_info.clone();
        }
    }
}

/// A registered account. Never serialized to clients as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Account data handed to [`crate::UserRepository::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}
