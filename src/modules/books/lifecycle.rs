//! Book lifecycle engine: validation, borrow/return transitions and fines.
//!
//! The repository underneath is a plain merge-and-store. Everything that
//! keeps `available == false` exactly when `borrowInfo` is set lives here.

use std::sync::Arc;

use libris_db::{BookChanges, BookDraft, BookRecord, BookRepository, BorrowInfo, DbError};
use libris_http::error::AppError;
use libris_kernel::settings::BooksSettings;
use thiserror::Error;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, Duration,
    OffsetDateTime,
};

use super::models::{BookEdit, BookInput, BookOutcome, BorrowerInput};

#[derive(Error, Debug)]
pub enum BookError {
    #[error("{0}")]
    Validation(String),

    #[error("Book not found")]
    NotFound,

    #[error("Invalid book ID format")]
    InvalidIdentifier,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl BookError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<DbError> for BookError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => BookError::NotFound,
            DbError::InvalidIdentifier(_) => BookError::InvalidIdentifier,
            DbError::Conflict(message) => BookError::Conflict(message),
            other => BookError::Internal(other.into()),
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        let message = err.to_string();
        match err {
            BookError::Validation(_) => AppError::validation(vec![], message),
            BookError::NotFound => AppError::not_found(message),
            BookError::InvalidIdentifier => AppError::invalid_identifier(message),
            BookError::Conflict(_) => AppError::conflict(vec![], message),
            BookError::Internal(source) => AppError::Internal(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookError>;

/// Tunables for borrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub grace_period_days: u32,
    pub fine_per_day: u32,
    /// Reject borrowing a borrowed book and returning an available one
    /// instead of overwriting.
    pub strict_transitions: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            grace_period_days: 15,
            fine_per_day: 10,
            strict_transitions: false,
        }
    }
}

impl From<&BooksSettings> for LifecyclePolicy {
    fn from(settings: &BooksSettings) -> Self {
        Self {
            grace_period_days: settings.grace_period_days,
            fine_per_day: settings.fine_per_day,
            strict_transitions: settings.strict_transitions,
        }
    }
}

impl LifecyclePolicy {
    /// Fine owed after keeping a book `days_borrowed` days.
    pub fn fine_for(&self, days_borrowed: i64) -> u32 {
        let overdue = days_borrowed - i64::from(self.grace_period_days);
        if overdue <= 0 {
            return 0;
        }
        let fine = overdue.saturating_mul(i64::from(self.fine_per_day));
        u32::try_from(fine).unwrap_or(u32::MAX)
    }

    pub fn due_date(&self, borrow_date: Date) -> Option<Date> {
        borrow_date.checked_add(Duration::days(i64::from(self.grace_period_days)))
    }
}

/// Parse a calendar date given as `YYYY-MM-DD` or as an RFC 3339 timestamp.
pub fn parse_calendar_date(field: &str, raw: &str) -> Result<Date> {
    let raw = raw.trim();
    if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(date);
    }
    OffsetDateTime::parse(raw, &Rfc3339)
        .map(|timestamp| timestamp.date())
        .map_err(|_| BookError::validation(format!("{field} must be a date like 2024-01-31")))
}

pub struct BookLifecycle {
    books: Arc<dyn BookRepository>,
    policy: LifecyclePolicy,
}

impl BookLifecycle {
    pub fn new(books: Arc<dyn BookRepository>, policy: LifecyclePolicy) -> Self {
        Self { books, policy }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// All books, optionally narrowed to those whose title, author or genre
    /// contains `query` (case-insensitive).
    pub async fn list_books(&self, query: Option<&str>) -> Result<Vec<BookRecord>> {
        let books = self.books.get_all().await?;
        let needle = query.map(str::trim).unwrap_or_default().to_lowercase();
        if needle.is_empty() {
            return Ok(books);
        }

        Ok(books
            .into_iter()
            .filter(|book| {
                [Some(&book.title), Some(&book.author), book.genre.as_ref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect())
    }

    pub async fn get_book(&self, id: &str) -> Result<BookRecord> {
        Ok(self.books.get_by_id(id).await?)
    }

    pub async fn add_book(&self, input: BookInput) -> Result<BookOutcome> {
        let title = required("title", &input.title)?;
        let author = required("author", &input.author)?;

        let book = self
            .books
            .create(BookDraft {
                title,
                author,
                genre: optional(input.genre),
                year: input.year,
                description: optional(input.description),
            })
            .await?;

        tracing::info!(book_id = %book.id, title = %book.title, "book added");
        Ok(BookOutcome::new("Book added successfully", book))
    }

    /// Overwrite any subset of fields, including `available` and
    /// `borrowInfo`, as long as the merged record stays consistent.
    pub async fn edit_book(&self, id: &str, edit: BookEdit) -> Result<BookOutcome> {
        let changes = BookChanges {
            title: edit.title.as_deref().map(|t| required("title", t)).transpose()?,
            author: edit.author.as_deref().map(|a| required("author", a)).transpose()?,
            genre: edit.genre.map(optional),
            year: edit.year,
            description: edit.description.map(optional),
            available: edit.available,
            borrow_info: edit
                .borrow_info
                .map(|info| info.map(borrow_info_from).transpose())
                .transpose()?,
        };

        let mut merged = self.books.get_by_id(id).await?;
        changes.apply_to(&mut merged);
        if !merged.is_consistent() {
            return Err(BookError::validation(
                "A book must have borrower details exactly when it is not available",
            ));
        }

        let book = self.books.update(id, changes).await?;
        tracing::info!(book_id = %book.id, "book updated");
        Ok(BookOutcome::new("Book updated successfully", book))
    }

    pub async fn borrow_book(
        &self,
        id: &str,
        borrower: Option<BorrowerInput>,
    ) -> Result<BookOutcome> {
        let info = borrower
            .map(borrow_info_from)
            .transpose()?
            .ok_or_else(|| BookError::validation("Borrower information is incomplete."))?;

        let current = self.books.get_by_id(id).await?;
        if !current.available {
            if self.policy.strict_transitions {
                return Err(BookError::Conflict("Book is already borrowed".to_string()));
            }
            tracing::warn!(book_id = %id, "borrowing a book that is already out; overwriting borrower");
        }

        let due_date = self.policy.due_date(info.borrow_date);
        let book = self
            .books
            .update(
                id,
                BookChanges {
                    available: Some(false),
                    borrow_info: Some(Some(info)),
                    ..BookChanges::default()
                },
            )
            .await?;

        tracing::info!(book_id = %book.id, "book borrowed");
        let mut outcome = BookOutcome::new("Book borrowed successfully", book);
        outcome.due_date = due_date;
        Ok(outcome)
    }

    pub async fn return_book(&self, id: &str, return_date: Option<Date>) -> Result<BookOutcome> {
        let return_date =
            return_date.ok_or_else(|| BookError::validation("returnDate is required"))?;

        let current = self.books.get_by_id(id).await?;
        let settlement = match &current.borrow_info {
            Some(info) => {
                if return_date < info.borrow_date {
                    return Err(BookError::validation(
                        "Return date cannot be before the borrow date",
                    ));
                }
                let days = (return_date - info.borrow_date).whole_days();
                Some((days, self.policy.fine_for(days)))
            }
            None if self.policy.strict_transitions => {
                return Err(BookError::Conflict(
                    "Book is not currently borrowed".to_string(),
                ));
            }
            None => {
                tracing::warn!(book_id = %id, "return requested for a book that is not borrowed");
                None
            }
        };

        let book = self
            .books
            .update(
                id,
                BookChanges {
                    available: Some(true),
                    borrow_info: Some(None),
                    ..BookChanges::default()
                },
            )
            .await?;

        let (message, fine, days_borrowed) = match settlement {
            Some((days, fine)) if fine > 0 => (
                format!("Book returned after {days} days. Late fine: {fine}"),
                fine,
                Some(days),
            ),
            Some((days, _)) => ("Book returned successfully".to_string(), 0, Some(days)),
            None => ("Book returned successfully".to_string(), 0, None),
        };

        tracing::info!(book_id = %book.id, fine, "book returned");
        let mut outcome = BookOutcome::new(message, book);
        outcome.fine = Some(fine);
        outcome.days_borrowed = days_borrowed;
        Ok(outcome)
    }

    pub async fn delete_book(&self, id: &str) -> Result<BookOutcome> {
        let book = self.books.delete(id).await?;
        tracing::info!(book_id = %book.id, "book deleted");
        Ok(BookOutcome::new("Book deleted successfully", book))
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn borrow_info_from(input: BorrowerInput) -> Result<BorrowInfo> {
    let fields = [
        input.name.trim(),
        input.department.trim(),
        input.section.trim(),
        input.borrow_date.trim(),
    ];
    if fields.iter().any(|field| field.is_empty()) {
        return Err(BookError::validation("Borrower information is incomplete."));
    }
    let [name, department, section, borrow_date] = fields;

    Ok(BorrowInfo {
        name: name.to_string(),
        department: department.to_string(),
        section: section.to_string(),
        borrow_date: parse_calendar_date("borrowDate", borrow_date)?,
    })
}
