//! HTTP handlers for `/api/books`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRef, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use libris_authz::{authenticate_headers, AuthService, CurrentUser};
use libris_db::BookRecord;
use libris_http::error::AppError;
use time::OffsetDateTime;

use super::lifecycle::{parse_calendar_date, BookLifecycle};
use super::models::{BookEdit, BookInput, BookOutcome, BorrowRequest, ListQuery, ReturnRequest};

#[derive(Clone)]
pub struct BooksState {
    pub lifecycle: Arc<BookLifecycle>,
    pub auth: Arc<AuthService>,
    pub public_listing: bool,
}

impl FromRef<BooksState> for Arc<AuthService> {
    fn from_ref(state: &BooksState) -> Self {
        state.auth.clone()
    }
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(edit_book).delete(delete_book),
        )
        .route("/{id}/borrow", put(borrow_book))
        .route("/{id}/return", put(return_book))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(state): State<BooksState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookRecord>>, AppError> {
    if !state.public_listing {
        authenticate_headers(&state.auth, &headers).await?;
    }
    let books = state.lifecycle.list_books(query.q.as_deref()).await?;
    Ok(Json(books))
}

async fn get_book(
    State(state): State<BooksState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<BookRecord>, AppError> {
    Ok(Json(state.lifecycle.get_book(&id).await?))
}

async fn add_book(
    State(state): State<BooksState>,
    user: CurrentUser,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<BookOutcome>), AppError> {
    let Json(input) = payload?;
    let outcome = state.lifecycle.add_book(input).await?;
    tracing::debug!(user_id = %user.id(), book_id = %outcome.book.id, "book created via API");
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn edit_book(
    State(state): State<BooksState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<BookEdit>, JsonRejection>,
) -> Result<Json<BookOutcome>, AppError> {
    let Json(edit) = payload?;
    Ok(Json(state.lifecycle.edit_book(&id, edit).await?))
}

async fn delete_book(
    State(state): State<BooksState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<BookOutcome>, AppError> {
    Ok(Json(state.lifecycle.delete_book(&id).await?))
}

async fn borrow_book(
    State(state): State<BooksState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<BorrowRequest>, JsonRejection>,
) -> Result<Json<BookOutcome>, AppError> {
    let Json(request) = payload?;
    Ok(Json(state.lifecycle.borrow_book(&id, request.borrow_info).await?))
}

/// The body is optional here; without a `returnDate` the book comes back
/// today (UTC).
async fn return_book(
    State(state): State<BooksState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<BookOutcome>, AppError> {
    let request: ReturnRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ReturnRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| AppError::BadRequest {
            message: format!("Failed to parse the request body as JSON: {err}"),
            code: "invalid_body".to_string(),
        })?
    };

    let return_date = match request.return_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_calendar_date("returnDate", raw)?,
        _ => OffsetDateTime::now_utc().date(),
    };

    Ok(Json(
        state.lifecycle.return_book(&id, Some(return_date)).await?,
    ))
}
