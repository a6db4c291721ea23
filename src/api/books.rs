//! Book catalog endpoints

use axum::{extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Book, BookInput, BookQuery, UpdateBook},
};

use super::{
    extract::{Json, Path, Query},
    DeletedResponse, SuggestQuery,
};

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.books.list(&query).await?;
    Ok(Json(books))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get(id).await?;
    Ok(Json(book))
}

/// Get book by SBIN or stamp code
#[utoipa::path(
    get,
    path = "/books/by-code/{code}",
    tag = "books",
    params(("code" = String, Path, description = "SBIN or stamp code")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book_by_code(
    State(state): State<crate::AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get_by_code(&code).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Duplicate SBIN or stamp code", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    Json(input): Json<BookInput>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.books.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Duplicate SBIN or stamp code", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    let updated = state.services.books.update(id, update).await?;
    Ok(Json(updated))
}

/// Delete a book that is not borrowed
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = DeletedResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is currently borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeletedResponse>> {
    state.services.books.delete(id).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

/// Book suggestions for search widgets
#[utoipa::path(
    get,
    path = "/suggest/books",
    tag = "suggest",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Up to 10 matching books", body = Vec<Book>)
    )
)]
pub async fn suggest_books(
    State(state): State<crate::AppState>,
    Query(query): Query<SuggestQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.books.suggest(query.q.as_deref()).await?;
    Ok(Json(books))
}
