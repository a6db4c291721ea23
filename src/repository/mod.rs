//! Repository layer: storage-agnostic access to students, books and borrows
//!
//! Two interchangeable backends implement [`LibraryStore`]:
//!
//! - [`postgres::PgRepository`]: relational storage through `sqlx`
//! - [`memory::MemoryRepository`]: in-process tables behind a single lock
//!
//! Every operation that must hold a cross-request invariant (one active borrow
//! per book, unique codes, the delete guard, the warning increment) runs inside
//! one transaction or one lock scope of the backend.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookInput, Borrow, BorrowDetails, BorrowFilter, ReturnReceipt, Search, Student,
        StudentInput,
    },
};

/// Shared handle to the configured store
pub type Repository = Arc<dyn LibraryStore>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Short backend name reported by the health endpoint
    fn backend_name(&self) -> &'static str;

    /// Check that the backend is reachable
    async fn ping(&self) -> AppResult<()>;

    // Students

    async fn create_student(&self, data: &StudentInput) -> AppResult<Student>;

    /// Students ordered by name. `match_class_name` widens the text match to the class.
    async fn search_students(&self, search: &Search, match_class_name: bool) -> AppResult<Vec<Student>>;

    async fn get_student(&self, id: Uuid) -> AppResult<Student>;

    async fn update_student(&self, id: Uuid, data: &StudentInput) -> AppResult<Student>;

    /// Delete a student unless it has an active borrow
    async fn delete_student(&self, id: Uuid) -> AppResult<()>;

    // Books

    async fn create_book(&self, data: &BookInput) -> AppResult<Book>;

    /// Books ordered by title, matching title, author, SBIN or stamp
    async fn search_books(&self, search: &Search) -> AppResult<Vec<Book>>;

    async fn get_book(&self, id: Uuid) -> AppResult<Book>;

    async fn get_book_by_code(&self, code: &str) -> AppResult<Book>;

    async fn update_book(&self, id: Uuid, data: &BookInput) -> AppResult<Book>;

    /// Delete a book unless it is currently borrowed
    async fn delete_book(&self, id: Uuid) -> AppResult<()>;

    // Borrows

    /// Atomically claim an available book and record the borrow
    async fn open_borrow(&self, student_id: Uuid, book_code: &str, now: DateTime<Utc>) -> AppResult<Borrow>;

    /// Atomically close the active borrow of a book, release it and apply overdue warnings
    async fn close_borrow(&self, book_code: &str, now: DateTime<Utc>) -> AppResult<ReturnReceipt>;

    /// Borrows newest first; `now` decides the `is_overdue` flag
    async fn list_borrows(&self, filter: &BorrowFilter, now: DateTime<Utc>) -> AppResult<Vec<BorrowDetails>>;
}

/// Error messages shared by every backend so clients see identical text
pub(crate) mod messages {
    pub const STUDENT_NOT_FOUND: &str = "Student not found";
    pub const BOOK_NOT_FOUND: &str = "Book not found";
    pub const DUPLICATE_ADMISSION: &str = "Admission number already exists";
    pub const DUPLICATE_CODE: &str = "Duplicate SBIN or Stamp code";
    pub const STUDENT_ACTIVE_BORROW: &str = "Student has active borrow";
    pub const BOOK_ACTIVE_BORROW: &str = "Book is currently borrowed";
    pub const BOOK_NOT_AVAILABLE: &str = "Book is not available";
    pub const NO_ACTIVE_BORROW: &str = "No active borrow for this book";
}

pub(crate) fn not_found(message: &str) -> AppError {
    AppError::NotFound(message.to_string())
}

pub(crate) fn conflict(message: &str) -> AppError {
    AppError::Conflict(message.to_string())
}
