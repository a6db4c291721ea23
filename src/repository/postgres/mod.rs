//! PostgreSQL repository

mod books;
mod borrows;
mod students;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use uuid::Uuid;

use super::{conflict, LibraryStore};
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
    models::{
        Book, BookInput, Borrow, BorrowDetails, BorrowFilter, ReturnReceipt, Search, Student,
        StudentInput,
    },
};

/// Repository backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgRepository {
    pool: Pool<Postgres>,
}

impl PgRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a pool using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
    }
}

/// Map a unique-constraint violation to a conflict, anything else to a database error
fn unique_violation(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict(message),
        _ => AppError::Database(err),
    }
}

/// Turn search text into a LIKE pattern, escaping LIKE metacharacters
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl LibraryStore for PgRepository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_student(&self, data: &StudentInput) -> AppResult<Student> {
        self.students_create(data).await
    }

    async fn search_students(&self, search: &Search, match_class_name: bool) -> AppResult<Vec<Student>> {
        self.students_search(search, match_class_name).await
    }

    async fn get_student(&self, id: Uuid) -> AppResult<Student> {
        self.students_get_by_id(id).await
    }

    async fn update_student(&self, id: Uuid, data: &StudentInput) -> AppResult<Student> {
        self.students_update(id, data).await
    }

    async fn delete_student(&self, id: Uuid) -> AppResult<()> {
        self.students_delete(id).await
    }

    async fn create_book(&self, data: &BookInput) -> AppResult<Book> {
        self.books_create(data).await
    }

    async fn search_books(&self, search: &Search) -> AppResult<Vec<Book>> {
        self.books_search(search).await
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.books_get_by_id(id).await
    }

    async fn get_book_by_code(&self, code: &str) -> AppResult<Book> {
        self.books_get_by_code(code).await
    }

    async fn update_book(&self, id: Uuid, data: &BookInput) -> AppResult<Book> {
        self.books_update(id, data).await
    }

    async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.books_delete(id).await
    }

    async fn open_borrow(&self, student_id: Uuid, book_code: &str, now: DateTime<Utc>) -> AppResult<Borrow> {
        self.borrows_open(student_id, book_code, now).await
    }

    async fn close_borrow(&self, book_code: &str, now: DateTime<Utc>) -> AppResult<ReturnReceipt> {
        self.borrows_close(book_code, now).await
    }

    async fn list_borrows(&self, filter: &BorrowFilter, now: DateTime<Utc>) -> AppResult<Vec<BorrowDetails>> {
        self.borrows_list(filter, now).await
    }
}
