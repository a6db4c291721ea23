//! Book catalog service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookInput, BookQuery, Search, UpdateBook},
    repository::Repository,
    rules,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Add a book to the catalog
    pub async fn create(&self, input: BookInput) -> AppResult<Book> {
        let input = input.normalized();
        input.validate()?;

        let book = self.repository.create_book(&input).await?;
        tracing::info!(book_id = %book.id, code = ?book.display_code(), "Book added to catalog");
        Ok(book)
    }

    /// List books, optionally filtered by title, author or code
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let (limit, skip) = rules::page_bounds(query.limit, query.skip);
        let search = Search::new(query.q.as_deref(), limit, skip);
        self.repository.search_books(&search).await
    }

    /// Bounded suggestions matching title, author or code
    pub async fn suggest(&self, q: Option<&str>) -> AppResult<Vec<Book>> {
        let search = Search::new(q, rules::SUGGESTION_LIMIT, 0);
        self.repository.search_books(&search).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.repository.get_book(id).await
    }

    /// Exact lookup by SBIN or stamp
    pub async fn get_by_code(&self, code: &str) -> AppResult<Book> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Validation("book_code: Book code is required".to_string()));
        }
        self.repository.get_book_by_code(code).await
    }

    /// Partial update; the merged record must pass the same checks as a new entry
    pub async fn update(&self, id: Uuid, update: UpdateBook) -> AppResult<Book> {
        let current = self.repository.get_book(id).await?;
        let input = BookInput::merged(&current, update).normalized();
        input.validate()?;
        self.repository.update_book(id, &input).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.delete_book(id).await.inspect_err(|e| {
            if let AppError::Conflict(reason) = e {
                tracing::warn!(book_id = %id, "Delete refused: {}", reason);
            }
        })?;
        tracing::info!(book_id = %id, "Book removed from catalog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::{memory::MemoryRepository, MockLibraryStore};

    fn input(title: &str, sbin: Option<&str>, stamp: Option<&str>) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: None,
            sbin: sbin.map(Into::into),
            stamp: stamp.map(Into::into),
        }
    }

    fn memory_service() -> BooksService {
        BooksService::new(Arc::new(MemoryRepository::new()))
    }

    #[tokio::test]
    async fn test_missing_codes_never_reach_storage() {
        let service = BooksService::new(Arc::new(MockLibraryStore::new()));
        let err = service.create(input("Dune", Some(""), None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_by_code_trims_and_delegates() {
        let mut store = MockLibraryStore::new();
        store
            .expect_get_book_by_code()
            .withf(|code| code.to_string() == "S001")
            .times(1)
            .returning(|_| Err(AppError::NotFound("Book not found".into())));
        let service = BooksService::new(Arc::new(store));

        let err = service.get_by_code("  S001 ").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_code_lookup_rejected() {
        let service = BooksService::new(Arc::new(MockLibraryStore::new()));
        assert!(matches!(
            service.get_by_code("   ").await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_lookup_by_either_code() {
        let service = memory_service();
        let book = service.create(input("Dune", Some("S001"), Some("ST-1"))).await.unwrap();
        assert!(book.available);
        assert_eq!(service.get_by_code("S001").await.unwrap().id, book.id);
        assert_eq!(service.get_by_code("ST-1").await.unwrap().id, book.id);
    }

    #[tokio::test]
    async fn test_update_cannot_drop_last_code() {
        let service = memory_service();
        let book = service.create(input("Dune", Some("S001"), None)).await.unwrap();
        let err = service
            .update(
                book.id,
                UpdateBook {
                    sbin: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_to_taken_code_conflicts() {
        let service = memory_service();
        service.create(input("Dune", Some("S001"), None)).await.unwrap();
        let other = service.create(input("Emma", Some("S002"), None)).await.unwrap();
        let err = service
            .update(
                other.id,
                UpdateBook {
                    stamp: Some("S001".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_suggest_matches_author() {
        let service = memory_service();
        let mut dune = input("Dune", Some("S001"), None);
        dune.author = Some("Frank Herbert".into());
        service.create(dune).await.unwrap();
        service.create(input("Emma", Some("S002"), None)).await.unwrap();

        let hits = service.suggest(Some("herb")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Dune");
        assert_eq!(service.suggest(None).await.unwrap().len(), 2);
    }
}
