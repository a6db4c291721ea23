//! Borrow and return service

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{BorrowRequest, ReturnRequest},
        Borrow, BorrowDetails, BorrowFilter, BorrowQuery, ReturnReceipt,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
}

fn required_code(code: &str) -> AppResult<&str> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::Validation("book_code: Book code is required".to_string()));
    }
    Ok(code)
}

impl BorrowsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lend a book to a student now
    pub async fn borrow(&self, request: &BorrowRequest) -> AppResult<Borrow> {
        self.borrow_at(request, Utc::now()).await
    }

    /// Lend a book to a student at the given instant
    pub async fn borrow_at(&self, request: &BorrowRequest, now: DateTime<Utc>) -> AppResult<Borrow> {
        let code = required_code(&request.book_code)?;
        let borrow = self
            .repository
            .open_borrow(request.student_id, code, now)
            .await
            .inspect_err(|e| {
                if let AppError::Conflict(reason) = e {
                    tracing::warn!(student_id = %request.student_id, book_code = %code, "Borrow refused: {}", reason);
                }
            })?;
        tracing::info!(
            borrow_id = %borrow.id,
            student_id = %borrow.student_id,
            book_code = %code,
            due_date = %borrow.due_date,
            "Book borrowed"
        );
        Ok(borrow)
    }

    /// Take a book back now
    pub async fn return_book(&self, request: &ReturnRequest) -> AppResult<ReturnReceipt> {
        self.return_book_at(request, Utc::now()).await
    }

    /// Take a book back at the given instant, warning the student when it is overdue
    pub async fn return_book_at(&self, request: &ReturnRequest, now: DateTime<Utc>) -> AppResult<ReturnReceipt> {
        let code = required_code(&request.book_code)?;
        let receipt = self.repository.close_borrow(code, now).await?;
        if receipt.overdue {
            tracing::warn!(
                borrow_id = %receipt.borrow.id,
                student_id = %receipt.borrow.student_id,
                "Overdue return, warning added to student"
            );
        } else {
            tracing::info!(borrow_id = %receipt.borrow.id, book_code = %code, "Book returned");
        }
        Ok(receipt)
    }

    /// Borrows newest first, active only unless asked otherwise
    pub async fn list(&self, query: &BorrowQuery) -> AppResult<Vec<BorrowDetails>> {
        let filter = BorrowFilter::from_query(query, None);
        self.repository.list_borrows(&filter, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::{
        models::{BookInput, StudentInput},
        repository::{memory::MemoryRepository, LibraryStore, MockLibraryStore},
    };

    async fn seeded() -> (Arc<MemoryRepository>, Uuid) {
        let repo = Arc::new(MemoryRepository::new());
        let student = repo
            .create_student(&StudentInput {
                name: "Ada".into(),
                admission_number: "A12345".into(),
                class_name: None,
                contact: None,
                section: None,
            })
            .await
            .unwrap();
        repo.create_book(&BookInput {
            title: "Dune".into(),
            author: None,
            sbin: Some("S001".into()),
            stamp: None,
        })
        .await
        .unwrap();
        (repo, student.id)
    }

    fn borrow_request(student_id: Uuid) -> BorrowRequest {
        BorrowRequest {
            student_id,
            book_code: "S001".into(),
        }
    }

    fn return_request() -> ReturnRequest {
        ReturnRequest {
            book_code: " S001 ".into(),
        }
    }

    #[tokio::test]
    async fn test_return_within_loan_period_keeps_warnings() {
        let (repo, student_id) = seeded().await;
        let service = BorrowsService::new(repo.clone());
        let start = Utc::now();

        service.borrow_at(&borrow_request(student_id), start).await.unwrap();
        let receipt = service
            .return_book_at(&return_request(), start + Duration::days(7))
            .await
            .unwrap();

        assert!(!receipt.overdue);
        assert_eq!(repo.get_student(student_id).await.unwrap().warnings, 0);
    }

    #[tokio::test]
    async fn test_return_after_eight_days_adds_one_warning() {
        let (repo, student_id) = seeded().await;
        let service = BorrowsService::new(repo.clone());
        let start = Utc::now();

        let borrow = service.borrow_at(&borrow_request(student_id), start).await.unwrap();
        assert_eq!(borrow.due_date, start + Duration::days(7));

        let receipt = service
            .return_book_at(&return_request(), start + Duration::days(8))
            .await
            .unwrap();

        assert!(receipt.overdue);
        assert_eq!(receipt.borrow.return_date, Some(start + Duration::days(8)));
        assert_eq!(repo.get_student(student_id).await.unwrap().warnings, 1);
    }

    #[tokio::test]
    async fn test_second_borrow_conflicts() {
        let (repo, student_id) = seeded().await;
        let service = BorrowsService::new(repo.clone());

        service.borrow(&borrow_request(student_id)).await.unwrap();
        let err = service.borrow(&borrow_request(student_id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let active = service.list(&BorrowQuery::default()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].book_code.as_deref(), Some("S001"));
        assert_eq!(active[0].student_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_unknown_student_or_book() {
        let (repo, student_id) = seeded().await;
        let service = BorrowsService::new(repo);

        let err = service.borrow(&borrow_request(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .borrow(&BorrowRequest {
                student_id,
                book_code: "NOPE".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_return_without_active_borrow_conflicts() {
        let (repo, _) = seeded().await;
        let service = BorrowsService::new(repo);
        let err = service.return_book(&return_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_includes_history_on_request() {
        let (repo, student_id) = seeded().await;
        let service = BorrowsService::new(repo);
        service.borrow(&borrow_request(student_id)).await.unwrap();
        service.return_book(&return_request()).await.unwrap();

        assert!(service.list(&BorrowQuery::default()).await.unwrap().is_empty());
        let all = service
            .list(&BorrowQuery {
                active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].borrow.returned);
    }

    #[tokio::test]
    async fn test_blank_code_never_reaches_storage() {
        let service = BorrowsService::new(Arc::new(MockLibraryStore::new()));
        let err = service
            .return_book(&ReturnRequest {
                book_code: "  ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
