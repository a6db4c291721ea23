//! In-memory repository
//!
//! Keeps all three tables behind a single mutex. Each trait method takes the
//! lock once and does all of its checks and writes before releasing it, which
//! gives the same atomicity the Postgres backend gets from transactions. The
//! lock is never held across an `.await`.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{conflict, messages, not_found, LibraryStore};
use crate::{
    error::AppResult,
    models::{
        Book, BookInput, Borrow, BorrowDetails, BorrowFilter, ReturnReceipt, Search, Student,
        StudentInput,
    },
    rules,
};

#[derive(Default)]
struct Tables {
    students: IndexMap<Uuid, Student>,
    books: IndexMap<Uuid, Book>,
    borrows: IndexMap<Uuid, Borrow>,
}

impl Tables {
    fn admission_taken(&self, admission_number: &str, except: Option<Uuid>) -> bool {
        self.students
            .values()
            .any(|s| s.admission_number == admission_number && Some(s.id) != except)
    }

    fn code_taken(&self, codes: &[&str], except: Option<Uuid>) -> bool {
        self.books
            .values()
            .filter(|b| Some(b.id) != except)
            .any(|b| codes.iter().any(|code| b.has_code(code)))
    }

    fn book_id_by_code(&self, code: &str) -> Option<Uuid> {
        self.books.values().find(|b| b.has_code(code)).map(|b| b.id)
    }

    fn active_borrow_for_book(&self, book_id: Uuid) -> Option<Uuid> {
        self.borrows
            .values()
            .find(|b| b.book_id == book_id && b.is_active())
            .map(|b| b.id)
    }

    fn has_active_borrow(&self, pred: impl Fn(&Borrow) -> bool) -> bool {
        self.borrows.values().any(|b| b.is_active() && pred(b))
    }
}

/// Store that lives for the lifetime of the process
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, limit: i64, skip: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(skip as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl LibraryStore for MemoryRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn create_student(&self, data: &StudentInput) -> AppResult<Student> {
        let mut tables = self.tables.lock();
        if tables.admission_taken(&data.admission_number, None) {
            return Err(conflict(messages::DUPLICATE_ADMISSION));
        }

        let student = Student {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            admission_number: data.admission_number.clone(),
            class_name: data.class_name.clone(),
            contact: data.contact.clone(),
            section: data.section.clone(),
            warnings: 0,
            created_at: Utc::now(),
        };
        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn search_students(&self, search: &Search, match_class_name: bool) -> AppResult<Vec<Student>> {
        let tables = self.tables.lock();
        let mut found: Vec<Student> = tables
            .students
            .values()
            .filter(|s| match search.text.as_deref() {
                None => true,
                Some(text) => {
                    rules::matches_text(Some(s.name.as_str()), text)
                        || rules::matches_text(Some(s.admission_number.as_str()), text)
                        || (match_class_name && rules::matches_text(s.class_name.as_deref(), text))
                }
            })
            .cloned()
            .collect();
        found.sort_by_key(|s| s.name.to_lowercase());
        Ok(page(found, search.limit, search.skip))
    }

    async fn get_student(&self, id: Uuid) -> AppResult<Student> {
        self.tables
            .lock()
            .students
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(messages::STUDENT_NOT_FOUND))
    }

    async fn update_student(&self, id: Uuid, data: &StudentInput) -> AppResult<Student> {
        let mut tables = self.tables.lock();
        if !tables.students.contains_key(&id) {
            return Err(not_found(messages::STUDENT_NOT_FOUND));
        }
        if tables.admission_taken(&data.admission_number, Some(id)) {
            return Err(conflict(messages::DUPLICATE_ADMISSION));
        }

        let student = tables
            .students
            .get_mut(&id)
            .ok_or_else(|| not_found(messages::STUDENT_NOT_FOUND))?;
        student.name = data.name.clone();
        student.admission_number = data.admission_number.clone();
        student.class_name = data.class_name.clone();
        student.contact = data.contact.clone();
        student.section = data.section.clone();
        Ok(student.clone())
    }

    async fn delete_student(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.lock();
        if !tables.students.contains_key(&id) {
            return Err(not_found(messages::STUDENT_NOT_FOUND));
        }
        if tables.has_active_borrow(|b| b.student_id == id) {
            return Err(conflict(messages::STUDENT_ACTIVE_BORROW));
        }
        tables.students.shift_remove(&id);
        Ok(())
    }

    async fn create_book(&self, data: &BookInput) -> AppResult<Book> {
        let mut tables = self.tables.lock();
        if tables.code_taken(&data.codes(), None) {
            return Err(conflict(messages::DUPLICATE_CODE));
        }

        let book = Book {
            id: Uuid::new_v4(),
            title: data.title.clone(),
            author: data.author.clone(),
            sbin: data.sbin.clone(),
            stamp: data.stamp.clone(),
            available: true,
            created_at: Utc::now(),
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn search_books(&self, search: &Search) -> AppResult<Vec<Book>> {
        let tables = self.tables.lock();
        let mut found: Vec<Book> = tables
            .books
            .values()
            .filter(|b| match search.text.as_deref() {
                None => true,
                Some(text) => {
                    rules::matches_text(Some(b.title.as_str()), text)
                        || rules::matches_text(b.author.as_deref(), text)
                        || rules::matches_text(b.sbin.as_deref(), text)
                        || rules::matches_text(b.stamp.as_deref(), text)
                }
            })
            .cloned()
            .collect();
        found.sort_by_key(|b| b.title.to_lowercase());
        Ok(page(found, search.limit, search.skip))
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.tables
            .lock()
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))
    }

    async fn get_book_by_code(&self, code: &str) -> AppResult<Book> {
        self.tables
            .lock()
            .books
            .values()
            .find(|b| b.has_code(code))
            .cloned()
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))
    }

    async fn update_book(&self, id: Uuid, data: &BookInput) -> AppResult<Book> {
        let mut tables = self.tables.lock();
        if !tables.books.contains_key(&id) {
            return Err(not_found(messages::BOOK_NOT_FOUND));
        }
        if tables.code_taken(&data.codes(), Some(id)) {
            return Err(conflict(messages::DUPLICATE_CODE));
        }

        let book = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;
        book.title = data.title.clone();
        book.author = data.author.clone();
        book.sbin = data.sbin.clone();
        book.stamp = data.stamp.clone();
        Ok(book.clone())
    }

    async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.lock();
        if !tables.books.contains_key(&id) {
            return Err(not_found(messages::BOOK_NOT_FOUND));
        }
        if tables.has_active_borrow(|b| b.book_id == id) {
            return Err(conflict(messages::BOOK_ACTIVE_BORROW));
        }
        tables.books.shift_remove(&id);
        Ok(())
    }

    async fn open_borrow(&self, student_id: Uuid, book_code: &str, now: DateTime<Utc>) -> AppResult<Borrow> {
        let mut tables = self.tables.lock();
        if !tables.students.contains_key(&student_id) {
            return Err(not_found(messages::STUDENT_NOT_FOUND));
        }
        let book_id = tables
            .book_id_by_code(book_code)
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;

        let book = tables
            .books
            .get_mut(&book_id)
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;
        if !book.available {
            return Err(conflict(messages::BOOK_NOT_AVAILABLE));
        }
        book.available = false;

        let borrow = Borrow::open(student_id, book_id, now);
        tables.borrows.insert(borrow.id, borrow.clone());
        Ok(borrow)
    }

    async fn close_borrow(&self, book_code: &str, now: DateTime<Utc>) -> AppResult<ReturnReceipt> {
        let mut tables = self.tables.lock();
        let book_id = tables
            .book_id_by_code(book_code)
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;
        let borrow_id = tables
            .active_borrow_for_book(book_id)
            .ok_or_else(|| conflict(messages::NO_ACTIVE_BORROW))?;

        let borrow = tables
            .borrows
            .get_mut(&borrow_id)
            .ok_or_else(|| conflict(messages::NO_ACTIVE_BORROW))?;
        let overdue = borrow.close(now);
        let borrow = borrow.clone();

        if let Some(book) = tables.books.get_mut(&book_id) {
            book.available = true;
        }
        if overdue {
            if let Some(student) = tables.students.get_mut(&borrow.student_id) {
                student.warnings += 1;
            }
        }

        Ok(ReturnReceipt { borrow, overdue })
    }

    async fn list_borrows(&self, filter: &BorrowFilter, now: DateTime<Utc>) -> AppResult<Vec<BorrowDetails>> {
        let tables = self.tables.lock();
        let mut found: Vec<&Borrow> = tables
            .borrows
            .values()
            .filter(|b| !filter.active_only || b.is_active())
            .filter(|b| filter.student_id.map_or(true, |id| b.student_id == id))
            .collect();
        found.sort_by_key(|b| Reverse(b.borrow_date));

        let details = found
            .into_iter()
            .map(|b| {
                let student = tables.students.get(&b.student_id);
                let book = tables.books.get(&b.book_id);
                BorrowDetails {
                    borrow: b.clone(),
                    student_name: student.map(|s| s.name.clone()),
                    admission_number: student.map(|s| s.admission_number.clone()),
                    book_title: book.map(|bk| bk.title.clone()),
                    book_code: book.and_then(|bk| bk.display_code().map(str::to_string)),
                    is_overdue: b.is_active() && rules::is_late(b.due_date, now),
                }
            })
            .collect();
        Ok(page(details, filter.limit, filter.skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn student(admission_number: &str) -> StudentInput {
        StudentInput {
            name: format!("Student {}", admission_number),
            admission_number: admission_number.to_string(),
            class_name: Some("5B".into()),
            contact: None,
            section: None,
        }
    }

    fn book(title: &str, sbin: Option<&str>, stamp: Option<&str>) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: None,
            sbin: sbin.map(Into::into),
            stamp: stamp.map(Into::into),
        }
    }

    fn all() -> Search {
        Search::new(None, 100, 0)
    }

    #[tokio::test]
    async fn test_duplicate_admission_number() {
        let repo = MemoryRepository::new();
        repo.create_student(&student("A12345")).await.unwrap();
        let err = repo.create_student(&student("A12345")).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_codes_unique_across_schemes() {
        let repo = MemoryRepository::new();
        repo.create_book(&book("Dune", Some("S001"), None)).await.unwrap();
        // The same value used as a stamp would make by-code lookups ambiguous
        let err = repo.create_book(&book("Emma", None, Some("S001"))).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_book_may_keep_its_own_codes() {
        let repo = MemoryRepository::new();
        let created = repo.create_book(&book("Dune", Some("S001"), Some("ST-1"))).await.unwrap();
        let updated = repo
            .update_book(created.id, &book("Dune Messiah", Some("S001"), Some("ST-1")))
            .await
            .unwrap();
        assert_eq!(updated.title, "Dune Messiah");
    }

    #[tokio::test]
    async fn test_borrow_cycle_with_warning() {
        let repo = MemoryRepository::new();
        let s = repo.create_student(&student("A12345")).await.unwrap();
        let b = repo.create_book(&book("Dune", Some("S001"), None)).await.unwrap();
        let start = Utc::now();

        let borrow = repo.open_borrow(s.id, "S001", start).await.unwrap();
        assert_eq!(borrow.book_id, b.id);
        assert!(!repo.get_book(b.id).await.unwrap().available);

        let second = repo.open_borrow(s.id, "S001", start).await.unwrap_err();
        assert!(matches!(second, crate::error::AppError::Conflict(_)));

        let receipt = repo.close_borrow("S001", start + Duration::days(8)).await.unwrap();
        assert!(receipt.overdue);
        assert!(receipt.borrow.returned);
        assert!(repo.get_book(b.id).await.unwrap().available);
        assert_eq!(repo.get_student(s.id).await.unwrap().warnings, 1);

        let again = repo.close_borrow("S001", start + Duration::days(9)).await.unwrap_err();
        assert!(matches!(again, crate::error::AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_guards() {
        let repo = MemoryRepository::new();
        let s = repo.create_student(&student("A12345")).await.unwrap();
        let b = repo.create_book(&book("Dune", None, Some("ST-1"))).await.unwrap();
        repo.open_borrow(s.id, "ST-1", Utc::now()).await.unwrap();

        assert!(repo.delete_student(s.id).await.is_err());
        assert!(repo.delete_book(b.id).await.is_err());

        repo.close_borrow("ST-1", Utc::now()).await.unwrap();
        repo.delete_student(s.id).await.unwrap();
        repo.delete_book(b.id).await.unwrap();
        assert!(repo.search_students(&all(), true).await.unwrap().is_empty());
        assert!(repo.search_books(&all()).await.unwrap().is_empty());

        // History survives the deletion
        let filter = BorrowFilter {
            active_only: false,
            student_id: None,
            limit: 10,
            skip: 0,
        };
        let history = repo.list_borrows(&filter, Utc::now()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].student_name, None);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let repo = MemoryRepository::new();
        repo.create_book(&book("zebra tales", Some("S1"), None)).await.unwrap();
        repo.create_book(&book("Animal Farm", Some("S2"), None)).await.unwrap();
        repo.create_book(&book("The Hobbit", Some("S3"), None)).await.unwrap();

        let titles: Vec<String> = repo
            .search_books(&all())
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Animal Farm", "The Hobbit", "zebra tales"]);

        let hits = repo.search_books(&Search::new(Some("HOBB"), 10, 0)).await.unwrap();
        assert_eq!(hits.len(), 1);

        let paged = repo.search_books(&Search::new(None, 1, 1)).await.unwrap();
        assert_eq!(paged[0].title, "The Hobbit");
    }

    #[tokio::test]
    async fn test_class_name_only_matches_when_asked() {
        let repo = MemoryRepository::new();
        repo.create_student(&student("A12345")).await.unwrap();
        let search = Search::new(Some("5b"), 10, 0);
        assert_eq!(repo.search_students(&search, true).await.unwrap().len(), 1);
        assert!(repo.search_students(&search, false).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_claim_book_once() {
        let repo = std::sync::Arc::new(MemoryRepository::new());
        let student_id = repo.create_student(&student("C12345")).await.unwrap().id;
        repo.create_book(&book("Dune", Some("S001"), None)).await.unwrap();

        let now = Utc::now();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.open_borrow(student_id, "S001", now).await })
            })
            .collect();

        let mut claimed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => claimed += 1,
                Err(err) => assert!(matches!(err, crate::error::AppError::Conflict(_)), "{:?}", err),
            }
        }
        assert_eq!(claimed, 1);

        let filter = BorrowFilter {
            active_only: true,
            student_id: None,
            limit: 100,
            skip: 0,
        };
        assert_eq!(repo.list_borrows(&filter, now).await.unwrap().len(), 1);
    }
}
