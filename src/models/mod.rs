//! Data models for BiblioFlow

pub mod book;
pub mod borrow;
pub mod student;

// Re-export commonly used types
pub use book::{Book, BookInput, BookQuery, UpdateBook};
pub use borrow::{Borrow, BorrowDetails, BorrowFilter, BorrowQuery, ReturnReceipt};
pub use student::{Student, StudentInput, StudentQuery, UpdateStudent};

/// Normalized text search handed to the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    /// Lowercased, trimmed search text; `None` matches everything
    pub text: Option<String>,
    pub limit: i64,
    pub skip: i64,
}

impl Search {
    pub fn new(q: Option<&str>, limit: i64, skip: i64) -> Self {
        let text = q
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        Self { text, limit, skip }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_normalizes_text() {
        assert_eq!(Search::new(Some("  HoB "), 10, 0).text.as_deref(), Some("hob"));
        assert_eq!(Search::new(Some("   "), 10, 0).text, None);
        assert_eq!(Search::new(None, 10, 0).text, None);
    }
}
