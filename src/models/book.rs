//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::rules;

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    /// SBIN lookup code
    pub sbin: Option<String>,
    /// Stamp lookup code
    pub stamp: Option<String>,
    /// False while an active borrow exists
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Code shown to users: the SBIN when present, else the stamp
    pub fn display_code(&self) -> Option<&str> {
        self.sbin.as_deref().or(self.stamp.as_deref())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.sbin.as_deref() == Some(code) || self.stamp.as_deref() == Some(code)
    }
}

/// Catalog entry request. Also the merged shape of an update.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_book_codes"))]
pub struct BookInput {
    #[validate(length(min = 1, max = 300, message = "Title is required (max 300 characters)"))]
    pub title: String,
    #[validate(length(max = 200, message = "Author must be at most 200 characters"))]
    pub author: Option<String>,
    #[validate(length(max = 100, message = "SBIN must be at most 100 characters"))]
    pub sbin: Option<String>,
    #[validate(length(max = 100, message = "Stamp must be at most 100 characters"))]
    pub stamp: Option<String>,
}

fn validate_book_codes(book: &BookInput) -> Result<(), ValidationError> {
    if book.sbin.is_none() && book.stamp.is_none() {
        return Err(ValidationError::new("book_code_missing")
            .with_message("Provide at least SBIN or Stamp code".into()));
    }
    Ok(())
}

impl BookInput {
    /// Trim every field; blank optional fields become absent
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: rules::normalize_optional(self.author),
            sbin: rules::normalize_optional(self.sbin),
            stamp: rules::normalize_optional(self.stamp),
        }
    }

    /// Apply a partial update on top of an existing book.
    /// An empty `sbin`/`stamp` in the update clears that code once normalized.
    pub fn merged(current: &Book, update: UpdateBook) -> Self {
        Self {
            title: update.title.unwrap_or_else(|| current.title.clone()),
            author: update.author.or_else(|| current.author.clone()),
            sbin: update.sbin.or_else(|| current.sbin.clone()),
            stamp: update.stamp.or_else(|| current.stamp.clone()),
        }
    }

    /// Codes this entry would claim
    pub fn codes(&self) -> Vec<&str> {
        self.sbin.iter().chain(self.stamp.iter()).map(String::as_str).collect()
    }
}

/// Update book request; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub sbin: Option<String>,
    pub stamp: Option<String>,
}

/// Book listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive match on title, author, SBIN or stamp
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(sbin: Option<&str>, stamp: Option<&str>) -> BookInput {
        BookInput {
            title: "Dune".into(),
            author: Some("Frank Herbert".into()),
            sbin: sbin.map(Into::into),
            stamp: stamp.map(Into::into),
        }
    }

    #[test]
    fn test_one_code_is_enough() {
        assert!(input(Some("S001"), None).validate().is_ok());
        assert!(input(None, Some("ST-9")).validate().is_ok());
    }

    #[test]
    fn test_missing_codes_rejected() {
        let errors = input(Some("  "), Some("")).normalized().validate().unwrap_err();
        let message = crate::error::AppError::from(errors).to_string();
        assert!(message.contains("Provide at least SBIN or Stamp code"));
    }

    #[test]
    fn test_clearing_one_code_on_update() {
        let current = Book {
            id: Uuid::new_v4(),
            title: "Dune".into(),
            author: None,
            sbin: Some("S001".into()),
            stamp: Some("ST-1".into()),
            available: true,
            created_at: Utc::now(),
        };
        let merged = BookInput::merged(
            &current,
            UpdateBook {
                sbin: Some(String::new()),
                ..Default::default()
            },
        )
        .normalized();
        assert_eq!(merged.sbin, None);
        assert_eq!(merged.codes(), vec!["ST-1"]);
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn test_display_code_prefers_sbin() {
        let mut book = Book {
            id: Uuid::new_v4(),
            title: "Dune".into(),
            author: None,
            sbin: None,
            stamp: Some("ST-1".into()),
            available: true,
            created_at: Utc::now(),
        };
        assert_eq!(book.display_code(), Some("ST-1"));
        book.sbin = Some("S001".into());
        assert_eq!(book.display_code(), Some("S001"));
        assert!(book.has_code("ST-1"));
        assert!(!book.has_code("S002"));
    }
}
