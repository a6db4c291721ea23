//! Borrow model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::rules;

/// Borrow record. Active while `return_date` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub book_id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    /// Derived from `return_date`
    pub returned: bool,
}

impl Borrow {
    /// Open a new borrow starting at `now`
    pub fn open(student_id: Uuid, book_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            book_id,
            borrow_date: now,
            due_date: rules::due_date(now),
            return_date: None,
            returned: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    /// Close the borrow at `now`, returning whether the return is overdue
    pub fn close(&mut self, now: DateTime<Utc>) -> bool {
        self.return_date = Some(now);
        self.returned = true;
        rules::is_overdue(self.borrow_date, now)
    }
}

/// Borrow joined with the student and book it references, for listings
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BorrowDetails {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub borrow: Borrow,
    pub student_name: Option<String>,
    pub admission_number: Option<String>,
    pub book_title: Option<String>,
    pub book_code: Option<String>,
    /// Active and past its due date
    pub is_overdue: bool,
}

/// Result of a return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    #[serde(flatten)]
    pub borrow: Borrow,
    /// True when the return was late and a warning was added to the student
    pub overdue: bool,
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub student_id: Uuid,
    /// SBIN or stamp code of the book
    pub book_code: String,
}

/// Return request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnRequest {
    /// SBIN or stamp code of the book
    pub book_code: String,
}

/// Borrow listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowQuery {
    /// Only unreturned borrows (default true)
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

/// Normalized borrow listing filter handed to the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowFilter {
    pub active_only: bool,
    pub student_id: Option<Uuid>,
    pub limit: i64,
    pub skip: i64,
}

impl BorrowFilter {
    pub fn from_query(query: &BorrowQuery, student_id: Option<Uuid>) -> Self {
        let (limit, skip) = rules::page_bounds(query.limit, query.skip);
        Self {
            active_only: query.active.unwrap_or(true),
            student_id,
            limit,
            skip,
        }
    }
}
