//! Library business rules shared by every storage backend
//!
//! Both the Postgres and the in-memory repositories call into this module for
//! due dates and overdue decisions, and the request models use it for
//! admission-number validation, so all backends accept and reject exactly the
//! same inputs.

use chrono::{DateTime, Duration, Utc};
use validator::ValidationError;

/// Exact length of a student admission number, in characters
pub const ADMISSION_NUMBER_LEN: usize = 6;

/// Loan period in days; a return later than this many whole days is overdue
pub const LOAN_PERIOD_DAYS: i64 = 7;

/// Maximum number of entries returned by suggestion endpoints
pub const SUGGESTION_LIMIT: i64 = 10;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Due date of a borrow started at `borrow_date`
pub fn due_date(borrow_date: DateTime<Utc>) -> DateTime<Utc> {
    borrow_date + Duration::days(LOAN_PERIOD_DAYS)
}

/// Whether returning at `returned_at` a book borrowed at `borrow_date` earns a warning.
///
/// Only whole elapsed days count: 7 days and 23 hours is still on time.
pub fn is_overdue(borrow_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> bool {
    (returned_at - borrow_date).num_days() > LOAN_PERIOD_DAYS
}

/// Whether an active borrow is already past its due date
pub fn is_late(due_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > due_date
}

pub fn is_valid_admission_number(value: &str) -> bool {
    value.chars().count() == ADMISSION_NUMBER_LEN
}

/// `validator` hook for admission numbers
pub fn validate_admission_number(value: &str) -> Result<(), ValidationError> {
    if is_valid_admission_number(value) {
        Ok(())
    } else {
        Err(ValidationError::new("admission_number_length")
            .with_message(format!("Admission number must be {} characters", ADMISSION_NUMBER_LEN).into()))
    }
}

/// Trim an optional text field; blank values become `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Clamp user-supplied paging parameters into `(limit, skip)`
pub fn page_bounds(limit: Option<i64>, skip: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let skip = skip.unwrap_or(0).max(0);
    (limit, skip)
}

/// Case-insensitive substring match used by in-memory search
pub fn matches_text(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle_lower))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_due_date_is_one_week_later() {
        assert_eq!(due_date(at(1, 10)), at(8, 10));
    }

    #[test]
    fn test_overdue_boundary() {
        let borrowed = at(1, 10);
        assert!(!is_overdue(borrowed, at(1, 12)));
        assert!(!is_overdue(borrowed, at(8, 10)));
        // 7 days 23 hours still counts as 7 whole days
        assert!(!is_overdue(borrowed, at(9, 9)));
        assert!(is_overdue(borrowed, at(9, 10)));
        assert!(is_overdue(borrowed, at(20, 0)));
    }

    #[test]
    fn test_is_late() {
        let due = at(8, 10);
        assert!(!is_late(due, at(8, 10)));
        assert!(is_late(due, at(8, 11)));
    }

    #[test]
    fn test_admission_number_length() {
        assert!(is_valid_admission_number("A12345"));
        assert!(!is_valid_admission_number("A1234"));
        assert!(!is_valid_admission_number("A123456"));
        assert!(!is_valid_admission_number(""));
        // counted in characters, not bytes
        assert!(is_valid_admission_number("ÉÈ1234"));
    }

    #[test]
    fn test_validate_admission_number_message() {
        let err = validate_admission_number("abc").unwrap_err();
        assert_eq!(err.message.unwrap(), "Admission number must be 6 characters");
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(Some(" S001 ".into())), Some("S001".to_string()));
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(None, None), (50, 0));
        assert_eq!(page_bounds(Some(500), Some(-3)), (100, 0));
        assert_eq!(page_bounds(Some(0), Some(20)), (1, 20));
    }

    #[test]
    fn test_matches_text() {
        assert!(matches_text(Some("The Hobbit"), "hob"));
        assert!(!matches_text(Some("The Hobbit"), "ring"));
        assert!(!matches_text(None, "x"));
    }
}
