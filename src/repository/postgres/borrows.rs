//! Borrow and return transactions

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{unique_violation, PgRepository};
use crate::{
    error::AppResult,
    models::{Book, Borrow, BorrowDetails, BorrowFilter, ReturnReceipt},
    repository::{conflict, messages, not_found},
    rules,
};

/// `borrows` has no `returned` column; it is derived on read
const BORROW_COLUMNS: &str =
    "id, student_id, book_id, borrow_date, due_date, return_date, (return_date IS NOT NULL) AS returned";

impl PgRepository {
    pub(super) async fn borrows_open(
        &self,
        student_id: Uuid,
        book_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        // Share lock: a concurrent delete of this student waits for us
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM students WHERE id = $1 FOR SHARE")
            .bind(student_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(messages::STUDENT_NOT_FOUND))?;

        // Row lock: racing borrows queue here and re-read `available`; a book
        // deleted meanwhile no longer matches and reports not found
        let book = sqlx::query_as::<_, Book>(
            "SELECT * FROM books WHERE sbin = $1 OR stamp = $1 LIMIT 1 FOR UPDATE",
        )
        .bind(book_code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;

        if !book.available {
            return Err(conflict(messages::BOOK_NOT_AVAILABLE));
        }

        sqlx::query("UPDATE books SET available = FALSE WHERE id = $1")
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

        let draft = Borrow::open(student_id, book.id, now);
        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            r#"
            INSERT INTO borrows (id, student_id, book_id, borrow_date, due_date, return_date)
            VALUES ($1, $2, $3, $4, $5, NULL)
            RETURNING {}
            "#,
            BORROW_COLUMNS
        ))
        .bind(draft.id)
        .bind(draft.student_id)
        .bind(draft.book_id)
        .bind(draft.borrow_date)
        .bind(draft.due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, messages::BOOK_NOT_AVAILABLE))?;

        tx.commit().await?;
        Ok(borrow)
    }

    pub(super) async fn borrows_close(&self, book_code: &str, now: DateTime<Utc>) -> AppResult<ReturnReceipt> {
        let mut tx = self.pool.begin().await?;

        let book_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE sbin = $1 OR stamp = $1 LIMIT 1")
            .bind(book_code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;

        // A second return racing this one blocks here, then finds nothing active
        let active = sqlx::query_as::<_, Borrow>(&format!(
            "SELECT {} FROM borrows WHERE book_id = $1 AND return_date IS NULL FOR UPDATE",
            BORROW_COLUMNS
        ))
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| conflict(messages::NO_ACTIVE_BORROW))?;

        let overdue = rules::is_overdue(active.borrow_date, now);

        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            "UPDATE borrows SET return_date = $2 WHERE id = $1 RETURNING {}",
            BORROW_COLUMNS
        ))
        .bind(active.id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        if overdue {
            sqlx::query("UPDATE students SET warnings = warnings + 1 WHERE id = $1")
                .bind(borrow.student_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(ReturnReceipt { borrow, overdue })
    }

    pub(super) async fn borrows_list(&self, filter: &BorrowFilter, now: DateTime<Utc>) -> AppResult<Vec<BorrowDetails>> {
        let rows = sqlx::query_as::<_, BorrowDetails>(
            r#"
            SELECT b.id, b.student_id, b.book_id, b.borrow_date, b.due_date, b.return_date,
                   (b.return_date IS NOT NULL) AS returned,
                   s.name AS student_name,
                   s.admission_number,
                   bk.title AS book_title,
                   COALESCE(bk.sbin, bk.stamp) AS book_code,
                   (b.return_date IS NULL AND b.due_date < $1) AS is_overdue
            FROM borrows b
            LEFT JOIN students s ON s.id = b.student_id
            LEFT JOIN books bk ON bk.id = b.book_id
            WHERE (NOT $2 OR b.return_date IS NULL)
              AND ($3::uuid IS NULL OR b.student_id = $3)
            ORDER BY b.borrow_date DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(now)
        .bind(filter.active_only)
        .bind(filter.student_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
