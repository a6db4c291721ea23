//! Book queries

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{like_pattern, unique_violation, PgRepository};
use crate::{
    error::AppResult,
    models::{Book, BookInput, Search},
    repository::{conflict, messages, not_found},
};

/// Reject codes already used by another book, as SBIN or as stamp.
///
/// The per-column unique indexes cannot see a value reused across the two
/// columns, so writers serialize on a table lock that still lets readers through.
async fn ensure_codes_free(
    tx: &mut Transaction<'_, Postgres>,
    codes: Vec<String>,
    except: Uuid,
) -> AppResult<()> {
    sqlx::query("LOCK TABLE books IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut **tx)
        .await?;

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM books WHERE id <> $2 AND (sbin = ANY($1) OR stamp = ANY($1)))",
    )
    .bind(codes)
    .bind(except)
    .fetch_one(&mut **tx)
    .await?;

    if taken {
        return Err(conflict(messages::DUPLICATE_CODE));
    }
    Ok(())
}

fn owned_codes(data: &BookInput) -> Vec<String> {
    data.codes().into_iter().map(str::to_string).collect()
}

impl PgRepository {
    pub(super) async fn books_create(&self, data: &BookInput) -> AppResult<Book> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        ensure_codes_free(&mut tx, owned_codes(data), id).await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, title, author, sbin, stamp, available, created_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.sbin)
        .bind(&data.stamp)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, messages::DUPLICATE_CODE))?;

        tx.commit().await?;
        Ok(book)
    }

    pub(super) async fn books_search(&self, search: &Search) -> AppResult<Vec<Book>> {
        let rows = match search.text.as_deref() {
            Some(text) => {
                sqlx::query_as::<_, Book>(
                    r#"
                    SELECT * FROM books
                    WHERE LOWER(title) LIKE $1
                       OR LOWER(author) LIKE $1
                       OR LOWER(sbin) LIKE $1
                       OR LOWER(stamp) LIKE $1
                    ORDER BY LOWER(title) COLLATE "C", created_at
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(like_pattern(text))
                .bind(search.limit)
                .bind(search.skip)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Book>(
                    r#"SELECT * FROM books ORDER BY LOWER(title) COLLATE "C", created_at LIMIT $1 OFFSET $2"#,
                )
                .bind(search.limit)
                .bind(search.skip)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    pub(super) async fn books_get_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))
    }

    pub(super) async fn books_get_by_code(&self, code: &str) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE sbin = $1 OR stamp = $1 LIMIT 1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))
    }

    pub(super) async fn books_update(&self, id: Uuid, data: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;
        ensure_codes_free(&mut tx, owned_codes(data), id).await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $2, author = $3, sbin = $4, stamp = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.sbin)
        .bind(&data.stamp)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, messages::DUPLICATE_CODE))?
        .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;

        tx.commit().await?;
        Ok(book)
    }

    pub(super) async fn books_delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(messages::BOOK_NOT_FOUND))?;

        let has_active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrows WHERE book_id = $1 AND return_date IS NULL)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_active {
            return Err(conflict(messages::BOOK_ACTIVE_BORROW));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
