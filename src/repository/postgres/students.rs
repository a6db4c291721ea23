//! Student queries

use chrono::Utc;
use uuid::Uuid;

use super::{like_pattern, unique_violation, PgRepository};
use crate::{
    error::AppResult,
    models::{Search, Student, StudentInput},
    repository::{conflict, messages, not_found},
};

impl PgRepository {
    pub(super) async fn students_create(&self, data: &StudentInput) -> AppResult<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (id, name, admission_number, class_name, contact, section, warnings, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.admission_number)
        .bind(&data.class_name)
        .bind(&data.contact)
        .bind(&data.section)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, messages::DUPLICATE_ADMISSION))
    }

    pub(super) async fn students_search(&self, search: &Search, match_class_name: bool) -> AppResult<Vec<Student>> {
        let rows = match search.text.as_deref() {
            Some(text) => {
                let class_clause = if match_class_name {
                    " OR LOWER(class_name) LIKE $1"
                } else {
                    ""
                };
                let query = format!(
                    r#"
                    SELECT * FROM students
                    WHERE LOWER(name) LIKE $1 OR LOWER(admission_number) LIKE $1{}
                    ORDER BY LOWER(name) COLLATE "C", created_at
                    LIMIT $2 OFFSET $3
                    "#,
                    class_clause
                );
                sqlx::query_as::<_, Student>(&query)
                    .bind(like_pattern(text))
                    .bind(search.limit)
                    .bind(search.skip)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Student>(
                    r#"SELECT * FROM students ORDER BY LOWER(name) COLLATE "C", created_at LIMIT $1 OFFSET $2"#,
                )
                .bind(search.limit)
                .bind(search.skip)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    pub(super) async fn students_get_by_id(&self, id: Uuid) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(messages::STUDENT_NOT_FOUND))
    }

    pub(super) async fn students_update(&self, id: Uuid, data: &StudentInput) -> AppResult<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET name = $2, admission_number = $3, class_name = $4, contact = $5, section = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.admission_number)
        .bind(&data.class_name)
        .bind(&data.contact)
        .bind(&data.section)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, messages::DUPLICATE_ADMISSION))?
        .ok_or_else(|| not_found(messages::STUDENT_NOT_FOUND))
    }

    /// The row lock makes a concurrent borrow (which takes a share lock on the
    /// student) either finish first and block the delete, or wait for it.
    pub(super) async fn students_delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM students WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(messages::STUDENT_NOT_FOUND))?;

        let has_active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrows WHERE student_id = $1 AND return_date IS NULL)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_active {
            return Err(conflict(messages::STUDENT_ACTIVE_BORROW));
        }

        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
