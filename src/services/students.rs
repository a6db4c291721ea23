//! Student registration and management service

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        BorrowDetails, BorrowFilter, BorrowQuery, Search, Student, StudentInput, StudentQuery,
        UpdateStudent,
    },
    repository::Repository,
    rules,
};

#[derive(Clone)]
pub struct StudentsService {
    repository: Repository,
}

impl StudentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a new student
    pub async fn create(&self, input: StudentInput) -> AppResult<Student> {
        let input = input.normalized();
        input.validate()?;

        let student = self.repository.create_student(&input).await?;
        tracing::info!(
            student_id = %student.id,
            admission_number = %student.admission_number,
            "Student registered"
        );
        Ok(student)
    }

    /// List students, optionally filtered by name, admission number or class
    pub async fn list(&self, query: &StudentQuery) -> AppResult<Vec<Student>> {
        let (limit, skip) = rules::page_bounds(query.limit, query.skip);
        let search = Search::new(query.q.as_deref(), limit, skip);
        self.repository.search_students(&search, true).await
    }

    /// Bounded suggestions matching name or admission number
    pub async fn suggest(&self, q: Option<&str>) -> AppResult<Vec<Student>> {
        let search = Search::new(q, rules::SUGGESTION_LIMIT, 0);
        self.repository.search_students(&search, false).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Student> {
        self.repository.get_student(id).await
    }

    /// Partial update; the merged record must pass the same checks as a registration
    pub async fn update(&self, id: Uuid, update: UpdateStudent) -> AppResult<Student> {
        let current = self.repository.get_student(id).await?;
        let input = StudentInput::merged(&current, update).normalized();
        input.validate()?;
        self.repository.update_student(id, &input).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.delete_student(id).await.inspect_err(|e| {
            if let AppError::Conflict(reason) = e {
                tracing::warn!(student_id = %id, "Delete refused: {}", reason);
            }
        })?;
        tracing::info!(student_id = %id, "Student deleted");
        Ok(())
    }

    /// Borrows of one student, newest first
    pub async fn borrows(&self, id: Uuid, query: &BorrowQuery) -> AppResult<Vec<BorrowDetails>> {
        self.repository.get_student(id).await?;
        let filter = BorrowFilter::from_query(query, Some(id));
        self.repository.list_borrows(&filter, Utc::now()).await
    }
}
