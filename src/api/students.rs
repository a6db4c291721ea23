//! Student management endpoints

use axum::{extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{BorrowDetails, BorrowQuery, Student, StudentInput, StudentQuery, UpdateStudent},
};

use super::{
    extract::{Json, Path, Query},
    DeletedResponse, SuggestQuery,
};

/// List students with search and pagination
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    params(StudentQuery),
    responses(
        (status = 200, description = "List of students", body = Vec<Student>)
    )
)]
pub async fn list_students(
    State(state): State<crate::AppState>,
    Query(query): Query<StudentQuery>,
) -> AppResult<Json<Vec<Student>>> {
    let students = state.services.students.list(&query).await?;
    Ok(Json(students))
}

/// Get student details by ID
#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = Student),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_student(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Student>> {
    let student = state.services.students.get(id).await?;
    Ok(Json(student))
}

/// Register a new student
#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    request_body = StudentInput,
    responses(
        (status = 201, description = "Student registered", body = Student),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Admission number already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_student(
    State(state): State<crate::AppState>,
    Json(input): Json<StudentInput>,
) -> AppResult<(StatusCode, Json<Student>)> {
    let created = state.services.students.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing student
#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Admission number already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_student(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateStudent>,
) -> AppResult<Json<Student>> {
    let updated = state.services.students.update(id, update).await?;
    Ok(Json(updated))
}

/// Delete a student without active borrows
#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted", body = DeletedResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Student has active borrow", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_student(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeletedResponse>> {
    state.services.students.delete(id).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

/// Borrows of a student
#[utoipa::path(
    get,
    path = "/students/{id}/borrows",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student ID"), BorrowQuery),
    responses(
        (status = 200, description = "Student's borrows", body = Vec<BorrowDetails>),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_student_borrows(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let borrows = state.services.students.borrows(id, &query).await?;
    Ok(Json(borrows))
}

/// Student suggestions for search widgets
#[utoipa::path(
    get,
    path = "/suggest/students",
    tag = "suggest",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Up to 10 matching students", body = Vec<Student>)
    )
)]
pub async fn suggest_students(
    State(state): State<crate::AppState>,
    Query(query): Query<SuggestQuery>,
) -> AppResult<Json<Vec<Student>>> {
    let students = state.services.students.suggest(query.q.as_deref()).await?;
    Ok(Json(students))
}
