//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrows, health, students};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BiblioFlow API",
        version = "0.1.0",
        description = "School library management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "BiblioFlow API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Students
        students::list_students,
        students::get_student,
        students::create_student,
        students::update_student,
        students::delete_student,
        students::get_student_borrows,
        // Books
        books::list_books,
        books::get_book,
        books::get_book_by_code,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrows
        borrows::borrow_book,
        borrows::return_book,
        borrows::list_borrows,
        // Suggestions
        students::suggest_students,
        books::suggest_books,
    ),
    components(
        schemas(
            // Students
            crate::models::student::Student,
            crate::models::student::StudentInput,
            crate::models::student::UpdateStudent,
            // Books
            crate::models::book::Book,
            crate::models::book::BookInput,
            crate::models::book::UpdateBook,
            // Borrows
            crate::models::borrow::Borrow,
            crate::models::borrow::BorrowDetails,
            crate::models::borrow::ReturnReceipt,
            crate::models::borrow::BorrowRequest,
            crate::models::borrow::ReturnRequest,
            // Health
            health::HealthResponse,
            // Common
            crate::api::DeletedResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "students", description = "Student management"),
        (name = "books", description = "Book catalog management"),
        (name = "borrows", description = "Borrowing and returns"),
        (name = "suggest", description = "Search suggestions")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_library_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/students",
            "/students/{id}",
            "/students/{id}/borrows",
            "/books/by-code/{code}",
            "/borrow",
            "/return",
            "/borrows",
            "/suggest/books",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
