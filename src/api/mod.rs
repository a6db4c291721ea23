//! API handlers for BiblioFlow REST endpoints

pub mod books;
pub mod borrows;
pub mod extract;
pub mod health;
pub mod openapi;
pub mod students;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Suggestion query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuggestQuery {
    /// Text to match; empty returns the first entries
    pub q: Option<String>,
}

/// Body returned by delete endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Students
        .route("/students", get(students::list_students))
        .route("/students", post(students::create_student))
        .route("/students/:id", get(students::get_student))
        .route("/students/:id", put(students::update_student))
        .route("/students/:id", delete(students::delete_student))
        .route("/students/:id/borrows", get(students::get_student_borrows))
        // Books
        .route("/books", get(books::list_books))
        .route("/books", post(books::create_book))
        .route("/books/by-code/:code", get(books::get_book_by_code))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id", put(books::update_book))
        .route("/books/:id", delete(books::delete_book))
        // Borrow / return
        .route("/borrow", post(borrows::borrow_book))
        .route("/return", post(borrows::return_book))
        .route("/borrows", get(borrows::list_borrows))
        // Suggestions
        .route("/suggest/students", get(students::suggest_students))
        .route("/suggest/books", get(books::suggest_books))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
