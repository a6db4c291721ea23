//! Borrow and return endpoints

use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowRequest, ReturnRequest},
        Borrow, BorrowDetails, BorrowQuery, ReturnReceipt,
    },
};

use super::extract::{Json, Query};

/// Borrow a book by its code
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrows",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Borrow created", body = Borrow),
        (status = 404, description = "Student or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<Borrow>)> {
    let borrow = state.services.borrows.borrow(&request).await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Return a borrowed book by its code
#[utoipa::path(
    post,
    path = "/return",
    tag = "borrows",
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnReceipt),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No active borrow for this book", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<ReturnReceipt>> {
    let receipt = state.services.borrows.return_book(&request).await?;
    Ok(Json(receipt))
}

/// List borrows, active only by default
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    params(BorrowQuery),
    responses(
        (status = 200, description = "Borrows, newest first", body = Vec<BorrowDetails>)
    )
)]
pub async fn list_borrows(
    State(state): State<crate::AppState>,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let borrows = state.services.borrows.list(&query).await?;
    Ok(Json(borrows))
}
