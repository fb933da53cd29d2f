//! HTTP handlers and the router.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod profile;
pub mod reviews;
pub mod shelf;

/// Build the full application router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        // Catalog
        .route("/api/books", get(catalog::list_books))
        .route("/api/books/{id}", get(catalog::book_detail))
        .route("/api/genres", get(catalog::list_genres))
        // Reviews and votes
        .route("/api/books/{id}/reviews", post(reviews::submit))
        .route("/api/reviews/{id}", delete(reviews::delete))
        .route("/api/reviews/{id}/vote", post(reviews::vote))
        .route("/api/reviews/{id}/votes", get(reviews::votes))
        // Shelf
        .route("/api/shelf", get(shelf::list))
        .route("/api/shelf/{book_id}", put(shelf::put).delete(shelf::remove))
        // Profile
        .route("/api/me", get(profile::get).put(profile::update))
        // Admin
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/status", post(admin::set_status))
        .route("/api/admin/users/{id}/promote", post(admin::promote))
        .route("/api/admin/users/{id}", delete(admin::delete_user))
        .route("/api/admin/reviews", get(admin::list_reviews))
        .route("/api/admin/books", post(admin::create_book))
        .route(
            "/api/admin/books/{id}",
            put(admin::update_book).delete(admin::delete_book),
        )
        .route("/api/admin/genres", post(admin::create_genre))
        .route(
            "/api/admin/genres/{id}",
            put(admin::rename_genre).delete(admin::delete_genre),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
