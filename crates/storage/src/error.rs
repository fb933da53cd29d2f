//! Error types for the store layer.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User not found: {id}")]
    UserNotFound { id: i64 },

    #[error("Book not found: {id}")]
    BookNotFound { id: i64 },

    #[error("Genre not found: {id}")]
    GenreNotFound { id: i64 },

    #[error("Review not found: {id}")]
    ReviewNotFound { id: i64 },

    #[error("No shelf entry for user={user_id}, book={book_id}")]
    ShelfEntryNotFound { user_id: i64, book_id: i64 },

    #[error("Username already taken: {username}")]
    UsernameTaken { username: String },

    #[error("Genre already exists: {name}")]
    GenreExists { name: String },

    /// Lost a uniqueness race on the (user, review) vote constraint.
    #[error("Vote already exists for user={user_id}, review={review_id}")]
    DuplicateVote { user_id: i64, review_id: i64 },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Storage backend error")]
    Backend {
        #[source]
        source: Option<eyre::Report>,
    },
}

impl StoreError {
    pub fn backend(source: impl Into<eyre::Report>) -> Self {
        StoreError::Backend {
            source: Some(source.into()),
        }
    }

    /// True for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::UserNotFound { .. }
                | StoreError::BookNotFound { .. }
                | StoreError::GenreNotFound { .. }
                | StoreError::ReviewNotFound { .. }
                | StoreError::ShelfEntryNotFound { .. }
        )
    }

    /// True for uniqueness-constraint conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::UsernameTaken { .. }
                | StoreError::GenreExists { .. }
                | StoreError::DuplicateVote { .. }
        )
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
