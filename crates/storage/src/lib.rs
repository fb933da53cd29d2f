//! Store interfaces and backends for the goodshelf service.
//!
//! This crate provides the trait-based store layer for the book-review
//! service: accounts, the book/genre catalog, reviews, review votes, and
//! personal shelves. Two backends are included: an in-memory store used by
//! tests and small deployments, and a PostgreSQL store behind the `postgres`
//! feature.

pub mod backends;
pub mod error;
pub mod traits;
pub mod types;

// Re-export the main interface and types for easy access
pub use backends::MemoryStorage;
#[cfg(feature = "postgres")]
pub use backends::PostgresStorage;
pub use error::{Result, StoreError};
pub use traits::{AccountStore, CatalogStore, ReviewStore, ShelfStore, Store, VoteStore};
pub use types::{
    BookQuery, BookReview, BookSearchField, BookSort, BookSummary, NewBook, NewUser,
    PasswordUpdate, ReviewQuery, ReviewRecord, ReviewSort, UserFilter,
};
