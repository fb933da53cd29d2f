//! Core types shared across the goodshelf crates.
//!
//! This crate holds the entity types for the book-review service along with
//! the identifier newtypes and pagination helpers. It is deliberately free of
//! storage or transport concerns so every other crate can depend on it.

pub mod entities;
pub mod ids;
pub mod page;

pub use entities::{
    AccountStatus, Book, Genre, ReadingStatus, Review, ReviewVote, Role, ShelfEntry, User,
    UserStats, VoteKind, VoteOutcome, VoteTally,
};
pub use ids::{BookId, GenreId, ReviewId, UserId};
pub use page::{Page, PageRequest};
