//! Trait definitions for the store layer.
//!
//! Each trait covers one of the persisted stores from the system overview:
//! accounts, the catalog, reviews, review votes, and personal shelves.
//! Implementations can use different backends; this workspace ships an
//! in-memory backend for tests and a PostgreSQL backend for deployments.
//!
//! Uniqueness invariants (one review per (user, book), one vote per
//! (user, review), one shelf entry per (user, book)) are enforced by the
//! backend, not by check-then-write in callers. A caller that loses a
//! concurrent race receives the matching `Duplicate*` error.

use std::collections::HashMap;

use async_trait::async_trait;

use goodshelf_types::{
    AccountStatus, Book, Genre, GenreId, Page, ReadingStatus, Review, ReviewId, ReviewVote, Role,
    ShelfEntry, User, UserId, UserStats, VoteKind, VoteTally,
};
use goodshelf_types::BookId;

use crate::error::Result;
use crate::types::{
    BookQuery, BookReview, BookSummary, NewBook, NewUser, PasswordUpdate, ReviewQuery,
    ReviewRecord, UserFilter,
};

/// Store for user accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create a user. Fails with `UsernameTaken` if the name is in use.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    /// Get a user by id.
    ///
    /// # Returns
    /// `Some(user)` if found, `None` if not found
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Find a user by their unique username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Update a user's username and, optionally, their credentials.
    ///
    /// Fails with `UsernameTaken` if another user holds the new name.
    async fn update_profile(
        &self,
        id: UserId,
        username: &str,
        password: Option<&PasswordUpdate>,
    ) -> Result<User>;

    /// Set a user's moderation status.
    async fn set_status(&self, id: UserId, status: AccountStatus) -> Result<()>;

    /// Set a user's role.
    async fn set_role(&self, id: UserId, role: Role) -> Result<()>;

    /// Delete a user and all their data: reviews (with those reviews'
    /// votes), votes they cast, and shelf entries.
    ///
    /// # Returns
    /// `true` if the user was deleted, `false` if it didn't exist
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    /// List users with optional filtering, for the admin listing.
    async fn list_users(&self, filter: &UserFilter) -> Result<Page<User>>;

    /// Review and shelf counts for one user.
    async fn user_stats(&self, id: UserId) -> Result<UserStats>;
}

/// Store for books and genres.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // === Books ===

    /// Create a book. Unknown genre ids fail with `GenreNotFound`.
    async fn create_book(&self, book: &NewBook) -> Result<Book>;

    /// Get a book by id.
    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;

    /// Replace a book's descriptive fields and genre links.
    async fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book>;

    /// Delete a book along with its reviews (and their votes), genre links,
    /// and shelf entries.
    ///
    /// # Returns
    /// `true` if the book was deleted, `false` if it didn't exist
    async fn delete_book(&self, id: BookId) -> Result<bool>;

    /// List books with filtering, sorting, and pagination.
    async fn list_books(&self, query: &BookQuery) -> Result<Page<BookSummary>>;

    // === Genres ===

    /// Create a genre. Fails with `GenreExists` on a duplicate name.
    async fn create_genre(&self, name: &str) -> Result<Genre>;

    /// Get a genre by id.
    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>>;

    /// Rename a genre. Fails with `GenreExists` on a duplicate name.
    async fn rename_genre(&self, id: GenreId, name: &str) -> Result<Genre>;

    /// Delete a genre, severing its book links. Books are untouched.
    async fn delete_genre(&self, id: GenreId) -> Result<bool>;

    /// All genres, sorted by name.
    async fn list_genres(&self) -> Result<Vec<Genre>>;
}

/// Store for reviews.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert or overwrite the caller's review of a book.
    ///
    /// The (user, book) pair is unique; a second submission replaces the
    /// rating, comment, and timestamp of the first.
    ///
    /// # Returns
    /// The stored review and `true` if it was newly created.
    async fn upsert_review(
        &self,
        user_id: UserId,
        book_id: BookId,
        rating: i16,
        comment: &str,
    ) -> Result<(Review, bool)>;

    /// Get a review by id.
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>>;

    /// Find a user's review of a book, if any.
    async fn find_review(&self, user_id: UserId, book_id: BookId) -> Result<Option<Review>>;

    /// Delete a review and its votes.
    ///
    /// # Returns
    /// `true` if the review was deleted, `false` if it didn't exist
    async fn delete_review(&self, id: ReviewId) -> Result<bool>;

    /// All reviews of a book with their authors' names, newest first.
    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<BookReview>>;

    /// Reviews written by a user, newest first.
    async fn reviews_by_user(&self, user_id: UserId) -> Result<Vec<Review>>;

    /// Total review counts for a set of users, for byline display.
    async fn review_counts(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, u64>>;

    /// List reviews across the whole catalog, for moderation.
    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<ReviewRecord>>;
}

/// Store for review votes.
///
/// Votes have exactly three reachable states per (user, review) pair:
/// no-vote, upvoted, and downvoted. The toggle/change transitions between
/// them live in the domain layer; this trait only persists single rows and
/// counts them.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// The caller's current vote on a review, if any.
    async fn vote_of(&self, user_id: UserId, review_id: ReviewId) -> Result<Option<ReviewVote>>;

    /// Record a new vote. Fails with `DuplicateVote` if a vote for the
    /// (user, review) pair already exists, including when a concurrent
    /// request won the race.
    async fn insert_vote(
        &self,
        user_id: UserId,
        review_id: ReviewId,
        kind: VoteKind,
    ) -> Result<ReviewVote>;

    /// Overwrite a vote's kind and refresh its timestamp.
    async fn set_vote_kind(&self, vote_id: i64, kind: VoteKind) -> Result<()>;

    /// Remove a vote.
    ///
    /// # Returns
    /// `true` if the vote was deleted, `false` if it didn't exist
    async fn delete_vote(&self, vote_id: i64) -> Result<bool>;

    /// Count votes of each kind for a review.
    async fn tally(&self, review_id: ReviewId) -> Result<VoteTally>;

    /// The caller's votes across a set of reviews, for rendering pressed
    /// buttons on the book detail page.
    async fn votes_of_user(
        &self,
        user_id: UserId,
        review_ids: &[ReviewId],
    ) -> Result<HashMap<ReviewId, VoteKind>>;
}

/// Store for personal shelves (reading lists).
#[async_trait]
pub trait ShelfStore: Send + Sync {
    /// Insert or update the caller's shelf entry for a book, refreshing the
    /// added-at timestamp. The (user, book) pair is unique.
    async fn upsert_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
        status: ReadingStatus,
    ) -> Result<ShelfEntry>;

    /// The caller's shelf entry for a book, if any.
    async fn entry_for(&self, user_id: UserId, book_id: BookId) -> Result<Option<ShelfEntry>>;

    /// Remove the caller's shelf entry for a book.
    ///
    /// # Returns
    /// `true` if an entry was removed, `false` if there was none
    async fn remove_entry(&self, user_id: UserId, book_id: BookId) -> Result<bool>;

    /// The caller's shelf, most recently added first, optionally filtered
    /// by reading status.
    async fn list_shelf(
        &self,
        user_id: UserId,
        status: Option<ReadingStatus>,
    ) -> Result<Vec<ShelfEntry>>;
}

/// The full store surface, for handing a single backend to the services.
pub trait Store:
    AccountStore + CatalogStore + ReviewStore + VoteStore + ShelfStore + Send + Sync
{
}

impl<T> Store for T where
    T: AccountStore + CatalogStore + ReviewStore + VoteStore + ShelfStore + Send + Sync
{
}
