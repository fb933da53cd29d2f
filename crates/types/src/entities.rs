//! Entity types for the book-review service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BookId, GenreId, ReviewId, UserId};

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Moderation status of a user account.
///
/// The numeric values match the stored representation (1/2/3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Banned,
}

impl AccountStatus {
    pub fn as_i16(&self) -> i16 {
        match self {
            AccountStatus::Active => 1,
            AccountStatus::Suspended => 2,
            AccountStatus::Banned => 3,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(AccountStatus::Active),
            2 => Some(AccountStatus::Suspended),
            3 => Some(AccountStatus::Banned),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Banned => "banned",
        };
        f.write_str(name)
    }
}

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Salted SHA-256 digest of the password, hex encoded.
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// A book genre. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// A book in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub publish_year: Option<i32>,
    pub cover_url: Option<String>,
    /// Genres attached to this book (many-to-many).
    pub genre_ids: Vec<GenreId>,
}

/// A user's rating and comment for one book.
///
/// At most one review exists per (user, book) pair; submitting again
/// overwrites the earlier review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub book_id: BookId,
    /// Star rating, 1 through 5.
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Direction of a vote on a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    /// The stored sentinel: +1 for upvotes, -1 for downvotes.
    pub fn as_i16(&self) -> i16 {
        match self {
            VoteKind::Up => 1,
            VoteKind::Down => -1,
        }
    }

    /// Decode a stored sentinel.
    ///
    /// Older schema revisions wrote 2 for downvotes; those rows are still
    /// readable and normalize to [`VoteKind::Down`]. New rows are only ever
    /// written as +1/-1.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(VoteKind::Up),
            -1 | 2 => Some(VoteKind::Down),
            _ => None,
        }
    }
}

/// A user's up/down endorsement of another user's review.
///
/// At most one vote exists per (user, review) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewVote {
    pub id: i64,
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub kind: VoteKind,
    pub created_at: DateTime<Utc>,
}

/// What a vote cast did to the caller's existing vote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    /// No prior vote existed; one was recorded.
    Created,
    /// A vote of the other kind existed and was replaced.
    Changed,
    /// A vote of the same kind existed and was removed.
    Retracted,
}

/// Aggregated vote counts for one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
    /// `upvotes - downvotes`.
    pub net: i64,
}

impl VoteTally {
    pub fn new(upvotes: u32, downvotes: u32) -> Self {
        Self {
            upvotes,
            downvotes,
            net: upvotes as i64 - downvotes as i64,
        }
    }
}

/// Reading status of a book on a user's personal shelf.
///
/// The numeric values match the stored representation (1 through 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    PlanToRead,
    Reading,
    Dropped,
    Completed,
}

impl ReadingStatus {
    pub fn as_i16(&self) -> i16 {
        match self {
            ReadingStatus::PlanToRead => 1,
            ReadingStatus::Reading => 2,
            ReadingStatus::Dropped => 3,
            ReadingStatus::Completed => 4,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(ReadingStatus::PlanToRead),
            2 => Some(ReadingStatus::Reading),
            3 => Some(ReadingStatus::Dropped),
            4 => Some(ReadingStatus::Completed),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ReadingStatus::PlanToRead => "Plan to Read",
            ReadingStatus::Reading => "Currently Reading",
            ReadingStatus::Dropped => "Dropped",
            ReadingStatus::Completed => "Completed",
        }
    }
}

/// A (user, book) status marker on a personal shelf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfEntry {
    pub id: i64,
    pub user_id: UserId,
    pub book_id: BookId,
    pub status: ReadingStatus,
    pub added_at: DateTime<Utc>,
}

/// Per-user activity counts shown on profile and admin pages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub review_count: u64,
    pub shelf_count: u64,
}
