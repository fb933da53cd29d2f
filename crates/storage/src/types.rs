//! Supporting query and projection types for the store layer.

use serde::{Deserialize, Serialize};

use goodshelf_types::{
    AccountStatus, Book, GenreId, PageRequest, Review, Role,
};

/// Sort orders for the catalog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSort {
    /// Newest publish year first (the catalog default).
    #[default]
    Newest,
    Oldest,
    Title,
    Author,
    /// Highest average rating first; unrated books sort last.
    Rating,
}

/// Which book field a catalog search term matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSearchField {
    #[default]
    Title,
    Author,
}

/// Filter, sort, and pagination criteria for listing books.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub search: Option<String>,
    pub search_field: BookSearchField,
    pub genre: Option<GenreId>,
    pub sort: BookSort,
    pub page: PageRequest,
}

/// A book together with its aggregate review figures, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    pub book: Book,
    pub average_rating: f64,
    pub review_count: u64,
}

/// Sort orders for review listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
}

/// Filter, sort, and pagination criteria for the moderation review listing.
#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub rating: Option<i16>,
    /// Matches book title/author, reviewer name, or comment text.
    pub search: Option<String>,
    pub sort: ReviewSort,
    pub page: PageRequest,
}

/// A review joined with the display fields the moderation listing needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review: Review,
    pub book_title: String,
    pub book_author: String,
    pub username: String,
}

/// A review joined with its author's name, for the book detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookReview {
    pub review: Review,
    pub username: String,
}

/// Fields for creating a book. The id is assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub publish_year: Option<i32>,
    pub cover_url: Option<String>,
    pub genre_ids: Vec<GenreId>,
}

/// Fields for creating a user account. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: Role,
    pub status: AccountStatus,
}

/// Credential replacement for a profile update.
#[derive(Debug, Clone)]
pub struct PasswordUpdate {
    pub password_hash: String,
    pub password_salt: String,
}

/// Filter and pagination criteria for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub username_contains: Option<String>,
    pub status: Option<AccountStatus>,
    pub role: Option<Role>,
    pub page: PageRequest,
}
