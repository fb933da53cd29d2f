//! Catalog browsing and admin management of books and genres.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use goodshelf_storage::{BookQuery, BookSummary, NewBook, Store, StoreError};
use goodshelf_types::{
    Book, BookId, Genre, GenreId, Page, ReadingStatus, Review, User, UserId, VoteKind, VoteTally,
};

use crate::error::{DomainError, Result};

/// One review as shown on the book detail page.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewDisplay {
    pub review: Review,
    pub username: String,
    /// How many reviews the author has written in total, for the byline.
    pub author_review_count: u64,
    pub tally: VoteTally,
    /// The viewing user's own vote on this review, if signed in and voted.
    pub viewer_vote: Option<VoteKind>,
}

/// Everything the book detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub genres: Vec<Genre>,
    pub average_rating: f64,
    pub review_count: u64,
    pub reviews: Vec<ReviewDisplay>,
    /// The viewer's own review of this book, if any.
    pub viewer_review: Option<Review>,
    /// The viewer's shelf status for this book, if shelved.
    pub shelf_status: Option<ReadingStatus>,
}

/// Catalog operations over a shared store.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Browse the catalog with filtering, sorting, and pagination.
    pub async fn list_books(&self, query: &BookQuery) -> Result<Page<BookSummary>> {
        Ok(self.store.list_books(query).await?)
    }

    /// The full detail view of one book, personalized for `viewer`.
    pub async fn book_detail(&self, book_id: BookId, viewer: Option<UserId>) -> Result<BookDetail> {
        let book = self
            .store
            .get_book(book_id)
            .await?
            .ok_or(StoreError::BookNotFound { id: book_id.get() })?;

        let mut genres = Vec::with_capacity(book.genre_ids.len());
        for genre_id in &book.genre_ids {
            if let Some(genre) = self.store.get_genre(*genre_id).await? {
                genres.push(genre);
            }
        }

        let book_reviews = self.store.reviews_for_book(book_id).await?;
        let review_count = book_reviews.len() as u64;
        let average_rating = if book_reviews.is_empty() {
            0.0
        } else {
            book_reviews
                .iter()
                .map(|r| r.review.rating as f64)
                .sum::<f64>()
                / review_count as f64
        };

        let author_ids: Vec<UserId> = book_reviews.iter().map(|r| r.review.user_id).collect();
        let author_counts = self.store.review_counts(&author_ids).await?;

        let review_ids: Vec<_> = book_reviews.iter().map(|r| r.review.id).collect();
        let viewer_votes = match viewer {
            Some(viewer) => self.store.votes_of_user(viewer, &review_ids).await?,
            None => Default::default(),
        };

        let mut reviews = Vec::with_capacity(book_reviews.len());
        for entry in book_reviews {
            let tally = self.store.tally(entry.review.id).await?;
            reviews.push(ReviewDisplay {
                author_review_count: author_counts
                    .get(&entry.review.user_id)
                    .copied()
                    .unwrap_or(0),
                viewer_vote: viewer_votes.get(&entry.review.id).copied(),
                tally,
                username: entry.username,
                review: entry.review,
            });
        }

        let (viewer_review, shelf_status) = match viewer {
            Some(viewer) => (
                self.store.find_review(viewer, book_id).await?,
                self.store
                    .entry_for(viewer, book_id)
                    .await?
                    .map(|e| e.status),
            ),
            None => (None, None),
        };

        Ok(BookDetail {
            book,
            genres,
            average_rating,
            review_count,
            reviews,
            viewer_review,
            shelf_status,
        })
    }

    /// All genres, sorted by name.
    pub async fn genres(&self) -> Result<Vec<Genre>> {
        Ok(self.store.list_genres().await?)
    }

    // === Admin operations ===

    /// Add a book to the catalog. Admin only.
    pub async fn create_book(&self, actor: &User, book: &NewBook) -> Result<Book> {
        require_admin(actor)?;
        validate_book(book)?;
        let book = self.store.create_book(book).await?;
        info!(actor = %actor.username, book = %book.title, "book created");
        Ok(book)
    }

    /// Replace a book's descriptive fields and genre links. Admin only.
    pub async fn update_book(&self, actor: &User, id: BookId, book: &NewBook) -> Result<Book> {
        require_admin(actor)?;
        validate_book(book)?;
        Ok(self.store.update_book(id, book).await?)
    }

    /// Remove a book along with its reviews and shelf entries. Admin only.
    pub async fn delete_book(&self, actor: &User, id: BookId) -> Result<()> {
        require_admin(actor)?;
        if !self.store.delete_book(id).await? {
            return Err(StoreError::BookNotFound { id: id.get() }.into());
        }
        info!(actor = %actor.username, %id, "book deleted");
        Ok(())
    }

    /// Add a genre. Admin only.
    pub async fn create_genre(&self, actor: &User, name: &str) -> Result<Genre> {
        require_admin(actor)?;
        let name = validate_genre_name(name)?;
        Ok(self.store.create_genre(name).await?)
    }

    /// Rename a genre. Admin only.
    pub async fn rename_genre(&self, actor: &User, id: GenreId, name: &str) -> Result<Genre> {
        require_admin(actor)?;
        let name = validate_genre_name(name)?;
        Ok(self.store.rename_genre(id, name).await?)
    }

    /// Remove a genre, unlinking it from books. Admin only.
    pub async fn delete_genre(&self, actor: &User, id: GenreId) -> Result<()> {
        require_admin(actor)?;
        if !self.store.delete_genre(id).await? {
            return Err(StoreError::GenreNotFound { id: id.get() }.into());
        }
        Ok(())
    }
}

fn require_admin(actor: &User) -> Result<()> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(DomainError::forbidden("admin role required"))
    }
}

fn validate_book(book: &NewBook) -> Result<()> {
    if book.title.trim().is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    if book.author.trim().is_empty() {
        return Err(DomainError::validation("author must not be empty"));
    }
    Ok(())
}

fn validate_genre_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("genre name must not be empty"));
    }
    if name.len() > 100 {
        return Err(DomainError::validation(
            "genre name must be at most 100 characters",
        ));
    }
    Ok(name)
}
