//! In-memory store backend.
//!
//! Keeps every table in maps behind a single `tokio::sync::RwLock`. Used by
//! the test suites and workable for small single-process deployments; the
//! uniqueness invariants are upheld by keyed lookups under the write lock,
//! mirroring the constraints the PostgreSQL backend declares in its schema.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use goodshelf_types::{
    AccountStatus, Book, BookId, Genre, GenreId, Page, ReadingStatus, Review, ReviewId,
    ReviewVote, Role, ShelfEntry, User, UserId, UserStats, VoteKind, VoteTally,
};

use crate::error::{Result, StoreError};
use crate::traits::{AccountStore, CatalogStore, ReviewStore, ShelfStore, VoteStore};
use crate::types::{
    BookQuery, BookReview, BookSearchField, BookSort, BookSummary, NewBook, NewUser,
    PasswordUpdate, ReviewQuery, ReviewRecord, ReviewSort, UserFilter,
};

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    genres: BTreeMap<i64, Genre>,
    books: BTreeMap<i64, Book>,
    reviews: BTreeMap<i64, Review>,
    votes: BTreeMap<i64, ReviewVote>,
    shelves: BTreeMap<i64, ShelfEntry>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_review_cascade(&mut self, review_id: i64) {
        self.reviews.remove(&review_id);
        self.votes
            .retain(|_, vote| vote.review_id.get() != review_id);
    }
}

/// In-memory store backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(mut items: Vec<T>, page: goodshelf_types::PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let request = page.clamp_to(total);
    let start = (request.offset() as usize).min(items.len());
    let end = (start + request.per_page as usize).min(items.len());
    let items = items.drain(start..end).collect();
    Page::new(items, total, request)
}

#[async_trait]
impl AccountStore for MemoryStorage {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.username == user.username)
        {
            return Err(StoreError::UsernameTaken {
                username: user.username.clone(),
            });
        }
        let id = inner.next_id();
        let user = User {
            id: UserId::new(id),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            password_salt: user.password_salt.clone(),
            role: user.role,
            status: user.status,
            created_at: Utc::now(),
        };
        inner.users.insert(id, user.clone());
        debug!(user = %user.username, id, "user created");
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id.get()).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: UserId,
        username: &str,
        password: Option<&PasswordUpdate>,
    ) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.username == username && u.id != id)
        {
            return Err(StoreError::UsernameTaken {
                username: username.to_string(),
            });
        }
        let user = inner
            .users
            .get_mut(&id.get())
            .ok_or(StoreError::UserNotFound { id: id.get() })?;
        user.username = username.to_string();
        if let Some(update) = password {
            user.password_hash = update.password_hash.clone();
            user.password_salt = update.password_salt.clone();
        }
        Ok(user.clone())
    }

    async fn set_status(&self, id: UserId, status: AccountStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id.get())
            .ok_or(StoreError::UserNotFound { id: id.get() })?;
        user.status = status;
        Ok(())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id.get())
            .ok_or(StoreError::UserNotFound { id: id.get() })?;
        user.role = role;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&id.get()).is_none() {
            return Ok(false);
        }
        let review_ids: Vec<i64> = inner
            .reviews
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.id.get())
            .collect();
        for review_id in review_ids {
            inner.remove_review_cascade(review_id);
        }
        inner.votes.retain(|_, v| v.user_id != id);
        inner.shelves.retain(|_, s| s.user_id != id);
        Ok(true)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Page<User>> {
        let inner = self.inner.read().await;
        let users: Vec<User> = inner
            .users
            .values()
            .filter(|u| match &filter.username_contains {
                Some(term) => contains_ci(&u.username, term),
                None => true,
            })
            .filter(|u| filter.status.is_none_or(|s| u.status == s))
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        // BTreeMap iteration already orders by id.
        Ok(paginate(users, filter.page))
    }

    async fn user_stats(&self, id: UserId) -> Result<UserStats> {
        let inner = self.inner.read().await;
        Ok(UserStats {
            review_count: inner.reviews.values().filter(|r| r.user_id == id).count() as u64,
            shelf_count: inner.shelves.values().filter(|s| s.user_id == id).count() as u64,
        })
    }
}

#[async_trait]
impl CatalogStore for MemoryStorage {
    async fn create_book(&self, book: &NewBook) -> Result<Book> {
        let mut inner = self.inner.write().await;
        for genre_id in &book.genre_ids {
            if !inner.genres.contains_key(&genre_id.get()) {
                return Err(StoreError::GenreNotFound { id: genre_id.get() });
            }
        }
        let id = inner.next_id();
        let book = Book {
            id: BookId::new(id),
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            publish_year: book.publish_year,
            cover_url: book.cover_url.clone(),
            genre_ids: book.genre_ids.clone(),
        };
        inner.books.insert(id, book.clone());
        Ok(book)
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(&id.get()).cloned())
    }

    async fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book> {
        let mut inner = self.inner.write().await;
        for genre_id in &book.genre_ids {
            if !inner.genres.contains_key(&genre_id.get()) {
                return Err(StoreError::GenreNotFound { id: genre_id.get() });
            }
        }
        let stored = inner
            .books
            .get_mut(&id.get())
            .ok_or(StoreError::BookNotFound { id: id.get() })?;
        stored.title = book.title.clone();
        stored.author = book.author.clone();
        stored.description = book.description.clone();
        stored.publish_year = book.publish_year;
        stored.cover_url = book.cover_url.clone();
        stored.genre_ids = book.genre_ids.clone();
        Ok(stored.clone())
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.books.remove(&id.get()).is_none() {
            return Ok(false);
        }
        let review_ids: Vec<i64> = inner
            .reviews
            .values()
            .filter(|r| r.book_id == id)
            .map(|r| r.id.get())
            .collect();
        for review_id in review_ids {
            inner.remove_review_cascade(review_id);
        }
        inner.shelves.retain(|_, s| s.book_id != id);
        Ok(true)
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Page<BookSummary>> {
        let inner = self.inner.read().await;
        let mut summaries: Vec<BookSummary> = inner
            .books
            .values()
            .filter(|b| match query.genre {
                Some(genre) => b.genre_ids.contains(&genre),
                None => true,
            })
            .filter(|b| match &query.search {
                Some(term) => match query.search_field {
                    BookSearchField::Title => contains_ci(&b.title, term),
                    BookSearchField::Author => contains_ci(&b.author, term),
                },
                None => true,
            })
            .map(|b| {
                let ratings: Vec<i16> = inner
                    .reviews
                    .values()
                    .filter(|r| r.book_id == b.id)
                    .map(|r| r.rating)
                    .collect();
                let review_count = ratings.len() as u64;
                let average_rating = if ratings.is_empty() {
                    0.0
                } else {
                    ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
                };
                BookSummary {
                    book: b.clone(),
                    average_rating,
                    review_count,
                }
            })
            .collect();

        match query.sort {
            BookSort::Newest => summaries.sort_by_key(|s| {
                std::cmp::Reverse(s.book.publish_year.unwrap_or(i32::MIN))
            }),
            BookSort::Oldest => {
                summaries.sort_by_key(|s| s.book.publish_year.unwrap_or(i32::MAX))
            }
            BookSort::Title => summaries.sort_by_key(|s| s.book.title.to_lowercase()),
            BookSort::Author => summaries.sort_by_key(|s| s.book.author.to_lowercase()),
            BookSort::Rating => {
                summaries.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating))
            }
        }

        Ok(paginate(summaries, query.page))
    }

    async fn create_genre(&self, name: &str) -> Result<Genre> {
        let mut inner = self.inner.write().await;
        if inner.genres.values().any(|g| g.name == name) {
            return Err(StoreError::GenreExists {
                name: name.to_string(),
            });
        }
        let id = inner.next_id();
        let genre = Genre {
            id: GenreId::new(id),
            name: name.to_string(),
        };
        inner.genres.insert(id, genre.clone());
        Ok(genre)
    }

    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>> {
        let inner = self.inner.read().await;
        Ok(inner.genres.get(&id.get()).cloned())
    }

    async fn rename_genre(&self, id: GenreId, name: &str) -> Result<Genre> {
        let mut inner = self.inner.write().await;
        if inner.genres.values().any(|g| g.name == name && g.id != id) {
            return Err(StoreError::GenreExists {
                name: name.to_string(),
            });
        }
        let genre = inner
            .genres
            .get_mut(&id.get())
            .ok_or(StoreError::GenreNotFound { id: id.get() })?;
        genre.name = name.to_string();
        Ok(genre.clone())
    }

    async fn delete_genre(&self, id: GenreId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.genres.remove(&id.get()).is_none() {
            return Ok(false);
        }
        for book in inner.books.values_mut() {
            book.genre_ids.retain(|g| *g != id);
        }
        Ok(true)
    }

    async fn list_genres(&self) -> Result<Vec<Genre>> {
        let inner = self.inner.read().await;
        let mut genres: Vec<Genre> = inner.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(genres)
    }
}

#[async_trait]
impl ReviewStore for MemoryStorage {
    async fn upsert_review(
        &self,
        user_id: UserId,
        book_id: BookId,
        rating: i16,
        comment: &str,
    ) -> Result<(Review, bool)> {
        let mut inner = self.inner.write().await;
        if !inner.books.contains_key(&book_id.get()) {
            return Err(StoreError::BookNotFound { id: book_id.get() });
        }
        if let Some(existing) = inner
            .reviews
            .values_mut()
            .find(|r| r.user_id == user_id && r.book_id == book_id)
        {
            existing.rating = rating;
            existing.comment = comment.to_string();
            existing.created_at = Utc::now();
            return Ok((existing.clone(), false));
        }
        let id = inner.next_id();
        let review = Review {
            id: ReviewId::new(id),
            user_id,
            book_id,
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };
        inner.reviews.insert(id, review.clone());
        Ok((review, true))
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let inner = self.inner.read().await;
        Ok(inner.reviews.get(&id.get()).cloned())
    }

    async fn find_review(&self, user_id: UserId, book_id: BookId) -> Result<Option<Review>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .find(|r| r.user_id == user_id && r.book_id == book_id)
            .cloned())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if !inner.reviews.contains_key(&id.get()) {
            return Ok(false);
        }
        inner.remove_review_cascade(id.get());
        Ok(true)
    }

    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<BookReview>> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<BookReview> = inner
            .reviews
            .values()
            .filter(|r| r.book_id == book_id)
            .map(|r| BookReview {
                review: r.clone(),
                username: inner
                    .users
                    .get(&r.user_id.get())
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            })
            .collect();
        reviews.sort_by(|a, b| b.review.created_at.cmp(&a.review.created_at));
        Ok(reviews)
    }

    async fn reviews_by_user(&self, user_id: UserId) -> Result<Vec<Review>> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<Review> = inner
            .reviews
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn review_counts(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, u64>> {
        let inner = self.inner.read().await;
        let mut counts = HashMap::new();
        for review in inner.reviews.values() {
            if user_ids.contains(&review.user_id) {
                *counts.entry(review.user_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<ReviewRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<ReviewRecord> = inner
            .reviews
            .values()
            .filter(|r| query.rating.is_none_or(|rating| r.rating == rating))
            .map(|r| {
                let (book_title, book_author) = inner
                    .books
                    .get(&r.book_id.get())
                    .map(|b| (b.title.clone(), b.author.clone()))
                    .unwrap_or_default();
                let username = inner
                    .users
                    .get(&r.user_id.get())
                    .map(|u| u.username.clone())
                    .unwrap_or_default();
                ReviewRecord {
                    review: r.clone(),
                    book_title,
                    book_author,
                    username,
                }
            })
            .filter(|rec| match &query.search {
                Some(term) => {
                    contains_ci(&rec.book_title, term)
                        || contains_ci(&rec.book_author, term)
                        || contains_ci(&rec.username, term)
                        || contains_ci(&rec.review.comment, term)
                }
                None => true,
            })
            .collect();

        match query.sort {
            ReviewSort::Newest => {
                records.sort_by(|a, b| b.review.created_at.cmp(&a.review.created_at))
            }
            ReviewSort::Oldest => {
                records.sort_by(|a, b| a.review.created_at.cmp(&b.review.created_at))
            }
            ReviewSort::Highest => records.sort_by_key(|r| std::cmp::Reverse(r.review.rating)),
            ReviewSort::Lowest => records.sort_by_key(|r| r.review.rating),
        }

        Ok(paginate(records, query.page))
    }
}

#[async_trait]
impl VoteStore for MemoryStorage {
    async fn vote_of(&self, user_id: UserId, review_id: ReviewId) -> Result<Option<ReviewVote>> {
        let inner = self.inner.read().await;
        Ok(inner
            .votes
            .values()
            .find(|v| v.user_id == user_id && v.review_id == review_id)
            .cloned())
    }

    async fn insert_vote(
        &self,
        user_id: UserId,
        review_id: ReviewId,
        kind: VoteKind,
    ) -> Result<ReviewVote> {
        let mut inner = self.inner.write().await;
        if !inner.reviews.contains_key(&review_id.get()) {
            return Err(StoreError::ReviewNotFound { id: review_id.get() });
        }
        if inner
            .votes
            .values()
            .any(|v| v.user_id == user_id && v.review_id == review_id)
        {
            return Err(StoreError::DuplicateVote {
                user_id: user_id.get(),
                review_id: review_id.get(),
            });
        }
        let id = inner.next_id();
        let vote = ReviewVote {
            id,
            review_id,
            user_id,
            kind,
            created_at: Utc::now(),
        };
        inner.votes.insert(id, vote.clone());
        Ok(vote)
    }

    async fn set_vote_kind(&self, vote_id: i64, kind: VoteKind) -> Result<()> {
        let mut inner = self.inner.write().await;
        let vote = inner
            .votes
            .get_mut(&vote_id)
            .ok_or(StoreError::Backend {
                source: Some(eyre::eyre!("vote {vote_id} vanished mid-update")),
            })?;
        vote.kind = kind;
        vote.created_at = Utc::now();
        Ok(())
    }

    async fn delete_vote(&self, vote_id: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.votes.remove(&vote_id).is_some())
    }

    async fn tally(&self, review_id: ReviewId) -> Result<VoteTally> {
        let inner = self.inner.read().await;
        let mut upvotes = 0;
        let mut downvotes = 0;
        for vote in inner.votes.values().filter(|v| v.review_id == review_id) {
            match vote.kind {
                VoteKind::Up => upvotes += 1,
                VoteKind::Down => downvotes += 1,
            }
        }
        Ok(VoteTally::new(upvotes, downvotes))
    }

    async fn votes_of_user(
        &self,
        user_id: UserId,
        review_ids: &[ReviewId],
    ) -> Result<HashMap<ReviewId, VoteKind>> {
        let inner = self.inner.read().await;
        Ok(inner
            .votes
            .values()
            .filter(|v| v.user_id == user_id && review_ids.contains(&v.review_id))
            .map(|v| (v.review_id, v.kind))
            .collect())
    }
}

#[async_trait]
impl ShelfStore for MemoryStorage {
    async fn upsert_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
        status: ReadingStatus,
    ) -> Result<ShelfEntry> {
        let mut inner = self.inner.write().await;
        if !inner.books.contains_key(&book_id.get()) {
            return Err(StoreError::BookNotFound { id: book_id.get() });
        }
        if let Some(existing) = inner
            .shelves
            .values_mut()
            .find(|s| s.user_id == user_id && s.book_id == book_id)
        {
            existing.status = status;
            existing.added_at = Utc::now();
            return Ok(existing.clone());
        }
        let id = inner.next_id();
        let entry = ShelfEntry {
            id,
            user_id,
            book_id,
            status,
            added_at: Utc::now(),
        };
        inner.shelves.insert(id, entry.clone());
        Ok(entry)
    }

    async fn entry_for(&self, user_id: UserId, book_id: BookId) -> Result<Option<ShelfEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .shelves
            .values()
            .find(|s| s.user_id == user_id && s.book_id == book_id)
            .cloned())
    }

    async fn remove_entry(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let id = inner
            .shelves
            .values()
            .find(|s| s.user_id == user_id && s.book_id == book_id)
            .map(|s| s.id);
        match id {
            Some(id) => {
                inner.shelves.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_shelf(
        &self,
        user_id: UserId,
        status: Option<ReadingStatus>,
    ) -> Result<Vec<ShelfEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<ShelfEntry> = inner
            .shelves
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| status.is_none_or(|wanted| s.status == wanted))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(entries)
    }
}
