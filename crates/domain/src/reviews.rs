//! Review submission, deletion, and moderation listing.

use std::sync::Arc;

use tracing::info;

use goodshelf_storage::{ReviewQuery, ReviewRecord, Store, StoreError};
use goodshelf_types::{BookId, Page, Review, ReviewId, User};

use crate::error::{DomainError, Result};

const MAX_COMMENT_LEN: usize = 1000;

/// Review operations over a shared store.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Submit the caller's review of a book.
    ///
    /// A user has at most one review per book; submitting again replaces
    /// the earlier rating and comment.
    ///
    /// # Returns
    /// The stored review and `true` if it was newly created rather than
    /// replaced.
    pub async fn submit(
        &self,
        author: &User,
        book_id: BookId,
        rating: i16,
        comment: &str,
    ) -> Result<(Review, bool)> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::validation("rating must be between 1 and 5"));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(DomainError::validation("comment must not be empty"));
        }
        if comment.len() > MAX_COMMENT_LEN {
            return Err(DomainError::validation(format!(
                "comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }

        let (review, created) = self
            .store
            .upsert_review(author.id, book_id, rating, comment)
            .await?;
        info!(user = %author.username, %book_id, rating, created, "review submitted");
        Ok((review, created))
    }

    /// Delete a review. Allowed for its author and for admins.
    pub async fn delete(&self, actor: &User, review_id: ReviewId) -> Result<()> {
        let review = self
            .store
            .get_review(review_id)
            .await?
            .ok_or(StoreError::ReviewNotFound { id: review_id.get() })?;
        if review.user_id != actor.id && !actor.role.is_admin() {
            return Err(DomainError::forbidden("only the author or an admin may delete a review"));
        }
        self.store.delete_review(review_id).await?;
        info!(actor = %actor.username, %review_id, "review deleted");
        Ok(())
    }

    /// Reviews written by one user, newest first.
    pub async fn by_user(&self, author: &User) -> Result<Vec<Review>> {
        Ok(self.store.reviews_by_user(author.id).await?)
    }

    /// Paged review listing across the whole catalog, for moderation.
    /// Admin only.
    pub async fn moderation_list(
        &self,
        actor: &User,
        query: &ReviewQuery,
    ) -> Result<Page<ReviewRecord>> {
        if !actor.role.is_admin() {
            return Err(DomainError::forbidden("admin role required"));
        }
        Ok(self.store.list_reviews(query).await?)
    }
}
