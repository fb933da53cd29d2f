//! Vote casting and tallying for reviews.
//!
//! A (user, review) pair is always in exactly one of three states: no vote,
//! upvoted, or downvoted. Casting a vote moves between them:
//!
//! * no prior vote: the vote is recorded ([`VoteOutcome::Created`])
//! * prior vote of the same kind: the vote is removed ([`VoteOutcome::Retracted`])
//! * prior vote of the other kind: the vote flips ([`VoteOutcome::Changed`])
//!
//! Users may vote on their own reviews.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use goodshelf_storage::{Store, StoreError};
use goodshelf_types::{ReviewId, ReviewVote, UserId, VoteKind, VoteOutcome, VoteTally};

use crate::error::{DomainError, Result};

/// What a cast did, together with the review's counts afterwards.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoteReceipt {
    pub outcome: VoteOutcome,
    pub tally: VoteTally,
}

/// Vote operations over a shared store.
#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn Store>,
}

impl VoteService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Cast a vote on a review, applying the toggle/change transitions.
    ///
    /// An insert can lose a race against a concurrent double-submit from
    /// the same user. The loser recovers once: if the stored vote already
    /// matches the requested kind the user's intent is satisfied and the
    /// cast is a no-op reported as `Created`; otherwise the vote flips.
    pub async fn cast(
        &self,
        voter: UserId,
        review_id: ReviewId,
        kind: VoteKind,
    ) -> Result<VoteReceipt> {
        if self.store.get_review(review_id).await?.is_none() {
            return Err(StoreError::ReviewNotFound { id: review_id.get() }.into());
        }

        let outcome = match self.apply(voter, review_id, kind).await {
            Err(DomainError::Storage(StoreError::DuplicateVote { .. })) => {
                debug!(%voter, %review_id, "vote insert lost a race, recovering");
                self.recover(voter, review_id, kind).await?
            }
            other => other?,
        };

        let tally = self.store.tally(review_id).await?;
        Ok(VoteReceipt { outcome, tally })
    }

    async fn recover(
        &self,
        voter: UserId,
        review_id: ReviewId,
        kind: VoteKind,
    ) -> Result<VoteOutcome> {
        match self.store.vote_of(voter, review_id).await? {
            Some(existing) if existing.kind == kind => Ok(VoteOutcome::Created),
            Some(existing) => {
                self.store.set_vote_kind(existing.id, kind).await?;
                Ok(VoteOutcome::Changed)
            }
            None => {
                self.store.insert_vote(voter, review_id, kind).await?;
                Ok(VoteOutcome::Created)
            }
        }
    }

    async fn apply(
        &self,
        voter: UserId,
        review_id: ReviewId,
        kind: VoteKind,
    ) -> Result<VoteOutcome> {
        match self.store.vote_of(voter, review_id).await? {
            None => {
                self.store.insert_vote(voter, review_id, kind).await?;
                Ok(VoteOutcome::Created)
            }
            Some(existing) if existing.kind == kind => {
                self.store.delete_vote(existing.id).await?;
                Ok(VoteOutcome::Retracted)
            }
            Some(existing) => {
                self.store.set_vote_kind(existing.id, kind).await?;
                Ok(VoteOutcome::Changed)
            }
        }
    }

    /// Current counts for a review.
    pub async fn tally(&self, review_id: ReviewId) -> Result<VoteTally> {
        if self.store.get_review(review_id).await?.is_none() {
            return Err(StoreError::ReviewNotFound { id: review_id.get() }.into());
        }
        Ok(self.store.tally(review_id).await?)
    }

    /// The caller's current vote on a review, if any.
    pub async fn vote_of(&self, voter: UserId, review_id: ReviewId) -> Result<Option<ReviewVote>> {
        Ok(self.store.vote_of(voter, review_id).await?)
    }
}
