//! Integration tests for the vote transitions and their tallies.

use std::sync::Arc;

use goodshelf_domain::{DomainError, Services};
use goodshelf_storage::{MemoryStorage, NewBook, CatalogStore};
use goodshelf_types::{Book, ReviewId, User, VoteKind, VoteOutcome, VoteTally};

#[tokio::test]
async fn upvote_toggle_and_flip() {
    let (services, store) = setup().await;
    let alice = register(&services, "alice").await;
    let bob = register(&services, "bob").await;
    let book = seed_book(&store, "Dune").await;
    let (review, _) = services
        .reviews
        .submit(&bob, book.id, 4, "sand everywhere")
        .await
        .unwrap();

    // First upvote records a vote.
    let receipt = services
        .votes
        .cast(alice.id, review.id, VoteKind::Up)
        .await
        .unwrap();
    assert_eq!(receipt.outcome, VoteOutcome::Created);
    assert_eq!(receipt.tally, tally(1, 0));

    // Upvoting again retracts it.
    let receipt = services
        .votes
        .cast(alice.id, review.id, VoteKind::Up)
        .await
        .unwrap();
    assert_eq!(receipt.outcome, VoteOutcome::Retracted);
    assert_eq!(receipt.tally, tally(0, 0));

    // A downvote after retraction is a fresh vote.
    let receipt = services
        .votes
        .cast(alice.id, review.id, VoteKind::Down)
        .await
        .unwrap();
    assert_eq!(receipt.outcome, VoteOutcome::Created);
    assert_eq!(receipt.tally, tally(0, 1));

    // Upvoting while downvoted flips the vote, not stacks it.
    let receipt = services
        .votes
        .cast(alice.id, review.id, VoteKind::Up)
        .await
        .unwrap();
    assert_eq!(receipt.outcome, VoteOutcome::Changed);
    assert_eq!(receipt.tally, tally(1, 0));

    // A second voter is counted independently.
    let receipt = services
        .votes
        .cast(bob.id, review.id, VoteKind::Down)
        .await
        .unwrap();
    assert_eq!(receipt.outcome, VoteOutcome::Created);
    assert_eq!(receipt.tally, tally(1, 1));
}

#[tokio::test]
async fn at_most_one_vote_per_user_and_review() {
    let (services, store) = setup().await;
    let alice = register(&services, "alice").await;
    let bob = register(&services, "bob").await;
    let book = seed_book(&store, "Dune").await;
    let (review, _) = services
        .reviews
        .submit(&bob, book.id, 4, "sand everywhere")
        .await
        .unwrap();

    for kind in [VoteKind::Up, VoteKind::Down, VoteKind::Down, VoteKind::Up] {
        services.votes.cast(alice.id, review.id, kind).await.unwrap();
    }

    // Whatever the sequence, the pair holds at most one vote and the
    // tally never exceeds one ballot for this voter.
    let tally = services.votes.tally(review.id).await.unwrap();
    assert!(tally.upvotes + tally.downvotes <= 1);
    let vote = services.votes.vote_of(alice.id, review.id).await.unwrap();
    assert_eq!(vote.map(|v| v.kind), Some(VoteKind::Up));
}

#[tokio::test]
async fn voting_on_a_missing_review_is_not_found() {
    let (services, _) = setup().await;
    let alice = register(&services, "alice").await;

    let err = services
        .votes
        .cast(alice.id, ReviewId::new(99999), VoteKind::Up)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = services.votes.tally(ReviewId::new(99999)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn voting_on_your_own_review_is_allowed() {
    let (services, store) = setup().await;
    let alice = register(&services, "alice").await;
    let book = seed_book(&store, "Dune").await;
    let (review, _) = services
        .reviews
        .submit(&alice, book.id, 5, "my own masterpiece")
        .await
        .unwrap();

    let receipt = services
        .votes
        .cast(alice.id, review.id, VoteKind::Up)
        .await
        .unwrap();
    assert_eq!(receipt.outcome, VoteOutcome::Created);
    assert_eq!(receipt.tally, tally(1, 0));
}

#[tokio::test]
async fn deleting_a_review_drops_its_votes() {
    let (services, store) = setup().await;
    let alice = register(&services, "alice").await;
    let bob = register(&services, "bob").await;
    let admin = admin(&services, &store, "root").await;
    let book = seed_book(&store, "Dune").await;
    let (review, _) = services
        .reviews
        .submit(&bob, book.id, 4, "sand everywhere")
        .await
        .unwrap();
    services
        .votes
        .cast(alice.id, review.id, VoteKind::Up)
        .await
        .unwrap();

    // A bystander cannot delete someone else's review.
    let err = services.reviews.delete(&alice, review.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // An admin can, and the votes go with it.
    services.reviews.delete(&admin, review.id).await.unwrap();
    let err = services.votes.tally(review.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(services
        .votes
        .vote_of(alice.id, review.id)
        .await
        .unwrap()
        .is_none());
}

// === Helpers ===

fn tally(up: u32, down: u32) -> VoteTally {
    VoteTally::new(up, down)
}

async fn setup() -> (Services, Arc<MemoryStorage>) {
    let store = Arc::new(MemoryStorage::new());
    (Services::new(store.clone()), store)
}

async fn register(services: &Services, username: &str) -> User {
    services
        .accounts
        .register(username, "hunter2!", "hunter2!")
        .await
        .unwrap()
}

async fn admin(services: &Services, store: &MemoryStorage, username: &str) -> User {
    use goodshelf_storage::AccountStore;
    let user = register(services, username).await;
    store
        .set_role(user.id, goodshelf_types::Role::Admin)
        .await
        .unwrap();
    store.get_user(user.id).await.unwrap().unwrap()
}

async fn seed_book(store: &MemoryStorage, title: &str) -> Book {
    store
        .create_book(&NewBook {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}
