//! Integration tests for the in-memory store backend: uniqueness conflicts,
//! delete cascades, and the catalog listing filters.

use goodshelf_storage::{
    AccountStore, BookQuery, BookSort, CatalogStore, MemoryStorage, NewBook, NewUser,
    ReviewStore, ShelfStore, StoreError, UserFilter, VoteStore,
};
use goodshelf_types::{
    AccountStatus, Book, PageRequest, ReadingStatus, ReviewId, Role, User, VoteKind,
};

#[tokio::test]
async fn username_must_be_unique() {
    let store = MemoryStorage::new();
    seed_user(&store, "alice").await;

    let err = store.create_user(&new_user("alice")).await.unwrap_err();
    assert!(matches!(err, StoreError::UsernameTaken { .. }));
    assert!(err.is_conflict());

    // Renaming onto a taken name fails the same way.
    let bob = seed_user(&store, "bob").await;
    let err = store
        .update_profile(bob.id, "alice", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UsernameTaken { .. }));

    // Keeping your own name is not a conflict.
    store.update_profile(bob.id, "bob", None).await.unwrap();
}

#[tokio::test]
async fn review_upsert_replaces_existing() {
    let store = MemoryStorage::new();
    let user = seed_user(&store, "alice").await;
    let book = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;

    let (first, created) = store
        .upsert_review(user.id, book.id, 5, "a classic")
        .await
        .unwrap();
    assert!(created);

    let (second, created) = store
        .upsert_review(user.id, book.id, 3, "on reflection")
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert_eq!(second.rating, 3);
    assert_eq!(second.comment, "on reflection");

    // Still exactly one review for the pair.
    let reviews = store.reviews_for_book(book.id).await.unwrap();
    assert_eq!(reviews.len(), 1);
}

#[tokio::test]
async fn one_vote_per_user_per_review() {
    let store = MemoryStorage::new();
    let author = seed_user(&store, "alice").await;
    let voter = seed_user(&store, "bob").await;
    let book = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;
    let (review, _) = store
        .upsert_review(author.id, book.id, 5, "a classic")
        .await
        .unwrap();

    store
        .insert_vote(voter.id, review.id, VoteKind::Up)
        .await
        .unwrap();
    let err = store
        .insert_vote(voter.id, review.id, VoteKind::Down)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateVote { .. }));

    // Voting on a review that does not exist is a not-found, not a conflict.
    let err = store
        .insert_vote(voter.id, ReviewId::new(99999), VoteKind::Up)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_a_review_removes_its_votes() {
    let store = MemoryStorage::new();
    let author = seed_user(&store, "alice").await;
    let voter = seed_user(&store, "bob").await;
    let book = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;
    let (review, _) = store
        .upsert_review(author.id, book.id, 5, "a classic")
        .await
        .unwrap();
    store
        .insert_vote(voter.id, review.id, VoteKind::Up)
        .await
        .unwrap();

    assert!(store.delete_review(review.id).await.unwrap());

    assert!(store.get_review(review.id).await.unwrap().is_none());
    assert!(store.vote_of(voter.id, review.id).await.unwrap().is_none());
    let tally = store.tally(review.id).await.unwrap();
    assert_eq!((tally.upvotes, tally.downvotes, tally.net), (0, 0, 0));
}

#[tokio::test]
async fn deleting_a_book_cascades_to_reviews_votes_and_shelves() {
    let store = MemoryStorage::new();
    let author = seed_user(&store, "alice").await;
    let voter = seed_user(&store, "bob").await;
    let book = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;
    let (review, _) = store
        .upsert_review(author.id, book.id, 4, "sand")
        .await
        .unwrap();
    store
        .insert_vote(voter.id, review.id, VoteKind::Down)
        .await
        .unwrap();
    store
        .upsert_entry(voter.id, book.id, ReadingStatus::Reading)
        .await
        .unwrap();

    assert!(store.delete_book(book.id).await.unwrap());

    assert!(store.get_book(book.id).await.unwrap().is_none());
    assert!(store.get_review(review.id).await.unwrap().is_none());
    assert!(store.vote_of(voter.id, review.id).await.unwrap().is_none());
    assert!(store.entry_for(voter.id, book.id).await.unwrap().is_none());

    // Deleting again reports nothing happened.
    assert!(!store.delete_book(book.id).await.unwrap());
}

#[tokio::test]
async fn deleting_a_user_removes_everything_they_touched() {
    let store = MemoryStorage::new();
    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let book = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;

    // Alice reviews; Bob votes on her review. Alice also votes on Bob's
    // review and shelves the book.
    let (alices_review, _) = store
        .upsert_review(alice.id, book.id, 5, "a classic")
        .await
        .unwrap();
    let (bobs_review, _) = store
        .upsert_review(bob.id, book.id, 2, "too long")
        .await
        .unwrap();
    store
        .insert_vote(bob.id, alices_review.id, VoteKind::Up)
        .await
        .unwrap();
    store
        .insert_vote(alice.id, bobs_review.id, VoteKind::Down)
        .await
        .unwrap();
    store
        .upsert_entry(alice.id, book.id, ReadingStatus::Completed)
        .await
        .unwrap();

    assert!(store.delete_user(alice.id).await.unwrap());

    // Her review is gone along with Bob's vote on it, her own vote is
    // retracted, and her shelf is empty. Bob's review survives.
    assert!(store.get_review(alices_review.id).await.unwrap().is_none());
    assert!(store
        .vote_of(bob.id, alices_review.id)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .vote_of(alice.id, bobs_review.id)
        .await
        .unwrap()
        .is_none());
    assert!(store.list_shelf(alice.id, None).await.unwrap().is_empty());
    assert!(store.get_review(bobs_review.id).await.unwrap().is_some());
}

#[tokio::test]
async fn shelf_entry_is_unique_per_book_and_updates_in_place() {
    let store = MemoryStorage::new();
    let user = seed_user(&store, "alice").await;
    let book = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;

    let first = store
        .upsert_entry(user.id, book.id, ReadingStatus::PlanToRead)
        .await
        .unwrap();
    let second = store
        .upsert_entry(user.id, book.id, ReadingStatus::Completed)
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.status, ReadingStatus::Completed);
    assert_eq!(store.list_shelf(user.id, None).await.unwrap().len(), 1);

    assert!(store.remove_entry(user.id, book.id).await.unwrap());
    assert!(!store.remove_entry(user.id, book.id).await.unwrap());
}

#[tokio::test]
async fn shelf_filters_by_reading_status() {
    let store = MemoryStorage::new();
    let user = seed_user(&store, "alice").await;
    let dune = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;
    let lotr = seed_book(&store, "The Fellowship", "J.R.R. Tolkien", Some(1954)).await;
    store
        .upsert_entry(user.id, dune.id, ReadingStatus::Reading)
        .await
        .unwrap();
    store
        .upsert_entry(user.id, lotr.id, ReadingStatus::Completed)
        .await
        .unwrap();

    let reading = store
        .list_shelf(user.id, Some(ReadingStatus::Reading))
        .await
        .unwrap();
    assert_eq!(reading.len(), 1);
    assert_eq!(reading[0].book_id, dune.id);
}

#[tokio::test]
async fn catalog_listing_filters_sorts_and_paginates() {
    let store = MemoryStorage::new();
    let user = seed_user(&store, "alice").await;
    let fantasy = store.create_genre("Fantasy").await.unwrap();
    let scifi = store.create_genre("Science Fiction").await.unwrap();

    let dune = store
        .create_book(&NewBook {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            publish_year: Some(1965),
            genre_ids: vec![scifi.id],
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .create_book(&NewBook {
            title: "The Hobbit".into(),
            author: "J.R.R. Tolkien".into(),
            publish_year: Some(1937),
            genre_ids: vec![fantasy.id],
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .create_book(&NewBook {
            title: "Neuromancer".into(),
            author: "William Gibson".into(),
            publish_year: Some(1984),
            genre_ids: vec![scifi.id],
            ..Default::default()
        })
        .await
        .unwrap();
    store.upsert_review(user.id, dune.id, 5, "spice").await.unwrap();

    // Genre filter.
    let page = store
        .list_books(&BookQuery {
            genre: Some(scifi.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    // Title search is case-insensitive substring match.
    let page = store
        .list_books(&BookQuery {
            search: Some("hobb".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].book.title, "The Hobbit");

    // Rating sort puts the only reviewed book first.
    let page = store
        .list_books(&BookQuery {
            sort: BookSort::Rating,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items[0].book.id, dune.id);
    assert_eq!(page.items[0].review_count, 1);
    assert!((page.items[0].average_rating - 5.0).abs() < f64::EPSILON);

    // Two per page makes two pages; an out-of-range page clamps to the last.
    let page = store
        .list_books(&BookQuery {
            page: PageRequest::new(9, 2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn user_listing_filters_by_name_status_and_role() {
    let store = MemoryStorage::new();
    let alice = seed_user(&store, "alice").await;
    seed_user(&store, "bob").await;
    let carol = seed_user(&store, "carol").await;
    store.set_status(alice.id, AccountStatus::Banned).await.unwrap();
    store.set_role(carol.id, Role::Admin).await.unwrap();

    let page = store
        .list_users(&UserFilter {
            username_contains: Some("AL".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].username, "alice");

    let page = store
        .list_users(&UserFilter {
            status: Some(AccountStatus::Banned),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let page = store
        .list_users(&UserFilter {
            role: Some(Role::Admin),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].username, "carol");
}

#[tokio::test]
async fn deleting_a_genre_unlinks_books_without_deleting_them() {
    let store = MemoryStorage::new();
    let scifi = store.create_genre("Science Fiction").await.unwrap();
    let book = store
        .create_book(&NewBook {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre_ids: vec![scifi.id],
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(store.delete_genre(scifi.id).await.unwrap());

    let book = store.get_book(book.id).await.unwrap().unwrap();
    assert!(book.genre_ids.is_empty());

    // Duplicate genre names are rejected.
    store.create_genre("Horror").await.unwrap();
    let err = store.create_genre("Horror").await.unwrap_err();
    assert!(matches!(err, StoreError::GenreExists { .. }));
}

#[tokio::test]
async fn votes_of_user_maps_only_the_callers_votes() {
    let store = MemoryStorage::new();
    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let book = seed_book(&store, "Dune", "Frank Herbert", Some(1965)).await;
    let (r1, _) = store
        .upsert_review(alice.id, book.id, 5, "spice")
        .await
        .unwrap();
    let (r2, _) = store
        .upsert_review(bob.id, book.id, 2, "sand")
        .await
        .unwrap();
    store.insert_vote(bob.id, r1.id, VoteKind::Up).await.unwrap();
    store
        .insert_vote(alice.id, r2.id, VoteKind::Down)
        .await
        .unwrap();

    let votes = store
        .votes_of_user(bob.id, &[r1.id, r2.id])
        .await
        .unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes.get(&r1.id), Some(&VoteKind::Up));
}

// === Helpers ===

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        password_hash: "hash".to_string(),
        password_salt: "salt".to_string(),
        role: Role::User,
        status: AccountStatus::Active,
    }
}

async fn seed_user(store: &MemoryStorage, username: &str) -> User {
    store.create_user(&new_user(username)).await.unwrap()
}

async fn seed_book(
    store: &MemoryStorage,
    title: &str,
    author: &str,
    publish_year: Option<i32>,
) -> Book {
    store
        .create_book(&NewBook {
            title: title.to_string(),
            author: author.to_string(),
            publish_year,
            ..Default::default()
        })
        .await
        .unwrap()
}
