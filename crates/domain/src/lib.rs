//! Domain services for the goodshelf book-review service.
//!
//! Each service wraps the shared store with the business rules the
//! handlers rely on: validation, permission checks, vote transitions, and
//! the joins the display surfaces need. Identity is always passed in
//! explicitly; nothing here reads ambient session state.

use std::sync::Arc;

use goodshelf_storage::Store;

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod reviews;
pub mod shelf;
pub mod votes;

pub use accounts::{AccountService, Profile, UserOverview};
pub use catalog::{BookDetail, CatalogService, ReviewDisplay};
pub use error::{DomainError, Result};
pub use reviews::ReviewService;
pub use shelf::{ShelfBook, ShelfService};
pub use votes::{VoteReceipt, VoteService};

/// All services over one shared store backend.
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub reviews: ReviewService,
    pub shelf: ShelfService,
    pub votes: VoteService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            reviews: ReviewService::new(store.clone()),
            shelf: ShelfService::new(store.clone()),
            votes: VoteService::new(store),
        }
    }
}
