//! Personal shelf management.
//!
//! A shelf is a per-user reading list: each book on it carries one
//! [`ReadingStatus`]. Setting a status for an already-shelved book updates
//! the entry in place.

use std::sync::Arc;

use serde::Serialize;

use goodshelf_storage::{Store, StoreError};
use goodshelf_types::{Book, BookId, ReadingStatus, ShelfEntry, UserId};

use crate::error::Result;

/// A shelf entry joined with its book, for listing.
#[derive(Debug, Clone, Serialize)]
pub struct ShelfBook {
    pub entry: ShelfEntry,
    pub book: Book,
}

/// Shelf operations over a shared store.
#[derive(Clone)]
pub struct ShelfService {
    store: Arc<dyn Store>,
}

impl ShelfService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Put a book on the caller's shelf, or change its status if already
    /// shelved.
    pub async fn set_status(
        &self,
        user_id: UserId,
        book_id: BookId,
        status: ReadingStatus,
    ) -> Result<ShelfEntry> {
        Ok(self.store.upsert_entry(user_id, book_id, status).await?)
    }

    /// Take a book off the caller's shelf.
    pub async fn remove(&self, user_id: UserId, book_id: BookId) -> Result<()> {
        if !self.store.remove_entry(user_id, book_id).await? {
            return Err(StoreError::ShelfEntryNotFound {
                user_id: user_id.get(),
                book_id: book_id.get(),
            }
            .into());
        }
        Ok(())
    }

    /// The caller's shelf, most recently added first, optionally filtered
    /// by reading status. Entries whose book has since vanished are
    /// skipped.
    pub async fn list(
        &self,
        user_id: UserId,
        status: Option<ReadingStatus>,
    ) -> Result<Vec<ShelfBook>> {
        let entries = self.store.list_shelf(user_id, status).await?;
        let mut shelf = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(book) = self.store.get_book(entry.book_id).await? {
                shelf.push(ShelfBook { entry, book });
            }
        }
        Ok(shelf)
    }
}
