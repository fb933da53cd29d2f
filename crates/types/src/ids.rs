//! Identifier newtypes.
//!
//! All entities are keyed by 64-bit integers assigned by the storage backend.
//! The newtypes exist so a `UserId` can never be passed where a `ReviewId` is
//! expected.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw integer value.
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a user account.
    UserId
);
id_type!(
    /// Unique identifier for a book in the catalog.
    BookId
);
id_type!(
    /// Unique identifier for a genre.
    GenreId
);
id_type!(
    /// Unique identifier for a review.
    ReviewId
);
