//! Error types for the domain services.

use goodshelf_storage::StoreError;
use goodshelf_types::AccountStatus;

/// Errors produced by the domain services.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A store-level failure, passed through unchanged so callers can
    /// distinguish not-found from conflict.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The request was well-formed but its content is not acceptable.
    #[error("{0}")]
    Validation(String),

    /// The acting user is not allowed to perform this operation.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// Login with an unknown username or a wrong password. Deliberately
    /// does not say which.
    #[error("incorrect username or password")]
    BadCredentials,

    /// Login into a suspended or banned account.
    #[error("account is {status}")]
    AccountDisabled { status: AccountStatus },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// True when the underlying cause is a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
