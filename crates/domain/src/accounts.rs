//! Account registration, login, profiles, and admin user management.
//!
//! Passwords are stored as hex-encoded SHA-256 digests over a per-user
//! random salt. Login is refused outright for suspended and banned
//! accounts; moderation status is checked at the door, not per request.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use goodshelf_storage::{NewUser, PasswordUpdate, Store, StoreError, UserFilter};
use goodshelf_types::{AccountStatus, Page, Role, User, UserId, UserStats};

use crate::error::{DomainError, Result};

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 6;

/// A user joined with their activity counts, for the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub user: User,
    pub review_count: u64,
}

/// A user's own profile view.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub stats: UserStats,
    /// Mean rating across the user's reviews; `None` with no reviews.
    pub average_rating: Option<f64>,
}

/// Account operations over a shared store.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a new account with the default role and active status.
    pub async fn register(&self, username: &str, password: &str, confirm: &str) -> Result<User> {
        let username = validate_username(username)?;
        validate_password(password)?;
        if password != confirm {
            return Err(DomainError::validation("passwords do not match"));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let user = self
            .store
            .create_user(&NewUser {
                username: username.to_string(),
                password_hash: hash_password(&salt, password),
                password_salt: salt,
                role: Role::User,
                status: AccountStatus::Active,
            })
            .await?;
        info!(user = %user.username, "account registered");
        Ok(user)
    }

    /// Verify credentials and return the account.
    ///
    /// Unknown usernames and wrong passwords both produce
    /// [`DomainError::BadCredentials`]; suspended and banned accounts are
    /// refused even with the right password.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .store
            .find_user_by_username(username.trim())
            .await?
            .ok_or(DomainError::BadCredentials)?;
        if hash_password(&user.password_salt, password) != user.password_hash {
            return Err(DomainError::BadCredentials);
        }
        if user.status != AccountStatus::Active {
            return Err(DomainError::AccountDisabled {
                status: user.status,
            });
        }
        info!(user = %user.username, "login");
        Ok(user)
    }

    /// A user's profile with activity counts and their average given
    /// rating.
    pub async fn profile(&self, user_id: UserId) -> Result<Profile> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(StoreError::UserNotFound { id: user_id.get() })?;
        let stats = self.store.user_stats(user_id).await?;
        let reviews = self.store.reviews_by_user(user_id).await?;
        let average_rating = if reviews.is_empty() {
            None
        } else {
            Some(reviews.iter().map(|r| r.rating as f64).sum::<f64>() / reviews.len() as f64)
        };
        Ok(Profile {
            user,
            stats,
            average_rating,
        })
    }

    /// Update the caller's own username and, optionally, their password.
    ///
    /// Changing the password requires the current password; the new
    /// password gets a fresh salt.
    pub async fn update_profile(
        &self,
        actor: &User,
        username: &str,
        new_password: Option<(&str, &str)>,
    ) -> Result<User> {
        let username = validate_username(username)?;
        let password = match new_password {
            Some((current, new)) => {
                if hash_password(&actor.password_salt, current) != actor.password_hash {
                    return Err(DomainError::validation("current password is incorrect"));
                }
                validate_password(new)?;
                let salt = Uuid::new_v4().simple().to_string();
                Some(PasswordUpdate {
                    password_hash: hash_password(&salt, new),
                    password_salt: salt,
                })
            }
            None => None,
        };
        Ok(self
            .store
            .update_profile(actor.id, username, password.as_ref())
            .await?)
    }

    // === Admin operations ===

    /// Paged user listing with review counts. Admin only.
    pub async fn list_users(&self, actor: &User, filter: &UserFilter) -> Result<Page<UserOverview>> {
        require_admin(actor)?;
        let page = self.store.list_users(filter).await?;
        let ids: Vec<UserId> = page.items.iter().map(|u| u.id).collect();
        let counts = self.store.review_counts(&ids).await?;
        Ok(page.map(|user| UserOverview {
            review_count: counts.get(&user.id).copied().unwrap_or(0),
            user,
        }))
    }

    /// Set another user's moderation status. Admins cannot change their
    /// own status.
    pub async fn set_status(
        &self,
        actor: &User,
        target: UserId,
        status: AccountStatus,
    ) -> Result<()> {
        require_admin(actor)?;
        if target == actor.id {
            return Err(DomainError::forbidden(
                "admins cannot change their own status",
            ));
        }
        self.store.set_status(target, status).await?;
        info!(actor = %actor.username, %target, %status, "account status changed");
        Ok(())
    }

    /// Grant another user the admin role. The acting admin must re-enter
    /// their own password.
    pub async fn promote(&self, actor: &User, target: UserId, actor_password: &str) -> Result<()> {
        require_admin(actor)?;
        self.confirm_password(actor, actor_password)?;
        if target == actor.id {
            return Err(DomainError::forbidden("already an admin"));
        }
        self.store.set_role(target, Role::Admin).await?;
        info!(actor = %actor.username, %target, "user promoted to admin");
        Ok(())
    }

    /// Delete another user's account and all their data. The acting admin
    /// must re-enter their own password.
    pub async fn delete_user(
        &self,
        actor: &User,
        target: UserId,
        actor_password: &str,
    ) -> Result<()> {
        require_admin(actor)?;
        self.confirm_password(actor, actor_password)?;
        if target == actor.id {
            return Err(DomainError::forbidden("admins cannot delete themselves"));
        }
        if !self.store.delete_user(target).await? {
            return Err(StoreError::UserNotFound { id: target.get() }.into());
        }
        info!(actor = %actor.username, %target, "account deleted");
        Ok(())
    }

    fn confirm_password(&self, actor: &User, password: &str) -> Result<()> {
        if hash_password(&actor.password_salt, password) != actor.password_hash {
            return Err(DomainError::validation("password confirmation failed"));
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

fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.len() < MIN_USERNAME_LEN || username.len() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(format!(
            "username must be {MIN_USERNAME_LEN} to {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(username)
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
