//! Integration tests for registration, login gating, and admin user
//! management.

use std::sync::Arc;

use goodshelf_domain::{DomainError, Services};
use goodshelf_storage::{AccountStore, MemoryStorage, StoreError, UserFilter};
use goodshelf_types::{AccountStatus, Role, User};

#[tokio::test]
async fn registration_validates_its_inputs() {
    let (services, _) = setup();

    let err = services
        .accounts
        .register("al", "hunter2!", "hunter2!")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = services
        .accounts
        .register("alice", "short", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = services
        .accounts
        .register("alice", "hunter2!", "hunter3!")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    services
        .accounts
        .register("alice", "hunter2!", "hunter2!")
        .await
        .unwrap();
    let err = services
        .accounts
        .register("alice", "hunter2!", "hunter2!")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Storage(StoreError::UsernameTaken { .. })
    ));
}

#[tokio::test]
async fn login_checks_credentials_and_account_status() {
    let (services, store) = setup();
    let user = register(&services, "alice").await;

    // Right password works, wrong password and unknown user look the same.
    services.accounts.login("alice", "hunter2!").await.unwrap();
    let err = services
        .accounts
        .login("alice", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BadCredentials));
    let err = services
        .accounts
        .login("nobody", "hunter2!")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BadCredentials));

    // Suspended and banned accounts are refused at the door.
    store
        .set_status(user.id, AccountStatus::Suspended)
        .await
        .unwrap();
    let err = services.accounts.login("alice", "hunter2!").await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::AccountDisabled {
            status: AccountStatus::Suspended
        }
    ));

    store
        .set_status(user.id, AccountStatus::Banned)
        .await
        .unwrap();
    let err = services.accounts.login("alice", "hunter2!").await.unwrap_err();
    assert!(matches!(err, DomainError::AccountDisabled { .. }));
}

#[tokio::test]
async fn profile_update_requires_current_password_for_a_change() {
    let (services, _) = setup();
    let user = register(&services, "alice").await;

    // Renaming alone needs no password.
    let renamed = services
        .accounts
        .update_profile(&user, "alice2", None)
        .await
        .unwrap();
    assert_eq!(renamed.username, "alice2");

    // Password change with the wrong current password is rejected.
    let err = services
        .accounts
        .update_profile(&renamed, "alice2", Some(("wrong", "new-password")))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // With the right current password the new one takes effect.
    services
        .accounts
        .update_profile(&renamed, "alice2", Some(("hunter2!", "correct-horse")))
        .await
        .unwrap();
    services
        .accounts
        .login("alice2", "correct-horse")
        .await
        .unwrap();
    let err = services
        .accounts
        .login("alice2", "hunter2!")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BadCredentials));
}

#[tokio::test]
async fn admin_management_rules() {
    let (services, store) = setup();
    let alice = register(&services, "alice").await;
    let root = admin(&services, &store, "root").await;

    // Plain users cannot use the admin surface.
    let err = services
        .accounts
        .list_users(&alice, &UserFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // Status changes work on others but not on yourself.
    services
        .accounts
        .set_status(&root, alice.id, AccountStatus::Suspended)
        .await
        .unwrap();
    let err = services
        .accounts
        .set_status(&root, root.id, AccountStatus::Banned)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // Promotion and deletion require the admin's own password.
    let err = services
        .accounts
        .promote(&root, alice.id, "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    services
        .accounts
        .promote(&root, alice.id, "hunter2!")
        .await
        .unwrap();
    let alice = store.get_user(alice.id).await.unwrap().unwrap();
    assert_eq!(alice.role, Role::Admin);

    services
        .accounts
        .delete_user(&root, alice.id, "hunter2!")
        .await
        .unwrap();
    assert!(store.get_user(alice.id).await.unwrap().is_none());

    // Self-deletion is blocked even with the right password.
    let err = services
        .accounts
        .delete_user(&root, root.id, "hunter2!")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}

// === Helpers ===

fn setup() -> (Services, Arc<MemoryStorage>) {
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
    let user = register(services, username).await;
    store.set_role(user.id, Role::Admin).await.unwrap();
    store.get_user(user.id).await.unwrap().unwrap()
}
