use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use warden_core::{ActorIdentity, AppError};
use warden_domain::{AuditAction, GrantTarget, RoleId};

use crate::test_support::{FakeSecurityStore, FixedClock};

use super::GrantMutationService;

fn service(store: &Arc<FakeSecurityStore>) -> GrantMutationService {
    GrantMutationService::new(store.clone(), store.clone(), Arc::new(FixedClock))
}

fn actor() -> ActorIdentity {
    ActorIdentity::new("admin-1", "Admin").unwrap_or_else(|_| ActorIdentity::system())
}

async fn seeded_store() -> Arc<FakeSecurityStore> {
    let store = FakeSecurityStore::shared();
    store
        .add_permissions(&[
            "products:read",
            "products:create",
            "products:delete",
            "orders:read",
        ])
        .await;
    store
}

#[tokio::test]
async fn unknown_permission_fails_listing_every_missing_name() {
    let store = seeded_store().await;
    let role = store.add_role("Manager").await;

    let result = service(&store)
        .add_permissions_to_role(
            &actor(),
            role.id,
            &["nonexistent:permission", "products:read", "other:missing"],
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(AppError::UnknownPermissions(missing)) => {
            assert_eq!(missing, ["nonexistent:permission", "other:missing"]);
        }
        other => panic!("expected unknown permissions, got {other:?}"),
    }
    assert_eq!(store.grant_count(GrantTarget::Role(role.id)).await, 0);
    assert_eq!(store.writes().await, 0);
}

#[tokio::test]
async fn blank_batch_is_rejected_before_store_access() {
    let store = seeded_store().await;

    let result = service(&store)
        .add_permissions_to_role(
            &actor(),
            RoleId::new(),
            &["  ", ""],
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn missing_target_is_not_found() {
    let store = seeded_store().await;

    let result = service(&store)
        .add_permissions_to_role(
            &actor(),
            RoleId::new(),
            &["products:read"],
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn case_variants_in_one_request_produce_one_grant() {
    let store = seeded_store().await;
    let role = store.add_role("Manager").await;

    let grant_set = service(&store)
        .add_permissions_to_role(
            &actor(),
            role.id,
            &["Products:Read", "PRODUCTS:READ", " products:read "],
            &CancellationToken::new(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(grant_set.names(), ["products:read"]);
    assert_eq!(store.grant_count(GrantTarget::Role(role.id)).await, 1);
}

#[tokio::test]
async fn adding_held_permission_is_a_no_op() {
    let store = seeded_store().await;
    let user = store.add_user("alice").await;
    let service = service(&store);
    let cancel = CancellationToken::new();

    let first = service
        .add_permissions_to_user(&actor(), user.id, &["products:read"], &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    let second = service
        .add_permissions_to_user(&actor(), user.id, &["products:read"], &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(first.permissions.len(), 1);
    assert_eq!(second.permissions.len(), 1);
    assert_eq!(first.concurrency_token, second.concurrency_token);
    assert_eq!(store.writes().await, 1);
    assert_eq!(store.events().await.len(), 1);
}

#[tokio::test]
async fn add_then_remove_round_trip() {
    let store = seeded_store().await;
    let role = store.add_role("Manager").await;
    let service = service(&store);
    let cancel = CancellationToken::new();

    let added = service
        .add_permissions_to_role(&actor(), role.id, &["products:create"], &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    let remaining = service
        .remove_permissions_from_role(&actor(), role.id, &added.names(), None, &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(!remaining.contains("products:create"));
    assert!(remaining.concurrency_token.is_none());

    let actions: Vec<AuditAction> = store
        .events()
        .await
        .into_iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(
        actions,
        [
            AuditAction::SecurityGrantsAdded,
            AuditAction::SecurityGrantsRemoved
        ]
    );
}

#[tokio::test]
async fn removing_only_ungranted_name_is_invalid() {
    let store = seeded_store().await;
    let user = store.add_user("bob").await;

    let result = service(&store)
        .remove_permissions_from_user(
            &actor(),
            user.id,
            &["products:delete"],
            None,
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::InvalidOperation(_))));
}

#[tokio::test]
async fn partial_intersection_removes_only_held_names() {
    let store = seeded_store().await;
    let user = store.add_user("carol").await;
    let service = service(&store);
    let cancel = CancellationToken::new();

    service
        .add_permissions_to_user(&actor(), user.id, &["products:read", "orders:read"], &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());

    let remaining = service
        .remove_permissions_from_user(
            &actor(),
            user.id,
            &["products:read", "products:delete"],
            None,
            &cancel,
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(remaining.names(), ["orders:read"]);
    assert!(!remaining.contains("products:delete"));
}

#[tokio::test]
async fn second_remove_with_same_original_token_conflicts() {
    let store = seeded_store().await;
    let user = store.add_user("dave").await;
    let service = service(&store);
    let cancel = CancellationToken::new();

    let original = service
        .add_permissions_to_user(
            &actor(),
            user.id,
            &["products:read", "products:create", "orders:read"],
            &cancel,
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    let token = original.concurrency_token;
    assert!(token.is_some());

    let first = service
        .remove_permissions_from_user(&actor(), user.id, &["products:read"], token, &cancel)
        .await;
    assert!(first.is_ok());
    assert_ne!(first.unwrap_or_else(|_| unreachable!()).concurrency_token, token);

    let second = service
        .remove_permissions_from_user(&actor(), user.id, &["orders:read"], token, &cancel)
        .await;
    assert!(matches!(second, Err(AppError::ConcurrencyConflict(_))));

    let current = service
        .get_grant_set(GrantTarget::User(user.id), &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(current.contains("orders:read"));
    assert_eq!(current.permissions.len(), 2);
}

#[tokio::test]
async fn cancellation_before_write_commits_nothing() {
    let store = seeded_store().await;
    let role = store.add_role("Manager").await;
    let cancel = CancellationToken::new();
    *store.cancel_on_list_grants.lock().await = Some(cancel.clone());

    let result = service(&store)
        .add_permissions_to_role(&actor(), role.id, &["products:read", "orders:read"], &cancel)
        .await;

    assert!(matches!(result, Err(AppError::Cancelled(_))));
    assert_eq!(store.grant_count(GrantTarget::Role(role.id)).await, 0);
    assert_eq!(store.writes().await, 0);
    assert!(store.events().await.is_empty());
}

#[tokio::test]
async fn committed_grants_survive_a_failed_audit_append() {
    let store = seeded_store().await;
    let role = store.add_role("Manager").await;
    *store.fail_audit_appends.lock().await = true;
    let service = service(&store);
    let cancel = CancellationToken::new();

    let added = service
        .add_permissions_to_role(&actor(), role.id, &["products:read", "orders:read"], &cancel)
        .await;
    assert!(added.is_ok());
    assert_eq!(store.grant_count(GrantTarget::Role(role.id)).await, 2);

    let removed = service
        .remove_permissions_from_role(&actor(), role.id, &["orders:read"], None, &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(removed.contains("products:read"));
    assert!(!removed.contains("orders:read"));
    assert!(store.events().await.is_empty());
}
