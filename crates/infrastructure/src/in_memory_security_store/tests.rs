use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use warden_application::{
    CatalogRepository, CatalogSeedService, ClaimIssuer, GrantMutationService, GrantStore,
    PermissionAggregator, RoleAssignmentService, SystemClock,
};
use warden_core::{ActorIdentity, AppError};
use warden_domain::{
    GrantExpectation, GrantTarget, ImplicationMap, Permission, PermissionName, Role, RoleName,
};

use super::InMemorySecurityStore;

fn permission(name: &str) -> Permission {
    Permission::new(
        PermissionName::parse(name).unwrap_or_else(|_| unreachable!()),
        None,
    )
}

fn role(name: &str) -> Role {
    Role::new(
        RoleName::parse(name).unwrap_or_else(|_| unreachable!()),
        None,
    )
}

#[tokio::test]
async fn save_permission_rejects_case_insensitive_duplicates() {
    let store = InMemorySecurityStore::new();

    assert!(store.save_permission(permission("products:read")).await.is_ok());
    let duplicate = store.save_permission(permission("PRODUCTS:READ")).await;

    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn normalized_lookup_resolves_catalog_spelling() {
    let store = InMemorySecurityStore::new();
    assert!(store.save_permission(permission("Products:Read")).await.is_ok());

    let found = store
        .get_permissions_by_normalized_names(&["PRODUCTS:READ".to_owned(), "MISSING".to_owned()])
        .await
        .unwrap_or_default();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name.as_str(), "Products:Read");
}

#[tokio::test]
async fn link_restamps_every_row_of_the_target() {
    let store = InMemorySecurityStore::new();
    let read = permission("products:read");
    let create = permission("products:create");
    let manager = role("Manager");
    assert!(store.save_permission(read.clone()).await.is_ok());
    assert!(store.save_permission(create.clone()).await.is_ok());
    assert!(store.save_role(manager.clone()).await.is_ok());
    let target = GrantTarget::Role(manager.id);

    let first = store
        .link_permissions(target, &[read.id], "alice", Utc::now())
        .await
        .unwrap_or_else(|_| unreachable!());
    let second = store
        .link_permissions(target, &[create.id], "bob", Utc::now())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_ne!(first, second);

    let grants = store.list_grants(target).await.unwrap_or_default();
    assert_eq!(grants.len(), 2);
    for granted in &grants {
        assert_eq!(granted.grant.concurrency_token, second);
        assert_eq!(granted.grant.audit.modified_by, "bob");
    }
    let read_grant = grants
        .iter()
        .find(|granted| granted.permission.id == read.id)
        .map(|granted| granted.grant.audit.created_by.as_str());
    assert_eq!(read_grant, Some("alice"));
}

#[tokio::test]
async fn stale_unlink_deletes_nothing() {
    let store = InMemorySecurityStore::new();
    let read = permission("products:read");
    let create = permission("products:create");
    let manager = role("Manager");
    assert!(store.save_permission(read.clone()).await.is_ok());
    assert!(store.save_permission(create.clone()).await.is_ok());
    assert!(store.save_role(manager.clone()).await.is_ok());
    let target = GrantTarget::Role(manager.id);

    let original = store
        .link_permissions(target, &[read.id, create.id], "alice", Utc::now())
        .await
        .unwrap_or_else(|_| unreachable!());
    let first = store
        .unlink_permissions(
            target,
            &[GrantExpectation {
                permission_id: read.id,
                concurrency_token: original,
            }],
            "alice",
            Utc::now(),
        )
        .await;
    assert!(first.is_ok());

    let second = store
        .unlink_permissions(
            target,
            &[GrantExpectation {
                permission_id: create.id,
                concurrency_token: original,
            }],
            "bob",
            Utc::now(),
        )
        .await;

    assert!(matches!(second, Err(AppError::ConcurrencyConflict(_))));
    assert_eq!(store.list_grants(target).await.unwrap_or_default().len(), 1);
}

#[tokio::test]
async fn concurrent_removes_with_same_token_commit_once() {
    let store = Arc::new(InMemorySecurityStore::new());
    let clock = Arc::new(SystemClock);
    let grants = GrantMutationService::new(store.clone(), store.clone(), clock.clone());
    let users = RoleAssignmentService::new(store.clone(), store.clone(), store.clone(), clock);
    let cancel = CancellationToken::new();
    let actor = ActorIdentity::system();
    for name in ["products:read", "products:create", "orders:read"] {
        assert!(store.save_permission(permission(name)).await.is_ok());
    }
    let user = users
        .register_user("alice", None, &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    let original = grants
        .add_permissions_to_user(
            &actor,
            user.id,
            &["products:read", "products:create", "orders:read"],
            &cancel,
        )
        .await
        .unwrap_or_else(|_| unreachable!())
        .concurrency_token;

    let (left, right) = tokio::join!(
        grants.remove_permissions_from_user(
            &actor,
            user.id,
            &["products:read"],
            original,
            &cancel
        ),
        grants.remove_permissions_from_user(
            &actor,
            user.id,
            &["orders:read"],
            original,
            &cancel
        ),
    );

    let committed = [left.is_ok(), right.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(committed, 1);
    assert!(
        [left, right]
            .iter()
            .any(|result| matches!(result, Err(AppError::ConcurrencyConflict(_))))
    );
    assert_eq!(
        store
            .list_grants(GrantTarget::User(user.id))
            .await
            .unwrap_or_default()
            .len(),
        2
    );
}

#[tokio::test]
async fn seeded_store_serves_effective_permissions_and_claims() {
    let store = Arc::new(InMemorySecurityStore::new());
    let clock = Arc::new(SystemClock);
    let implications = Arc::new(ImplicationMap::builtin());
    let grants = GrantMutationService::new(store.clone(), store.clone(), clock.clone());
    let seeder = CatalogSeedService::new(store.clone(), grants, store.clone(), clock.clone());
    let users = RoleAssignmentService::new(store.clone(), store.clone(), store.clone(), clock);
    let aggregator = PermissionAggregator::new(store.clone(), implications.clone());
    let issuer = ClaimIssuer::new(store.clone(), implications);
    let cancel = CancellationToken::new();
    let actor = ActorIdentity::system();

    assert!(seeder.seed(&actor, &cancel).await.is_ok());
    let user = users
        .register_user("manager", None, &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    let manager = users
        .find_role_by_name("Manager", &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(
        users
            .assign_role(&actor, user.id, manager.id, &cancel)
            .await
            .is_ok()
    );

    let effective = aggregator
        .get_effective_permissions(user.id, &cancel)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(effective.contains("products:delete"));
    assert!(effective.contains("invoices:read"));
    assert!(!effective.contains("invoices:delete"));

    let claims = issuer
        .issue_claims(user.id, &cancel)
        .await
        .unwrap_or_default();
    let effective_names: BTreeSet<String> = effective
        .effective_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    assert_eq!(claims.permissions, effective_names);
    assert!(!store.audit_events().await.is_empty());
}
