//! Role router tests: one-time role choice, the role cache and the admin
//! allow-list.

mod common;

use healthscript::auth::identity::Identity;
use healthscript::auth::role::{self, Role, RolePolicy};
use healthscript::errors::AppError;
use common::*;

#[tokio::test]
async fn test_role_is_chosen_once_and_cached() {
    let db = setup_test_db();
    let ident = Identity::new("user_1", "alice@example.com");

    assert_eq!(role::cached_role(&db, &ident.id).await.unwrap(), None);

    let assignment = role::assign_role(&db, &ident, Role::Patient, &RolePolicy::default())
        .await
        .unwrap();
    assert_eq!(assignment.role, Role::Patient);
    assert_eq!(role::cached_role(&db, &ident.id).await.unwrap(), Some(Role::Patient));

    let second = role::assign_role(&db, &ident, Role::Practitioner, &RolePolicy::default()).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(role::cached_role(&db, &ident.id).await.unwrap(), Some(Role::Patient));
}

#[tokio::test]
async fn test_admin_needs_allow_list_entry() {
    let db = setup_test_db();
    let policy = RolePolicy {
        admin_emails: vec!["boss@example.com".to_string()],
    };
    let outsider = Identity::new("user_2", "outsider@example.com");
    let boss = Identity::new("user_3", "Boss@Example.com");

    let denied = role::assign_role(&db, &outsider, Role::Admin, &policy).await;
    assert!(matches!(denied, Err(AppError::Validation(_))));
    assert_eq!(role::cached_role(&db, &outsider.id).await.unwrap(), None);

    role::assign_role(&db, &boss, Role::Admin, &policy).await.unwrap();
    assert_eq!(role::cached_role(&db, &boss.id).await.unwrap(), Some(Role::Admin));
}

#[tokio::test]
async fn test_role_counts() {
    let db = setup_test_db();
    let policy = RolePolicy::default();
    for (id, role) in [("a", Role::Practitioner), ("b", Role::Patient), ("c", Role::Patient)] {
        let ident = Identity::new(id, format!("{id}@example.com"));
        role::assign_role(&db, &ident, role, &policy).await.unwrap();
    }

    let counts = role::role_counts(&db).await.unwrap();
    assert_eq!(counts.practitioners, 1);
    assert_eq!(counts.patients, 2);
    assert_eq!(counts.admins, 0);
    assert_eq!(role::list_assignments(&db).await.unwrap().len(), 3);
}
