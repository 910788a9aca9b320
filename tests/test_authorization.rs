// Integration tests for ACL-based access decisions against a real database
//
// These tests verify:
// 1. Administrator bypass, with and without an ACL
// 2. Fail-closed behavior for principals without a matching record
// 3. Principal, group and role holders, including live group membership
// 4. Identical decisions with the subject cache enabled and disabled

mod helpers;

use helpers::{AclBuilder, PrincipalBuilder, TestDb};
use vocab_acl::authz::{
    AccessLevel, AuthorizationService, PermissionHolder, PrincipalDirectory, PrincipalRef, SubjectId,
};

async fn assert_access(
    authz: &AuthorizationService,
    principal: &PrincipalRef,
    subject: &str,
    expected: [bool; 3],
) {
    let subject = SubjectId::from(subject);
    let actual = [
        authz.can_read(principal, &subject).await.expect("can_read"),
        authz
            .can_modify(principal, &subject)
            .await
            .expect("can_modify"),
        authz
            .can_remove(principal, &subject)
            .await
            .expect("can_remove"),
    ];
    assert_eq!(
        actual, expected,
        "[read, modify, remove] for {} on {}",
        principal.id, subject
    );
}

/// An administrator is authorized for everything, including unprotected subjects
#[tokio::test]
async fn test_administrator_is_authorized_everywhere() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (_, authz) = test_db.services(true);

    let admin = PrincipalBuilder::new("root")
        .administrator()
        .create(&directory)
        .await;
    assert!(admin.is_administrator());

    AclBuilder::new("acl-empty")
        .persist(authz.store(), "vocab/empty")
        .await;

    assert_access(&authz, &admin, "vocab/empty", [true, true, true]).await;
    assert_access(&authz, &admin, "vocab/unprotected", [true, true, true]).await;
}

/// A principal without a matching record gets nothing
#[tokio::test]
async fn test_unmatched_principal_is_denied() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (_, authz) = test_db.services(true);

    AclBuilder::new("acl-1")
        .principal("r1", "someone-else", AccessLevel::Security)
        .role("r2", "curator", AccessLevel::Security)
        .persist(authz.store(), "vocab/a")
        .await;

    let user = PrincipalBuilder::new("u1")
        .with_role("reader")
        .create(&directory)
        .await;
    assert_access(&authz, &user, "vocab/a", [false, false, false]).await;
    assert_access(&authz, &user, "vocab/unprotected", [false, false, false]).await;
}

/// WRITE on a principal record grants read and modify but not remove
#[tokio::test]
async fn test_principal_write_record() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (_, authz) = test_db.services(true);

    let user = PrincipalBuilder::new("u1").create(&directory).await;
    AclBuilder::new("acl-1")
        .principal("r1", "u1", AccessLevel::Write)
        .persist(authz.store(), "vocab/a")
        .await;

    assert_access(&authz, &user, "vocab/a", [true, true, false]).await;
}

/// SECURITY on a group record follows the group's current membership
#[tokio::test]
async fn test_group_record_follows_membership() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (_, authz) = test_db.services(true);

    let alice = PrincipalBuilder::new("alice")
        .in_group("curators")
        .create(&directory)
        .await;
    let bob = PrincipalBuilder::new("bob")
        .in_group("curators")
        .create(&directory)
        .await;

    AclBuilder::new("acl-1")
        .group("r1", "curators", AccessLevel::Security)
        .persist(authz.store(), "vocab/a")
        .await;

    assert_access(&authz, &alice, "vocab/a", [true, true, true]).await;
    assert_access(&authz, &bob, "vocab/a", [true, true, true]).await;

    // Membership change is visible on the very next check, cache or not
    directory
        .remove_group_member(&"curators".into(), &"alice".into())
        .await
        .expect("Failed to remove member");

    assert_access(&authz, &alice, "vocab/a", [false, false, false]).await;
    assert_access(&authz, &bob, "vocab/a", [true, true, true]).await;
}

/// Mixed role and principal records
#[tokio::test]
async fn test_reviewer_scenario() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (_, authz) = test_db.services(true);

    AclBuilder::new("acl-x")
        .role("r1", "reviewer", AccessLevel::Read)
        .principal("r2", "u7", AccessLevel::Write)
        .persist(authz.store(), "vocab/x")
        .await;

    let u7 = PrincipalBuilder::new("u7").create(&directory).await;
    let u9 = PrincipalBuilder::new("u9")
        .with_role("reviewer")
        .create(&directory)
        .await;

    let subject = SubjectId::from("vocab/x");
    assert!(authz.can_modify(&u7, &subject).await.unwrap());
    assert!(!authz.can_remove(&u7, &subject).await.unwrap());
    assert!(authz.can_read(&u9, &subject).await.unwrap());
    assert!(!authz.can_modify(&u9, &subject).await.unwrap());

    assert_eq!(
        authz.access_level_for(&u7, &subject).await.unwrap(),
        AccessLevel::Write
    );
    assert_eq!(
        authz.access_level_for(&u9, &subject).await.unwrap(),
        AccessLevel::Read
    );
}

/// Revoking a role takes effect once the principal is resolved again
#[tokio::test]
async fn test_role_revocation() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (_, authz) = test_db.services(true);

    AclBuilder::new("acl-1")
        .role("r1", "editor", AccessLevel::Write)
        .persist(authz.store(), "vocab/a")
        .await;

    let editor = PrincipalBuilder::new("u1")
        .with_role("editor")
        .create(&directory)
        .await;
    assert_access(&authz, &editor, "vocab/a", [true, true, false]).await;

    directory
        .revoke_role(&"u1".into(), &"editor".into())
        .await
        .unwrap();
    let resolved = directory
        .resolve_principal(&"u1".into())
        .await
        .unwrap()
        .unwrap();
    assert_access(&authz, &resolved, "vocab/a", [false, false, false]).await;
}

/// Decisions are the same with and without the subject cache
#[tokio::test]
async fn test_cache_does_not_change_decisions() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (acls, cached) = test_db.services(true);
    let (_, uncached) = test_db.services(false);

    let owner = PrincipalBuilder::new("owner").create(&directory).await;
    let reader = PrincipalBuilder::new("reader")
        .with_role("reader")
        .create(&directory)
        .await;
    let subject = SubjectId::from("vocab/a");

    acls.create_for_subject(&subject, &owner).await.unwrap();

    for authz in [&cached, &uncached] {
        assert_access(authz, &owner, "vocab/a", [true, true, true]).await;
        assert_access(authz, &reader, "vocab/a", [true, false, false]).await;
    }

    // Narrow the list through the cached store; the uncached store must agree
    let acl = acls.find_for_subject_required(&subject).await.unwrap();
    let reader_record = acl
        .records()
        .find(|r| r.holder() == &PermissionHolder::Role("reader".into()))
        .map(|r| r.id().clone())
        .expect("default reader grant");
    acls.remove_record(&subject, &reader_record).await.unwrap();

    for authz in [&cached, &uncached] {
        assert_access(authz, &reader, "vocab/a", [false, false, false]).await;
    }

    acls.remove_for_subject(&subject).await.unwrap();
    for authz in [&cached, &uncached] {
        assert_access(authz, &owner, "vocab/a", [false, false, false]).await;
    }
}

/// Listing readable subjects for a principal
#[tokio::test]
async fn test_filter_readable() {
    let test_db = TestDb::new().await;
    let directory = test_db.directory();
    let (_, authz) = test_db.services(true);

    let user = PrincipalBuilder::new("u1")
        .in_group("team")
        .create(&directory)
        .await;
    AclBuilder::new("acl-a")
        .group("r1", "team", AccessLevel::Read)
        .persist(authz.store(), "vocab/a")
        .await;
    AclBuilder::new("acl-b")
        .principal("r2", "u2", AccessLevel::Read)
        .persist(authz.store(), "vocab/b")
        .await;

    let readable = authz
        .filter_readable(&user, ["vocab/a", "vocab/b", "vocab/c"].map(SubjectId::from))
        .await
        .unwrap();
    assert_eq!(readable, vec![SubjectId::from("vocab/a")]);
}
