mod common;

use chrono::{TimeZone, Utc};
use common::{event, FakeDirectory, Membership};
use entitlement_bridge::registry::RegistryError;
use entitlement_bridge::services::{GroupCreationPolicy, Outcome, Reconciler};
use std::sync::Arc;

const MAIL: &str = "alice@example.org";
const UID: &str = "alice-uid";

fn reconciler(directory: &Arc<FakeDirectory>, patterns: &[&str]) -> Reconciler {
    let policy = GroupCreationPolicy::new(patterns).expect("valid patterns");
    Reconciler::new(directory.clone(), policy)
}

#[tokio::test]
async fn approve_creates_group_when_allowed() {
    let directory = FakeDirectory::new().with_person(5678, MAIL, UID).into_arc();
    let reconciler = reconciler(&directory, &["urn:test:*"]);

    let outcome = reconciler
        .approve(&event("urn:test:xyz", UID, MAIL))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::MembershipAdded { group_created: true });
    let groups = directory.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "urn:test:xyz");
    assert_eq!(
        directory.memberships(),
        vec![Membership {
            person_id: 5678,
            group_id: groups[0].id,
            valid_through: None,
        }]
    );
}

#[tokio::test]
async fn approve_uses_existing_group() {
    let directory = FakeDirectory::new()
        .with_person(5678, MAIL, UID)
        .with_group(2, "urn:other:abc")
        .into_arc();
    let reconciler = reconciler(&directory, &[]);

    let outcome = reconciler
        .approve(&event("urn:other:abc", UID, MAIL))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::MembershipAdded { group_created: false });
    assert_eq!(directory.count_calls("create_group"), 0);
    assert_eq!(directory.memberships()[0].group_id, 2);
}

#[tokio::test]
async fn approve_skips_missing_group_outside_allow_list() {
    let directory = FakeDirectory::new().with_person(5678, MAIL, UID).into_arc();
    let reconciler = reconciler(&directory, &["urn:test:*"]);

    let outcome = reconciler
        .approve(&event("urn:other:abc", UID, MAIL))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::GroupCreationDisallowed);
    assert!(directory.groups().is_empty());
    assert!(directory.memberships().is_empty());
    assert_eq!(directory.count_calls("create_group"), 0);
    assert_eq!(directory.count_calls("add_membership"), 0);
}

#[tokio::test]
async fn approve_replay_is_a_noop() {
    let directory = FakeDirectory::new().with_person(5678, MAIL, UID).into_arc();
    let reconciler = reconciler(&directory, &["*"]);
    let approve = event("urn:test:xyz", UID, MAIL);

    let first = reconciler.approve(&approve).await.unwrap();
    let second = reconciler.approve(&approve).await.unwrap();

    assert_eq!(first, Outcome::MembershipAdded { group_created: true });
    assert_eq!(second, Outcome::AlreadyMember);
    assert!(second.is_noop());
    assert_eq!(directory.groups().len(), 1);
    assert_eq!(directory.memberships().len(), 1);
}

#[tokio::test]
async fn approve_forwards_expiry() {
    let directory = FakeDirectory::new()
        .with_person(5678, MAIL, UID)
        .with_group(2, "urn:test:xyz")
        .into_arc();
    let reconciler = reconciler(&directory, &["*"]);
    let end = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let mut approve = event("urn:test:xyz", UID, MAIL);
    approve.expires_at = Some(end);

    reconciler.approve(&approve).await.unwrap();

    assert_eq!(directory.memberships()[0].valid_through, Some(end));
}

#[tokio::test]
async fn unknown_person_is_skipped() {
    let directory = FakeDirectory::new()
        .with_person(5678, MAIL, "someone-else")
        .with_group(2, "urn:test:xyz")
        .with_membership(5678, 2)
        .into_arc();
    let reconciler = reconciler(&directory, &["*"]);

    let approve = reconciler
        .approve(&event("urn:test:xyz", UID, MAIL))
        .await
        .unwrap();
    let revoke = reconciler
        .revoke(&event("urn:test:xyz", UID, MAIL))
        .await
        .unwrap();

    assert_eq!(approve, Outcome::PersonUnknown);
    assert_eq!(revoke, Outcome::PersonUnknown);
    assert_eq!(directory.count_calls("find_group"), 0);
    assert_eq!(directory.memberships().len(), 1);
}

#[tokio::test]
async fn revoke_removes_membership_then_replay_is_noop() {
    let directory = FakeDirectory::new()
        .with_person(5678, MAIL, UID)
        .with_group(2, "urn:test:xyz")
        .with_membership(5678, 2)
        .into_arc();
    let reconciler = reconciler(&directory, &["*"]);
    let revoke = event("urn:test:xyz", UID, MAIL);

    let first = reconciler.revoke(&revoke).await.unwrap();
    let second = reconciler.revoke(&revoke).await.unwrap();

    assert_eq!(first, Outcome::MembershipRemoved);
    assert_eq!(second, Outcome::NotAMember);
    assert!(directory.memberships().is_empty());
}

#[tokio::test]
async fn revoke_never_creates_groups() {
    let directory = FakeDirectory::new().with_person(5678, MAIL, UID).into_arc();
    let reconciler = reconciler(&directory, &["*"]);

    let outcome = reconciler
        .revoke(&event("urn:test:xyz", UID, MAIL))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::GroupAbsent);
    assert_eq!(directory.count_calls("create_group"), 0);
    assert_eq!(directory.count_calls("remove_membership"), 0);
}

#[tokio::test]
async fn api_errors_propagate() {
    let directory = FakeDirectory::new()
        .with_person(5678, MAIL, UID)
        .failing_on("urn:test:broken")
        .into_arc();
    let reconciler = reconciler(&directory, &["*"]);

    let err = reconciler
        .approve(&event("urn:test:broken", UID, MAIL))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Status { status: 500, .. }), "{err}");
    assert!(directory.groups().is_empty());
}
