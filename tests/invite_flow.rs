//! Invite Flow Tests
//!
//! Integration tests for issuing, refreshing and accepting invites.

mod common;

use common::{admin, client, TestGallery};
use folio::datetime::SECONDS_PER_DAY;
use folio::{FolderId, FolioError, MembershipStore, PrincipalClaims};

#[tokio::test]
async fn test_create_invite_twice_reuses_code() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;

    let first = t.gallery.create_invite(&admin(), "f1", None).await.unwrap();
    t.clock.advance(3600);
    let second = t.gallery.create_invite(&admin(), "/f1/", None).await.unwrap();

    assert_eq!(first.invite_code, second.invite_code);
    assert!(second.expires_at > first.expires_at);
    assert_eq!(first.expires_at, common::T0 + 30 * SECONDS_PER_DAY);
}

#[tokio::test]
async fn test_create_invite_errors() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;

    assert!(matches!(
        t.gallery.create_invite(&client("ann"), "f1", None).await,
        Err(FolioError::Forbidden(_))
    ));
    assert!(matches!(
        t.gallery.create_invite(&admin(), "ghost", None).await,
        Err(FolioError::NotFound(_))
    ));
    assert!(matches!(
        t.gallery.create_invite(&admin(), "../f1", None).await,
        Err(FolioError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_accept_invite_grants_membership() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;
    t.add_principal("ann", None).await;
    let invite = t.gallery.create_invite(&admin(), "f1", None).await.unwrap();

    let accepted = t
        .gallery
        .accept_invite(&client("ann"), &format!("  {}  ", invite.invite_code))
        .await
        .unwrap();

    assert_eq!(accepted.folder_id.as_str(), "f1");
    assert!(accepted.membership_created);
    assert!(accepted.home_folder_set);

    let profile = t.profile("ann").await;
    assert_eq!(profile.home_folder_id.as_deref(), Some("f1"));
    assert!(t.identity.groups_of("ann").await.contains("user"));

    let folders = t.gallery.list_user_folders(&client("ann")).await.unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].folder_id, "f1");
}

#[tokio::test]
async fn test_accept_twice_is_idempotent() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;
    t.create_folder("f2").await;
    t.add_principal("ann", Some("f2")).await;
    let invite = t.gallery.create_invite(&admin(), "f1", None).await.unwrap();
    let claims = client("ann").with_home_folder("f2");

    let first = t.gallery.accept_invite(&claims, &invite.invite_code).await.unwrap();
    let second = t.gallery.accept_invite(&claims, &invite.invite_code).await.unwrap();

    assert!(first.membership_created);
    assert!(!second.membership_created);
    assert!(!first.home_folder_set);

    let members = MembershipStore::new(t.gallery.database().pool())
        .list_by_folder(&FolderId::parse("f1").unwrap())
        .await
        .unwrap();
    assert_eq!(members.len(), 1);

    // The existing home folder is left alone
    let profile = t.profile("ann").await;
    assert_eq!(profile.home_folder_id.as_deref(), Some("f2"));
}

#[tokio::test]
async fn test_expired_invite_writes_nothing() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;
    t.add_principal("ann", None).await;
    let invite = t.gallery.create_invite(&admin(), "f1", Some(1)).await.unwrap();

    t.clock.set(invite.expires_at + 1);
    let result = t.gallery.accept_invite(&client("ann"), &invite.invite_code).await;
    assert!(matches!(result, Err(FolioError::Expired(_))));

    assert!(t.gallery.list_user_folders(&client("ann")).await.unwrap().is_empty());
    let profile = t.profile("ann").await;
    assert!(profile.home_folder_id.is_none());
    assert!(t.identity.groups_of("ann").await.is_empty());
}

#[tokio::test]
async fn test_accept_rejects_bad_codes() {
    let t = TestGallery::new().await;
    t.add_principal("ann", None).await;

    assert!(matches!(
        t.gallery.accept_invite(&client("ann"), "   ").await,
        Err(FolioError::InvalidArgument(_))
    ));
    assert!(matches!(
        t.gallery.accept_invite(&client("ann"), "does-not-exist").await,
        Err(FolioError::NotFound(_))
    ));
    assert!(matches!(
        t.gallery.accept_invite(&PrincipalClaims::new(""), "abc").await,
        Err(FolioError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_banned_principal_cannot_accept() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;
    t.add_principal("mallory", None).await;
    t.gallery
        .ban_folder_user(&admin(), "f1", "mallory")
        .await
        .unwrap();
    let invite = t.gallery.create_invite(&admin(), "f1", None).await.unwrap();

    let result = t.gallery.accept_invite(&client("mallory"), &invite.invite_code).await;
    assert!(matches!(result, Err(FolioError::Forbidden(_))));
    assert!(t
        .gallery
        .list_user_folders(&client("mallory"))
        .await
        .unwrap()
        .is_empty());

    t.gallery
        .unban_folder_user(&admin(), "f1", "mallory")
        .await
        .unwrap();
    assert!(t
        .gallery
        .accept_invite(&client("mallory"), &invite.invite_code)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_identity_failure_surfaces_as_upstream() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;
    t.add_principal("ann", None).await;
    t.identity.fail_for("ann").await;
    let invite = t.gallery.create_invite(&admin(), "f1", None).await.unwrap();

    let err = t
        .gallery
        .accept_invite(&client("ann"), &invite.invite_code)
        .await
        .unwrap_err();
    assert!(matches!(err, FolioError::Upstream(_)));
    assert_eq!(err.public_message(), "Request failed.");
}

#[tokio::test]
async fn test_purge_expired_invites() {
    let t = TestGallery::new().await;
    t.create_folder("f1").await;
    let invite = t.gallery.create_invite(&admin(), "f1", Some(1)).await.unwrap();

    assert_eq!(t.gallery.purge_expired_invites(&admin()).await.unwrap(), 0);
    t.clock.set(invite.expires_at + 1);
    assert_eq!(t.gallery.purge_expired_invites(&admin()).await.unwrap(), 1);
    assert!(matches!(
        t.gallery.accept_invite(&client("ann"), &invite.invite_code).await,
        Err(FolioError::NotFound(_))
    ));
}
