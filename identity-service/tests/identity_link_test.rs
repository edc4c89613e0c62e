//! Identity-linking resolution tests, driven directly against the linker
//! with in-memory stores.

mod common;

use std::sync::Arc;

use common::TestClock;
use identity_service::{
    models::{OAuthUserInfo, User},
    services::{AuditLogger, AuthError, IdentityLinker, RecordingAuditSink},
    stores::{IdentityLinkStore, MemoryIdentityLinkStore, MemoryUserStore},
    utils::Argon2Hasher,
};

struct LinkerHarness {
    users: Arc<MemoryUserStore>,
    links: Arc<MemoryIdentityLinkStore>,
    clock: Arc<TestClock>,
    linker: IdentityLinker,
}

fn linker_harness() -> LinkerHarness {
    let users = Arc::new(MemoryUserStore::new());
    let links = Arc::new(MemoryIdentityLinkStore::new());
    let clock = Arc::new(TestClock::new());
    let linker = IdentityLinker::new(
        users.clone(),
        links.clone(),
        Arc::new(Argon2Hasher),
        clock.clone(),
        AuditLogger::new(Arc::new(RecordingAuditSink::new())),
    );
    LinkerHarness {
        users,
        links,
        clock,
        linker,
    }
}

fn oauth_info(provider: &str, id: &str, email: Option<&str>, name: Option<&str>) -> OAuthUserInfo {
    OAuthUserInfo {
        provider: provider.to_string(),
        provider_user_id: id.to_string(),
        email: email.map(String::from),
        name: name.map(String::from),
        picture: Some("https://img.example/avatar.png".to_string()),
        raw: serde_json::Map::new(),
    }
}

fn seed_user(users: &MemoryUserStore, username: &str, email: &str, is_active: bool) -> User {
    let user = User {
        id: uuid::Uuid::new_v4(),
        username: username.to_string(),
        email: Some(email.to_string()),
        password_hash: "$argon2id$fake".to_string(),
        full_name: None,
        avatar_url: None,
        is_active,
        is_oauth_user: false,
        created_at: chrono::Utc::now(),
        registration_ip: None,
    };
    users.insert_raw(user.clone());
    user
}

#[tokio::test]
async fn unknown_identity_creates_a_new_account() {
    let h = linker_harness();
    let info = oauth_info("google", "g-123", Some("new.person@example.com"), Some("New Person"));

    let user = h.linker.resolve(&info, "1.2.3.4", None).await.unwrap();

    assert!(user.is_active);
    assert!(user.is_oauth_user);
    assert_eq!(user.email.as_deref(), Some("new.person@example.com"));
    assert!(user.username.starts_with("new.person_"));
    assert_eq!(user.avatar_url.as_deref(), Some("https://img.example/avatar.png"));
    assert_eq!(h.links.len(), 1);

    let link = h
        .links
        .find_by_provider_identity("google", "g-123")
        .await
        .unwrap()
        .expect("link created");
    assert_eq!(link.user_id, user.id);
}

#[tokio::test]
async fn resolution_is_idempotent_for_the_same_external_identity() {
    let h = linker_harness();
    let info = oauth_info("google", "g-123", Some("person@example.com"), None);

    let first = h.linker.resolve(&info, "1.2.3.4", None).await.unwrap();
    let second = h.linker.resolve(&info, "5.6.7.8", None).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.links.len(), 1);
}

#[tokio::test]
async fn email_match_links_to_the_existing_account() {
    let h = linker_harness();
    let existing = seed_user(&h.users, "alice", "alice@example.com", true);

    // New external identity, same email (different case to boot)
    let info = oauth_info("github", "gh-42", Some("Alice@Example.com"), None);
    let resolved = h.linker.resolve(&info, "1.2.3.4", None).await.unwrap();

    assert_eq!(resolved.id, existing.id);
    assert_eq!(h.links.len(), 1);
}

#[tokio::test]
async fn linked_login_touches_last_login_fields() {
    let h = linker_harness();
    let info = oauth_info("google", "g-9", Some("p@example.com"), None);

    h.linker.resolve(&info, "1.1.1.1", None).await.unwrap();
    let before = h
        .links
        .find_by_provider_identity("google", "g-9")
        .await
        .unwrap()
        .unwrap();

    h.clock.advance_minutes(42);
    h.linker.resolve(&info, "2.2.2.2", None).await.unwrap();

    let after = h
        .links
        .find_by_provider_identity("google", "g-9")
        .await
        .unwrap()
        .unwrap();
    assert!(after.last_login_at > before.last_login_at);
    assert_eq!(after.last_login_ip.as_deref(), Some("2.2.2.2"));
}

#[tokio::test]
async fn linked_but_deactivated_account_cannot_sign_in() {
    let h = linker_harness();
    let info = oauth_info("google", "g-7", Some("gone@example.com"), None);

    let user = h.linker.resolve(&info, "1.2.3.4", None).await.unwrap();

    // Deactivate the account, then try the same identity again
    let mut updated = user.clone();
    updated.is_active = false;
    h.users.insert_raw(updated);

    let result = h.linker.resolve(&info, "1.2.3.4", None).await;
    assert!(matches!(result, Err(AuthError::AccountInactive)));
}

#[tokio::test]
async fn identity_without_email_gets_a_provider_derived_username() {
    let h = linker_harness();
    let info = oauth_info("github", "gh-1", None, None);

    let user = h.linker.resolve(&info, "1.2.3.4", None).await.unwrap();

    assert!(user.username.starts_with("github_user_"));
    assert_eq!(user.email, None);
}

#[tokio::test]
async fn two_providers_for_the_same_email_share_one_account() {
    let h = linker_harness();

    let google = oauth_info("google", "g-1", Some("dual@example.com"), None);
    let github = oauth_info("github", "gh-1", Some("dual@example.com"), None);

    let via_google = h.linker.resolve(&google, "1.2.3.4", None).await.unwrap();
    let via_github = h.linker.resolve(&github, "1.2.3.4", None).await.unwrap();

    assert_eq!(via_google.id, via_github.id);
    assert_eq!(h.links.len(), 2);
}
