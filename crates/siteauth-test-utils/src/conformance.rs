// Behavioral checks every `Adapter` implementation must pass.
//
// Each check panics with a descriptive message on failure, so a backend's test
// file can call them one per `#[tokio::test]` or all at once via `run_all`.

use chrono::Duration;

use siteauth_core::{Adapter, AuthStoreError, NewUser, Session, SessionUpdate, UserUpdate, VerificationToken};

use crate::fixtures;

/// Run every check against one adapter, in order.
pub async fn run_all(adapter: &dyn Adapter) {
    let name = adapter.name();
    tracing::info!(adapter = name, "running adapter conformance checks");

    create_then_fetch_user(adapter).await;
    update_user_merges_fields(adapter).await;
    update_missing_user_returns_none(adapter).await;
    link_account_resolves_owner(adapter).await;
    unlink_account_removes_link(adapter).await;
    accounts_listed_per_user(adapter).await;
    session_lifecycle(adapter).await;
    update_session_keeps_token(adapter).await;
    create_session_rejects_missing_fields(adapter).await;
    dangling_user_references_rejected(adapter).await;
    verification_token_is_single_use(adapter).await;
    create_verification_token_rejects_missing_fields(adapter).await;
    delete_user_cascades(adapter).await;
    delete_missing_keys_return_none(adapter).await;
    expired_records_are_swept(adapter).await;

    tracing::info!(adapter = name, "adapter conformance checks passed");
}

pub async fn create_then_fetch_user(adapter: &dyn Adapter) {
    let email = fixtures::unique_email("a");
    let created = adapter
        .create_user(NewUser::new("A", email.clone()))
        .await
        .expect("create_user failed");
    assert!(!created.id.is_empty(), "created user has no id");
    assert_eq!(created.email, email);
    assert_eq!(created.name.as_deref(), Some("A"));

    let by_id = adapter
        .get_user(&created.id)
        .await
        .expect("get_user failed")
        .expect("user not found by id");
    assert_eq!(by_id, created);

    let by_email = adapter
        .get_user_by_email(&email)
        .await
        .expect("get_user_by_email failed")
        .expect("user not found by email");
    assert_eq!(by_email.id, created.id);

    let unknown = adapter
        .get_user_by_email(&fixtures::unique_email("nobody"))
        .await
        .expect("get_user_by_email failed");
    assert!(unknown.is_none(), "unknown email resolved to a user");
}

pub async fn update_user_merges_fields(adapter: &dyn Adapter) {
    let created = adapter
        .create_user(fixtures::new_user("Bea"))
        .await
        .expect("create_user failed");
    let verified_at = fixtures::now();

    let updated = adapter
        .update_user(UserUpdate {
            name: Some("Beatrice".into()),
            email_verified: Some(verified_at),
            ..UserUpdate::new(created.id.clone())
        })
        .await
        .expect("update_user failed")
        .expect("update_user found nothing");
    assert_eq!(updated.name.as_deref(), Some("Beatrice"));
    assert_eq!(updated.email_verified, Some(verified_at));
    assert_eq!(updated.email, created.email, "untouched field changed");
    assert_eq!(updated.image, created.image, "untouched field changed");

    let fetched = adapter
        .get_user(&created.id)
        .await
        .expect("get_user failed")
        .expect("updated user vanished");
    assert_eq!(fetched, updated);
}

pub async fn update_missing_user_returns_none(adapter: &dyn Adapter) {
    let missing = adapter
        .update_user(UserUpdate {
            name: Some("Ghost".into()),
            ..UserUpdate::new("user_does_not_exist")
        })
        .await
        .expect("update_user failed");
    assert!(missing.is_none(), "update of a missing user returned a record");
    assert!(adapter
        .get_user("user_does_not_exist")
        .await
        .expect("get_user failed")
        .is_none());
}

pub async fn link_account_resolves_owner(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Cy"))
        .await
        .expect("create_user failed");
    let account = fixtures::github_account(&user.id);

    let linked = adapter
        .link_account(account.clone())
        .await
        .expect("link_account failed");
    assert!(linked.id.is_some(), "linked account has no id");
    assert_eq!(linked.provider_account_id, account.provider_account_id);
    assert_eq!(linked.access_token, account.access_token);
    assert_eq!(linked.expires_at, account.expires_at);

    let owner = adapter
        .get_user_by_account(&account.provider, &account.provider_account_id)
        .await
        .expect("get_user_by_account failed")
        .expect("owner not found");
    assert_eq!(owner.id, user.id);

    let other = adapter
        .get_user_by_account("google", &account.provider_account_id)
        .await
        .expect("get_user_by_account failed");
    assert!(other.is_none(), "lookup matched on account id alone");
}

pub async fn unlink_account_removes_link(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Dee"))
        .await
        .expect("create_user failed");
    let account = adapter
        .link_account(fixtures::github_account(&user.id))
        .await
        .expect("link_account failed");

    let removed = adapter
        .unlink_account(&account.provider, &account.provider_account_id)
        .await
        .expect("unlink_account failed")
        .expect("unlink_account found nothing");
    assert_eq!(removed.user_id, user.id);

    assert!(adapter
        .get_user_by_account(&account.provider, &account.provider_account_id)
        .await
        .expect("get_user_by_account failed")
        .is_none());
    assert!(adapter
        .get_user(&user.id)
        .await
        .expect("get_user failed")
        .is_some(), "unlinking removed the user");
}

pub async fn accounts_listed_per_user(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Eve"))
        .await
        .expect("create_user failed");
    adapter
        .link_account(fixtures::github_account(&user.id))
        .await
        .expect("link_account failed");
    adapter
        .link_account(fixtures::github_account(&user.id))
        .await
        .expect("link_account failed");

    let accounts = adapter
        .get_accounts_for_user(&user.id)
        .await
        .expect("get_accounts_for_user failed");
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a.user_id == user.id));
}

pub async fn session_lifecycle(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Fay"))
        .await
        .expect("create_user failed");
    let session = fixtures::session_for(&user.id, Duration::days(30));

    let created = adapter
        .create_session(session.clone())
        .await
        .expect("create_session failed");
    assert_eq!(created, session);

    let found = adapter
        .get_session_and_user(&session.session_token)
        .await
        .expect("get_session_and_user failed")
        .expect("session not found");
    assert_eq!(found.session, session);
    assert_eq!(found.user.id, user.id);

    let deleted = adapter
        .delete_session(&session.session_token)
        .await
        .expect("delete_session failed")
        .expect("delete_session found nothing");
    assert_eq!(deleted.session_token, session.session_token);
    assert!(adapter
        .get_session_and_user(&session.session_token)
        .await
        .expect("get_session_and_user failed")
        .is_none());
}

pub async fn update_session_keeps_token(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Gus"))
        .await
        .expect("create_user failed");
    let session = adapter
        .create_session(fixtures::session_for(&user.id, Duration::hours(1)))
        .await
        .expect("create_session failed");
    let extended = session.expires + Duration::days(30);

    let updated = adapter
        .update_session(SessionUpdate::expires(session.session_token.clone(), extended))
        .await
        .expect("update_session failed")
        .expect("update_session found nothing");
    assert_eq!(updated.session_token, session.session_token);
    assert_eq!(updated.user_id, user.id);
    assert_eq!(updated.expires, extended);

    let found = adapter
        .get_session_and_user(&session.session_token)
        .await
        .expect("get_session_and_user failed")
        .expect("session vanished after update");
    assert_eq!(found.session.expires, extended);

    let missing = adapter
        .update_session(SessionUpdate::expires("no-such-token", extended))
        .await
        .expect("update_session failed");
    assert!(missing.is_none());
}

pub async fn create_session_rejects_missing_fields(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Hal"))
        .await
        .expect("create_user failed");
    let expires = fixtures::now() + Duration::hours(1);

    let err = adapter
        .create_session(Session::new("", user.id.clone(), expires))
        .await
        .expect_err("session without token was accepted");
    assert!(matches!(err, AuthStoreError::MissingField { .. }), "unexpected error: {err}");

    let token = fixtures::unique_token();
    let err = adapter
        .create_session(Session::new(token.clone(), "", expires))
        .await
        .expect_err("session without user id was accepted");
    assert!(matches!(err, AuthStoreError::MissingField { .. }), "unexpected error: {err}");

    assert!(adapter
        .get_session_and_user(&token)
        .await
        .expect("get_session_and_user failed")
        .is_none(), "rejected session was persisted");
}

/// Sessions and linked accounts must point at a stored user.
pub async fn dangling_user_references_rejected(adapter: &dyn Adapter) {
    let ghost = "user_never_created";

    let err = adapter
        .create_session(fixtures::session_for(ghost, Duration::hours(1)))
        .await
        .expect_err("session for an unknown user was stored");
    assert!(matches!(err, AuthStoreError::Constraint(_)), "unexpected error: {err}");

    let err = adapter
        .link_account(fixtures::github_account(ghost))
        .await
        .expect_err("account for an unknown user was stored");
    assert!(matches!(err, AuthStoreError::Constraint(_)), "unexpected error: {err}");
    assert!(adapter
        .get_accounts_for_user(ghost)
        .await
        .expect("get_accounts_for_user failed")
        .is_empty());
}

pub async fn verification_token_is_single_use(adapter: &dyn Adapter) {
    let identifier = fixtures::unique_email("verify");
    let token = fixtures::verification_token(&identifier, Duration::hours(24));

    let created = adapter
        .create_verification_token(token.clone())
        .await
        .expect("create_verification_token failed");
    assert_eq!(created, token);

    let wrong = adapter
        .use_verification_token(&identifier, "not-the-token")
        .await
        .expect("use_verification_token failed");
    assert!(wrong.is_none(), "wrong token was accepted");

    let used = adapter
        .use_verification_token(&identifier, &token.token)
        .await
        .expect("use_verification_token failed")
        .expect("token not found on first use");
    assert_eq!(used, token);

    let again = adapter
        .use_verification_token(&identifier, &token.token)
        .await
        .expect("use_verification_token failed");
    assert!(again.is_none(), "token consumed twice");
}

pub async fn create_verification_token_rejects_missing_fields(adapter: &dyn Adapter) {
    let expires = fixtures::now() + Duration::hours(1);

    let err = adapter
        .create_verification_token(VerificationToken::new("", "abc", expires))
        .await
        .expect_err("token without identifier was accepted");
    assert!(matches!(err, AuthStoreError::MissingField { .. }), "unexpected error: {err}");

    let identifier = fixtures::unique_email("blank");
    let err = adapter
        .create_verification_token(VerificationToken::new(identifier.clone(), "", expires))
        .await
        .expect_err("token without token value was accepted");
    assert!(matches!(err, AuthStoreError::MissingField { .. }), "unexpected error: {err}");

    assert!(adapter
        .use_verification_token(&identifier, "")
        .await
        .expect("use_verification_token failed")
        .is_none(), "rejected token was persisted");
}

pub async fn delete_user_cascades(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Ida"))
        .await
        .expect("create_user failed");
    let account = adapter
        .link_account(fixtures::github_account(&user.id))
        .await
        .expect("link_account failed");
    let session = adapter
        .create_session(fixtures::session_for(&user.id, Duration::days(1)))
        .await
        .expect("create_session failed");

    let bystander = adapter
        .create_user(fixtures::new_user("Jo"))
        .await
        .expect("create_user failed");
    let bystander_session = adapter
        .create_session(fixtures::session_for(&bystander.id, Duration::days(1)))
        .await
        .expect("create_session failed");

    let deleted = adapter
        .delete_user(&user.id)
        .await
        .expect("delete_user failed")
        .expect("delete_user found nothing");
    assert_eq!(deleted.id, user.id);

    assert!(adapter.get_user(&user.id).await.expect("get_user failed").is_none());
    assert!(adapter
        .get_session_and_user(&session.session_token)
        .await
        .expect("get_session_and_user failed")
        .is_none(), "session survived user deletion");
    assert!(adapter
        .get_user_by_account(&account.provider, &account.provider_account_id)
        .await
        .expect("get_user_by_account failed")
        .is_none(), "account survived user deletion");
    assert!(adapter
        .get_accounts_for_user(&user.id)
        .await
        .expect("get_accounts_for_user failed")
        .is_empty());

    assert!(adapter
        .get_session_and_user(&bystander_session.session_token)
        .await
        .expect("get_session_and_user failed")
        .is_some(), "another user's session was deleted");
}

pub async fn delete_missing_keys_return_none(adapter: &dyn Adapter) {
    assert!(adapter
        .delete_user("user_does_not_exist")
        .await
        .expect("delete_user failed")
        .is_none());
    assert!(adapter
        .delete_session("no-such-session")
        .await
        .expect("delete_session failed")
        .is_none());
    assert!(adapter
        .unlink_account("github", "no-such-account")
        .await
        .expect("unlink_account failed")
        .is_none());
}

pub async fn expired_records_are_swept(adapter: &dyn Adapter) {
    let user = adapter
        .create_user(fixtures::new_user("Ivo"))
        .await
        .expect("create_user failed");
    let stale = adapter
        .create_session(fixtures::session_for(&user.id, -Duration::hours(1)))
        .await
        .expect("create_session failed");
    let live = adapter
        .create_session(fixtures::session_for(&user.id, Duration::hours(1)))
        .await
        .expect("create_session failed");
    let identifier = fixtures::unique_email("sweep");
    adapter
        .create_verification_token(fixtures::verification_token(&identifier, -Duration::hours(1)))
        .await
        .expect("create_verification_token failed");
    let fresh = adapter
        .create_verification_token(fixtures::verification_token(&identifier, Duration::hours(1)))
        .await
        .expect("create_verification_token failed");

    let now = fixtures::now();
    let sessions = adapter
        .delete_expired_sessions(now)
        .await
        .expect("delete_expired_sessions failed");
    assert!(sessions >= 1, "stale session was not swept");
    let tokens = adapter
        .delete_expired_verification_tokens(now)
        .await
        .expect("delete_expired_verification_tokens failed");
    assert!(tokens >= 1, "stale verification token was not swept");

    assert_eq!(
        adapter
            .delete_expired_sessions(now)
            .await
            .expect("delete_expired_sessions failed"),
        0
    );
    assert!(adapter
        .delete_session(&stale.session_token)
        .await
        .expect("delete_session failed")
        .is_none());
    assert!(adapter
        .get_session_and_user(&live.session_token)
        .await
        .expect("get_session_and_user failed")
        .is_some());
    assert_eq!(
        adapter
            .use_verification_token(&identifier, &fresh.token)
            .await
            .expect("use_verification_token failed"),
        Some(fresh)
    );
}
