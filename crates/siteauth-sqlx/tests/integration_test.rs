// Integration tests for SqliteAdapter, against in-memory and file-backed
// databases.

use chrono::{Duration, TimeZone, Utc};

use siteauth_core::{
    Adapter, AuthStoreError, NewUser, Session, SessionUpdate, UserUpdate, VerificationToken,
};
use siteauth_sqlx::{SqliteAdapter, SqliteOptions};
use siteauth_test_utils::{conformance, fixtures};

/// Helper: a fresh in-memory database with the schema applied.
async fn setup_adapter() -> SqliteAdapter {
    SqliteAdapter::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite in-memory")
}

#[tokio::test]
async fn test_sqlite_adapter_conformance() {
    let adapter = setup_adapter().await;
    conformance::run_all(&adapter).await;
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let adapter = setup_adapter().await;
    conformance::delete_user_cascades(&adapter).await;

    let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(adapter.pool())
        .await
        .unwrap();
    let (accounts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM login_provider_accounts")
        .fetch_one(adapter.pool())
        .await
        .unwrap();
    assert_eq!(users, 1, "only the bystander should remain");
    assert_eq!(accounts, 0);
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let adapter = setup_adapter().await;
    adapter.migrate().await.unwrap();
    adapter.migrate().await.unwrap();
    conformance::create_then_fetch_user(&adapter).await;
}

// ─── Persistence ─────────────────────────────────────────────────

#[tokio::test]
async fn test_records_survive_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("auth.db").display());

    let adapter = SqliteAdapter::connect(&url).await.unwrap();
    let user = adapter
        .create_user(fixtures::new_user("Kim"))
        .await
        .unwrap();
    let session = adapter
        .create_session(fixtures::session_for(&user.id, Duration::days(7)))
        .await
        .unwrap();
    adapter.close().await;

    let reopened = SqliteAdapter::connect_with(SqliteOptions {
        max_connections: 4,
        ..SqliteOptions::new(url)
    })
    .await
    .unwrap();
    let found = reopened
        .get_session_and_user(&session.session_token)
        .await
        .unwrap()
        .expect("session lost across reconnect");
    assert_eq!(found.user, user);
    assert_eq!(found.session, session);
}

#[tokio::test]
async fn test_timestamps_stored_as_datetime_text() {
    let adapter = setup_adapter().await;
    let user = adapter.create_user(fixtures::new_user("Lee")).await.unwrap();
    let session = adapter
        .create_session(fixtures::session_for(&user.id, Duration::hours(2)))
        .await
        .unwrap();

    let (stored,): (String,) =
        sqlx::query_as("SELECT CAST(expires AS TEXT) FROM sessions WHERE session_token = ?")
            .bind(&session.session_token)
            .fetch_one(adapter.pool())
            .await
            .unwrap();
    assert_eq!(stored, session.expires.format("%Y-%m-%d %H:%M:%S").to_string());
}

#[tokio::test]
async fn test_sub_second_expiry_is_truncated() {
    let adapter = setup_adapter().await;
    let user = adapter.create_user(fixtures::new_user("Max")).await.unwrap();
    let whole = fixtures::now() + Duration::hours(1);
    let session = Session::new(
        fixtures::unique_token(),
        user.id.clone(),
        whole + Duration::milliseconds(750),
    );

    let created = adapter.create_session(session).await.unwrap();
    assert_eq!(created.expires, whole);
}

// ─── Constraints ─────────────────────────────────────────────────

#[tokio::test]
async fn test_duplicate_email_is_a_constraint_error() {
    let adapter = setup_adapter().await;
    let email = fixtures::unique_email("dup");
    adapter
        .create_user(NewUser::new("First", email.clone()))
        .await
        .unwrap();

    let err = adapter
        .create_user(NewUser::new("Second", email))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthStoreError::Constraint(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_duplicate_provider_account_is_a_constraint_error() {
    let adapter = setup_adapter().await;
    let user = adapter.create_user(fixtures::new_user("Ned")).await.unwrap();
    let account = fixtures::github_account(&user.id);
    adapter.link_account(account.clone()).await.unwrap();

    let err = adapter
        .link_account(siteauth_core::AdapterAccount {
            id: None,
            ..account
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthStoreError::Constraint(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_session_for_unknown_user_is_rejected() {
    let adapter = setup_adapter().await;
    let err = adapter
        .create_session(fixtures::session_for("user_missing", Duration::hours(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthStoreError::Constraint(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_missing_fields_write_nothing() {
    let adapter = setup_adapter().await;
    let expires = fixtures::now() + Duration::hours(1);
    assert!(adapter
        .create_verification_token(VerificationToken::new("  ", "abc", expires))
        .await
        .unwrap_err()
        .is_missing_field());

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM verification_tokens")
        .fetch_one(adapter.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// ─── Timestamp range ─────────────────────────────────────────────

fn year_10000() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn test_unstorable_email_verified_is_rejected_on_create() {
    let adapter = setup_adapter().await;
    let user = NewUser {
        email_verified: Some(year_10000()),
        ..fixtures::new_user("Pam")
    };
    let email = user.email.clone();

    let err = adapter.create_user(user).await.unwrap_err();
    assert!(matches!(err, AuthStoreError::Database(_)), "unexpected error: {err}");
    assert!(adapter.get_user_by_email(&email).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unstorable_email_verified_is_rejected_on_update() {
    let adapter = setup_adapter().await;
    let verified_at = fixtures::now();
    let user = adapter
        .create_user(NewUser {
            email_verified: Some(verified_at),
            ..fixtures::new_user("Ray")
        })
        .await
        .unwrap();

    let err = adapter
        .update_user(UserUpdate {
            email_verified: Some(year_10000()),
            ..UserUpdate::new(user.id.clone())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthStoreError::Database(_)), "unexpected error: {err}");

    let stored = adapter.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.email_verified, Some(verified_at));
}

#[tokio::test]
async fn test_unstorable_expiry_is_rejected() {
    let adapter = setup_adapter().await;
    let user = adapter.create_user(fixtures::new_user("Sam")).await.unwrap();

    let session = Session::new(fixtures::unique_token(), user.id.clone(), year_10000());
    let err = adapter.create_session(session.clone()).await.unwrap_err();
    assert!(err.to_string().contains("outside the range"), "{err}");
    assert!(adapter
        .get_session_and_user(&session.session_token)
        .await
        .unwrap()
        .is_none());

    let live = adapter
        .create_session(fixtures::session_for(&user.id, Duration::hours(1)))
        .await
        .unwrap();
    assert!(adapter
        .update_session(SessionUpdate::expires(live.session_token.clone(), year_10000()))
        .await
        .is_err());

    let token = VerificationToken::new("sam@example.com", fixtures::unique_token(), year_10000());
    let err = adapter.create_verification_token(token).await.unwrap_err();
    assert!(err.to_string().contains("outside the range"), "{err}");
}

// ─── Expiry sweeps ───────────────────────────────────────────────

#[tokio::test]
async fn test_delete_expired_sessions() {
    let adapter = setup_adapter().await;
    let user = adapter.create_user(fixtures::new_user("Ola")).await.unwrap();
    let stale = adapter
        .create_session(fixtures::session_for(&user.id, Duration::hours(-1)))
        .await
        .unwrap();
    let live = adapter
        .create_session(fixtures::session_for(&user.id, Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(adapter.delete_expired_sessions(Utc::now()).await.unwrap(), 1);
    assert!(adapter
        .get_session_and_user(&stale.session_token)
        .await
        .unwrap()
        .is_none());
    assert!(adapter
        .get_session_and_user(&live.session_token)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_delete_expired_verification_tokens() {
    let adapter = setup_adapter().await;
    let identifier = fixtures::unique_email("sweep");
    let stale = fixtures::verification_token(&identifier, Duration::minutes(-5));
    let live = fixtures::verification_token(&identifier, Duration::minutes(5));
    adapter.create_verification_token(stale.clone()).await.unwrap();
    adapter.create_verification_token(live.clone()).await.unwrap();

    assert_eq!(adapter.delete_expired_verification_tokens(Utc::now()).await.unwrap(), 1);
    assert!(adapter
        .use_verification_token(&identifier, &stale.token)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        adapter
            .use_verification_token(&identifier, &live.token)
            .await
            .unwrap(),
        Some(live)
    );
}
