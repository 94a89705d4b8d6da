//! Adapter selection from configuration.

use std::sync::Arc;

use chrono::Duration;

use siteauth::{
    AdapterConfig, AuthConfig, AuthStoreError, ExpiredSweep, FallbackPolicy, MemoryAdapter,
    NewUser, ProviderConfig, ProviderId, SessionStrategy, SiteAuth,
};
use siteauth_test_utils::{conformance, fixtures};

fn sqlite_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}", dir.path().join("site.db").display())
}

#[tokio::test]
async fn test_default_config_uses_memory() {
    let auth = SiteAuth::init(AuthConfig::default()).await.unwrap();
    assert_eq!(auth.adapter().name(), "memory");
    assert_eq!(auth.session_strategy(), SessionStrategy::Jwt);
    conformance::create_then_fetch_user(auth.adapter().as_ref()).await;
}

#[tokio::test]
async fn test_noop_adapter_stores_nothing() {
    let auth = SiteAuth::init(AuthConfig {
        adapter: AdapterConfig::Noop,
        ..AuthConfig::default()
    })
    .await
    .unwrap();
    let adapter = auth.adapter();
    assert_eq!(adapter.name(), "noop");

    let user = adapter
        .create_user(NewUser::new("A", "a@x.com"))
        .await
        .unwrap();
    assert_eq!(user.email, "a@x.com");
    assert!(adapter.get_user_by_email("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_adapter_persists_across_init() {
    let dir = tempfile::tempdir().unwrap();
    let config = AuthConfig {
        session: SessionStrategy::Database,
        adapter: AdapterConfig::sqlite(sqlite_url(&dir)),
        ..AuthConfig::default()
    };

    let first = SiteAuth::init(config.clone()).await.unwrap();
    assert_eq!(first.adapter().name(), "sqlite");
    let user = first
        .adapter()
        .create_user(fixtures::new_user("Wes"))
        .await
        .unwrap();
    drop(first);

    let second = SiteAuth::init(config).await.unwrap();
    assert_eq!(second.adapter().get_user(&user.id).await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_sqlite_with_fallback_is_tiered() {
    let dir = tempfile::tempdir().unwrap();
    let auth = SiteAuth::init(AuthConfig {
        adapter: AdapterConfig::Sqlite {
            url: sqlite_url(&dir),
            max_connections: 2,
            fallback: FallbackPolicy::BestEffort,
        },
        ..AuthConfig::default()
    })
    .await
    .unwrap();
    assert_eq!(auth.adapter().name(), "tiered");
    conformance::session_lifecycle(auth.adapter().as_ref()).await;
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_connecting() {
    let err = SiteAuth::init(AuthConfig {
        session: SessionStrategy::Database,
        adapter: AdapterConfig::Noop,
        ..AuthConfig::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, AuthStoreError::Config(_)));

    let err = SiteAuth::init(AuthConfig {
        adapter: AdapterConfig::Sqlite {
            url: "sqlite://unused.db".into(),
            max_connections: 0,
            fallback: FallbackPolicy::Disabled,
        },
        ..AuthConfig::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, AuthStoreError::Config(_)));
}

#[tokio::test]
async fn test_from_file_then_init() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.toml");
    std::fs::write(
        &path,
        format!(
            r#"
session = "database"

[adapter]
kind = "sqlite"
url = "{}"

[[providers]]
id = "gitlab"
client_id = "gl-id"
client_secret = "gl-secret"
"#,
            sqlite_url(&dir)
        ),
    )
    .unwrap();

    let config = AuthConfig::from_file(&path).unwrap();
    let auth = SiteAuth::init(config).await.unwrap();
    assert_eq!(auth.adapter().name(), "sqlite");
    assert_eq!(
        auth.provider(&ProviderId::GitLab).map(|p| p.client_id.as_str()),
        Some("gl-id")
    );
}

#[test]
fn test_from_file_missing_is_config_error() {
    let err = AuthConfig::from_file("/nonexistent/siteauth.toml").unwrap_err();
    assert!(matches!(err, AuthStoreError::Config(_)));
}

#[tokio::test]
async fn test_with_adapter_shares_store() {
    let memory = MemoryAdapter::new();
    let auth = SiteAuth::with_adapter(
        AuthConfig {
            providers: vec![ProviderConfig::new(ProviderId::Google, "g-id", "g-secret")],
            ..AuthConfig::default()
        },
        Arc::new(memory.clone()),
    )
    .unwrap();

    auth.adapter()
        .create_user(fixtures::new_user("Xia"))
        .await
        .unwrap();
    assert_eq!(memory.user_count().await, 1);
    assert!(auth.provider(&ProviderId::Google).is_some());
}

#[tokio::test]
async fn test_sweep_expired_clears_tiered_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let auth = SiteAuth::init(AuthConfig {
        adapter: AdapterConfig::Sqlite {
            url: sqlite_url(&dir),
            max_connections: 1,
            fallback: FallbackPolicy::WriteThrough,
        },
        ..AuthConfig::default()
    })
    .await
    .unwrap();
    let adapter = auth.adapter();

    let user = adapter.create_user(fixtures::new_user("Yan")).await.unwrap();
    let stale = adapter
        .create_session(fixtures::session_for(&user.id, -Duration::hours(1)))
        .await
        .unwrap();
    let live = adapter
        .create_session(fixtures::session_for(&user.id, Duration::hours(1)))
        .await
        .unwrap();
    adapter
        .create_verification_token(fixtures::verification_token(&user.email, -Duration::minutes(5)))
        .await
        .unwrap();

    let swept = auth.sweep_expired().await.unwrap();
    assert_eq!(
        swept,
        ExpiredSweep {
            sessions: 1,
            verification_tokens: 1
        }
    );
    // The memory tier was swept too, so the stale session cannot be read back from it.
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
async fn test_sweep_expired_on_noop_is_empty() {
    let auth = SiteAuth::init(AuthConfig {
        adapter: AdapterConfig::Noop,
        ..AuthConfig::default()
    })
    .await
    .unwrap();
    assert_eq!(auth.sweep_expired().await.unwrap(), ExpiredSweep::default());
}
