// In-memory storage adapter.
//
// Holds a `MemoryStore` behind `Arc<RwLock<...>>`. Every operation is a
// linear scan on the relevant key. Clones share the same store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use siteauth_core::db::adapter::{validate_session, validate_verification_token, Adapter};
use siteauth_core::error::{AdapterResult, AuthStoreError};
use siteauth_core::utils::generate_id;
use siteauth_core::{
    AdapterAccount, NewUser, Session, SessionAndUser, SessionUpdate, User, UserUpdate,
    VerificationToken,
};

use crate::store::MemoryStore;

#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryAdapter {
    /// Create a new empty in-memory adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter pre-populated with data.
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Copy of everything currently stored.
    pub async fn snapshot(&self) -> MemoryStore {
        self.store.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.store.write().await = MemoryStore::new();
    }

    pub async fn user_count(&self) -> usize {
        self.store.read().await.users.len()
    }

    pub async fn session_count(&self) -> usize {
        self.store.read().await.sessions.len()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, user: NewUser) -> AdapterResult<User> {
        let mut store = self.store.write().await;
        if store.user_by_email(&user.email).is_some() {
            return Err(AuthStoreError::Constraint(format!(
                "users.email already taken: {}",
                user.email
            )));
        }
        let id = user.id.clone().unwrap_or_else(|| generate_id("user"));
        if store.user(&id).is_some() {
            return Err(AuthStoreError::Constraint(format!("users.id already taken: {id}")));
        }

        let user = user.into_user(id);
        tracing::debug!(adapter = "memory", user_id = %user.id, "create_user");
        store.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>> {
        Ok(self.store.read().await.user(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>> {
        Ok(self.store.read().await.user_by_email(email).cloned())
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        let store = self.store.read().await;
        let user = store
            .account(provider, provider_account_id)
            .and_then(|account| store.user(&account.user_id))
            .cloned();
        Ok(user)
    }

    async fn update_user(&self, update: UserUpdate) -> AdapterResult<Option<User>> {
        let mut store = self.store.write().await;
        if let Some(email) = &update.email {
            if store
                .user_by_email(email)
                .is_some_and(|other| other.id != update.id)
            {
                return Err(AuthStoreError::Constraint(format!(
                    "users.email already taken: {email}"
                )));
            }
        }

        let Some(user) = store.user_mut(&update.id) else {
            tracing::debug!(adapter = "memory", user_id = %update.id, "update_user: no such user");
            return Ok(None);
        };
        update.apply_to(user);
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &str) -> AdapterResult<Option<User>> {
        let mut store = self.store.write().await;
        let (sessions, accounts) = store.remove_owned_by(id);
        let removed = store.remove_user(id);
        tracing::debug!(
            adapter = "memory",
            user_id = id,
            found = removed.is_some(),
            sessions,
            accounts,
            "delete_user"
        );
        Ok(removed)
    }

    async fn link_account(&self, mut account: AdapterAccount) -> AdapterResult<AdapterAccount> {
        let mut store = self.store.write().await;
        store.require_user(&account.user_id)?;
        if store
            .account(&account.provider, &account.provider_account_id)
            .is_some()
        {
            return Err(AuthStoreError::Constraint(format!(
                "account {}:{} already linked",
                account.provider, account.provider_account_id
            )));
        }
        if account.id.is_none() {
            account.id = Some(generate_id("account"));
        }
        tracing::debug!(
            adapter = "memory",
            user_id = %account.user_id,
            provider = %account.provider,
            "link_account"
        );
        store.accounts.push(account.clone());
        Ok(account)
    }

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<AdapterAccount>> {
        let mut store = self.store.write().await;
        Ok(store.remove_account(provider, provider_account_id))
    }

    async fn get_accounts_for_user(&self, user_id: &str) -> AdapterResult<Vec<AdapterAccount>> {
        let store = self.store.read().await;
        Ok(store
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_session(&self, session: Session) -> AdapterResult<Session> {
        validate_session(&session)?;
        let mut store = self.store.write().await;
        store.require_user(&session.user_id)?;
        if store.session(&session.session_token).is_some() {
            return Err(AuthStoreError::Constraint(
                "sessions.session_token already exists".into(),
            ));
        }
        tracing::debug!(adapter = "memory", user_id = %session.user_id, "create_session");
        store.sessions.push(session.clone());
        Ok(session)
    }

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> AdapterResult<Option<SessionAndUser>> {
        let store = self.store.read().await;
        let Some(session) = store.session(session_token) else {
            return Ok(None);
        };
        Ok(store.user(&session.user_id).map(|user| SessionAndUser {
            session: session.clone(),
            user: user.clone(),
        }))
    }

    async fn update_session(&self, update: SessionUpdate) -> AdapterResult<Option<Session>> {
        let mut store = self.store.write().await;
        if let Some(user_id) = &update.user_id {
            store.require_user(user_id)?;
        }
        let Some(session) = store.session_mut(&update.session_token) else {
            return Ok(None);
        };
        update.apply_to(session);
        Ok(Some(session.clone()))
    }

    async fn delete_session(&self, session_token: &str) -> AdapterResult<Option<Session>> {
        Ok(self.store.write().await.remove_session(session_token))
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        validate_verification_token(&token)?;
        let mut store = self.store.write().await;
        if store
            .verification_tokens
            .iter()
            .any(|t| t.matches(&token.identifier, &token.token))
        {
            return Err(AuthStoreError::Constraint(
                "verification_tokens (identifier, token) already exists".into(),
            ));
        }
        store.verification_tokens.push(token.clone());
        Ok(token)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        // Find and remove under one write lock so two callers can't both win.
        let mut store = self.store.write().await;
        Ok(store.remove_verification_token(identifier, token))
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        let mut store = self.store.write().await;
        let before = store.sessions.len();
        store.sessions.retain(|s| s.expires > now);
        let removed = (before - store.sessions.len()) as u64;
        tracing::debug!(adapter = "memory", removed, "delete_expired_sessions");
        Ok(removed)
    }

    async fn delete_expired_verification_tokens(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        let mut store = self.store.write().await;
        let before = store.verification_tokens.len();
        store.verification_tokens.retain(|t| t.expires > now);
        let removed = (before - store.verification_tokens.len()) as u64;
        tracing::debug!(adapter = "memory", removed, "delete_expired_verification_tokens");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_create_user_generates_tagged_id() {
        let adapter = MemoryAdapter::new();
        let user = adapter
            .create_user(NewUser::new("A", "a@x.com"))
            .await
            .unwrap();
        assert!(user.id.starts_with("user_"));
        assert_eq!(user.email, "a@x.com");

        let by_email = adapter.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_create_user_keeps_supplied_id() {
        let adapter = MemoryAdapter::new();
        let input = NewUser {
            id: Some("fixed".into()),
            ..NewUser::new("B", "b@x.com")
        };
        let user = adapter.create_user(input).await.unwrap();
        assert_eq!(user.id, "fixed");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let adapter = MemoryAdapter::new();
        adapter.create_user(NewUser::new("A", "a@x.com")).await.unwrap();
        let err = adapter
            .create_user(NewUser::new("A2", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthStoreError::Constraint(_)));
        assert_eq!(adapter.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_missing_user_stores_nothing() {
        let adapter = MemoryAdapter::new();
        let update = UserUpdate {
            name: Some("Ghost".into()),
            ..UserUpdate::new("user_missing")
        };
        assert!(adapter.update_user(update).await.unwrap().is_none());
        assert_eq!(adapter.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_missing_session_returns_none() {
        let adapter = MemoryAdapter::new();
        let update = SessionUpdate::expires("nope", Utc::now());
        assert!(adapter.update_session(update).await.unwrap().is_none());
        assert_eq!(adapter.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_session_for_unknown_user_rejected() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .create_session(Session::new("tok", "user_nobody", Utc::now() + Duration::hours(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthStoreError::Constraint(_)));
        assert_eq!(adapter.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_account_for_unknown_user_rejected() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .link_account(AdapterAccount::new("user_nobody", "github", "99"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthStoreError::Constraint(_)));
        assert!(adapter.snapshot().await.accounts.is_empty());
    }

    #[tokio::test]
    async fn test_session_cannot_move_to_unknown_user() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(NewUser::new("A", "a@x.com")).await.unwrap();
        adapter
            .create_session(Session::new("tok", &user.id, Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        let update = SessionUpdate {
            user_id: Some("user_nobody".into()),
            ..SessionUpdate::expires("tok", Utc::now() + Duration::hours(2))
        };
        assert!(adapter.update_session(update).await.is_err());
        let found = adapter.get_session_and_user("tok").await.unwrap().unwrap();
        assert_eq!(found.user.id, user.id);
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_records() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(NewUser::new("A", "a@x.com")).await.unwrap();
        let now = Utc::now();
        adapter
            .create_session(Session::new("stale", &user.id, now - Duration::minutes(1)))
            .await
            .unwrap();
        adapter
            .create_session(Session::new("live", &user.id, now + Duration::minutes(1)))
            .await
            .unwrap();
        adapter
            .create_verification_token(VerificationToken::new("a@x.com", "old", now))
            .await
            .unwrap();

        assert_eq!(adapter.delete_expired_sessions(now).await.unwrap(), 1);
        assert_eq!(adapter.delete_expired_verification_tokens(now).await.unwrap(), 1);
        assert_eq!(adapter.session_count().await, 1);
        assert!(adapter.get_session_and_user("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_link_same_provider_account_twice_rejected() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(NewUser::new("A", "a@x.com")).await.unwrap();
        let account = AdapterAccount::new(&user.id, "github", "42");
        let linked = adapter.link_account(account.clone()).await.unwrap();
        assert!(linked.id.as_deref().is_some_and(|id| id.starts_with("account_")));
        assert!(adapter.link_account(account).await.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_store() {
        let adapter = MemoryAdapter::new();
        let other = adapter.clone();
        adapter.create_user(NewUser::new("A", "a@x.com")).await.unwrap();
        assert_eq!(other.user_count().await, 1);

        other.clear().await;
        assert!(adapter.snapshot().await.is_empty());
    }
}
