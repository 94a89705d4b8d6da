// Two-tier adapter: a primary store with an optional fallback store.
//
// Writes land in the primary first. Depending on the policy they are then
// mirrored into the fallback using the primary's result, so both tiers agree on
// generated ids. Reads that miss in the primary are retried against the
// fallback.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::adapter::Adapter;
use crate::db::models::{
    AdapterAccount, NewUser, Session, SessionAndUser, SessionUpdate, User, UserUpdate,
    VerificationToken,
};
use crate::error::{AdapterResult, AuthStoreError};

/// How the fallback tier participates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Primary only. The fallback is never touched.
    #[default]
    Disabled,
    /// Mirror every write and surface mirror failures as `AuthStoreError::Fallback`.
    WriteThrough,
    /// Mirror every write, log mirror failures and carry on.
    BestEffort,
}

impl FallbackPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "disabled" | "none" | "off" => Some(Self::Disabled),
            "write-through" => Some(Self::WriteThrough),
            "best-effort" => Some(Self::BestEffort),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

#[derive(Debug, Clone)]
pub struct TieredAdapter {
    primary: Arc<dyn Adapter>,
    fallback: Arc<dyn Adapter>,
    policy: FallbackPolicy,
}

impl TieredAdapter {
    pub fn new(
        primary: Arc<dyn Adapter>,
        fallback: Arc<dyn Adapter>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            primary,
            fallback,
            policy,
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn primary(&self) -> &Arc<dyn Adapter> {
        &self.primary
    }

    pub fn fallback(&self) -> &Arc<dyn Adapter> {
        &self.fallback
    }

    /// Apply the policy to the outcome of a fallback-tier call.
    fn settle<T>(&self, operation: &'static str, result: AdapterResult<T>) -> AdapterResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self.policy {
                FallbackPolicy::WriteThrough => Err(AuthStoreError::Fallback(format!(
                    "{operation} on {}: {err}",
                    self.fallback.name()
                ))),
                _ => {
                    tracing::warn!(
                        operation,
                        fallback = self.fallback.name(),
                        error = %err,
                        "fallback store call failed, continuing"
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Fallback lookup used after a primary miss.
    async fn read_fallback<T, F>(&self, operation: &'static str, lookup: F) -> AdapterResult<Option<T>>
    where
        F: std::future::Future<Output = AdapterResult<Option<T>>> + Send,
    {
        if !self.policy.is_enabled() {
            return Ok(None);
        }
        let found = self.settle(operation, lookup.await)?.flatten();
        if found.is_some() {
            tracing::debug!(operation, fallback = self.fallback.name(), "served from fallback");
        }
        Ok(found)
    }
}

#[async_trait]
impl Adapter for TieredAdapter {
    fn name(&self) -> &'static str {
        "tiered"
    }

    async fn create_user(&self, user: NewUser) -> AdapterResult<User> {
        let created = self.primary.create_user(user).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.create_user(NewUser::from(created.clone())).await;
            self.settle("create_user", mirrored)?;
        }
        Ok(created)
    }

    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>> {
        if let Some(user) = self.primary.get_user(id).await? {
            return Ok(Some(user));
        }
        self.read_fallback("get_user", self.fallback.get_user(id)).await
    }

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>> {
        if let Some(user) = self.primary.get_user_by_email(email).await? {
            return Ok(Some(user));
        }
        self.read_fallback("get_user_by_email", self.fallback.get_user_by_email(email))
            .await
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        if let Some(user) = self
            .primary
            .get_user_by_account(provider, provider_account_id)
            .await?
        {
            return Ok(Some(user));
        }
        self.read_fallback(
            "get_user_by_account",
            self.fallback.get_user_by_account(provider, provider_account_id),
        )
        .await
    }

    async fn update_user(&self, update: UserUpdate) -> AdapterResult<Option<User>> {
        let updated = self.primary.update_user(update.clone()).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.update_user(update).await;
            self.settle("update_user", mirrored)?;
        }
        Ok(updated)
    }

    async fn delete_user(&self, id: &str) -> AdapterResult<Option<User>> {
        let deleted = self.primary.delete_user(id).await?;
        if !self.policy.is_enabled() {
            return Ok(deleted);
        }
        let mirrored = self.fallback.delete_user(id).await;
        let mirrored = self.settle("delete_user", mirrored)?.flatten();
        Ok(deleted.or(mirrored))
    }

    async fn link_account(&self, account: AdapterAccount) -> AdapterResult<AdapterAccount> {
        let linked = self.primary.link_account(account).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.link_account(linked.clone()).await;
            self.settle("link_account", mirrored)?;
        }
        Ok(linked)
    }

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<AdapterAccount>> {
        let removed = self
            .primary
            .unlink_account(provider, provider_account_id)
            .await?;
        if !self.policy.is_enabled() {
            return Ok(removed);
        }
        let mirrored = self
            .fallback
            .unlink_account(provider, provider_account_id)
            .await;
        let mirrored = self.settle("unlink_account", mirrored)?.flatten();
        Ok(removed.or(mirrored))
    }

    async fn get_accounts_for_user(&self, user_id: &str) -> AdapterResult<Vec<AdapterAccount>> {
        let accounts = self.primary.get_accounts_for_user(user_id).await?;
        if !accounts.is_empty() || !self.policy.is_enabled() {
            return Ok(accounts);
        }
        let mirrored = self.fallback.get_accounts_for_user(user_id).await;
        Ok(self
            .settle("get_accounts_for_user", mirrored)?
            .unwrap_or_default())
    }

    async fn create_session(&self, session: Session) -> AdapterResult<Session> {
        let created = self.primary.create_session(session).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.create_session(created.clone()).await;
            self.settle("create_session", mirrored)?;
        }
        Ok(created)
    }

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> AdapterResult<Option<SessionAndUser>> {
        if let Some(found) = self.primary.get_session_and_user(session_token).await? {
            return Ok(Some(found));
        }
        self.read_fallback(
            "get_session_and_user",
            self.fallback.get_session_and_user(session_token),
        )
        .await
    }

    async fn update_session(&self, update: SessionUpdate) -> AdapterResult<Option<Session>> {
        let updated = self.primary.update_session(update.clone()).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.update_session(update).await;
            self.settle("update_session", mirrored)?;
        }
        Ok(updated)
    }

    async fn delete_session(&self, session_token: &str) -> AdapterResult<Option<Session>> {
        let deleted = self.primary.delete_session(session_token).await?;
        if !self.policy.is_enabled() {
            return Ok(deleted);
        }
        let mirrored = self.fallback.delete_session(session_token).await;
        let mirrored = self.settle("delete_session", mirrored)?.flatten();
        Ok(deleted.or(mirrored))
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        let created = self.primary.create_verification_token(token).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.create_verification_token(created.clone()).await;
            self.settle("create_verification_token", mirrored)?;
        }
        Ok(created)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        if !self.policy.is_enabled() {
            return self.primary.use_verification_token(identifier, token).await;
        }
        // Consumed in both tiers so neither can hand the token out again. The
        // fallback goes first: if it fails the primary copy is still redeemable.
        let mirrored = self.fallback.use_verification_token(identifier, token).await;
        let mirrored = self.settle("use_verification_token", mirrored)?.flatten();
        let used = self.primary.use_verification_token(identifier, token).await?;
        Ok(used.or(mirrored))
    }

    /// Sweeps both tiers. The count is the primary's.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        let removed = self.primary.delete_expired_sessions(now).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.delete_expired_sessions(now).await;
            self.settle("delete_expired_sessions", mirrored)?;
        }
        Ok(removed)
    }

    async fn delete_expired_verification_tokens(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        let removed = self.primary.delete_expired_verification_tokens(now).await?;
        if self.policy.is_enabled() {
            let mirrored = self.fallback.delete_expired_verification_tokens(now).await;
            self.settle("delete_expired_verification_tokens", mirrored)?;
        }
        Ok(removed)
    }
}
