// No-op adapter: a configuration stub that persists nothing.
//
// Every call is logged and appended to an in-process call log. Creates echo
// their input back, every lookup misses.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::db::adapter::Adapter;
use crate::db::models::{
    AdapterAccount, NewUser, Session, SessionAndUser, SessionUpdate, User, UserUpdate,
    VerificationToken,
};
use crate::error::AdapterResult;
use crate::utils::generate_id;

/// One recorded adapter invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterCall {
    pub operation: &'static str,
    pub args: Value,
}

#[derive(Debug, Default)]
pub struct NoopAdapter {
    calls: Mutex<Vec<AdapterCall>>,
}

impl NoopAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything called so far, oldest first.
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Names of the operations called so far.
    pub fn operations(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.operation).collect()
    }

    fn record(&self, operation: &'static str, args: Value) {
        tracing::info!(adapter = "noop", operation, %args, "adapter call");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(AdapterCall { operation, args });
        }
    }
}

#[async_trait]
impl Adapter for NoopAdapter {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn create_user(&self, user: NewUser) -> AdapterResult<User> {
        self.record("create_user", serde_json::to_value(&user)?);
        let id = user.id.clone().unwrap_or_else(|| generate_id("user"));
        Ok(user.into_user(id))
    }

    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>> {
        self.record("get_user", json!({ "id": id }));
        Ok(None)
    }

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>> {
        self.record("get_user_by_email", json!({ "email": email }));
        Ok(None)
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        self.record(
            "get_user_by_account",
            json!({ "provider": provider, "providerAccountId": provider_account_id }),
        );
        Ok(None)
    }

    async fn update_user(&self, update: UserUpdate) -> AdapterResult<Option<User>> {
        self.record("update_user", serde_json::to_value(&update)?);
        Ok(None)
    }

    async fn delete_user(&self, id: &str) -> AdapterResult<Option<User>> {
        self.record("delete_user", json!({ "id": id }));
        Ok(None)
    }

    async fn link_account(&self, account: AdapterAccount) -> AdapterResult<AdapterAccount> {
        self.record("link_account", serde_json::to_value(&account)?);
        Ok(account)
    }

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<AdapterAccount>> {
        self.record(
            "unlink_account",
            json!({ "provider": provider, "providerAccountId": provider_account_id }),
        );
        Ok(None)
    }

    async fn get_accounts_for_user(&self, user_id: &str) -> AdapterResult<Vec<AdapterAccount>> {
        self.record("get_accounts_for_user", json!({ "userId": user_id }));
        Ok(Vec::new())
    }

    async fn create_session(&self, session: Session) -> AdapterResult<Session> {
        self.record("create_session", serde_json::to_value(&session)?);
        Ok(session)
    }

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> AdapterResult<Option<SessionAndUser>> {
        self.record("get_session_and_user", json!({ "sessionToken": session_token }));
        Ok(None)
    }

    async fn update_session(&self, update: SessionUpdate) -> AdapterResult<Option<Session>> {
        self.record("update_session", serde_json::to_value(&update)?);
        Ok(None)
    }

    async fn delete_session(&self, session_token: &str) -> AdapterResult<Option<Session>> {
        self.record("delete_session", json!({ "sessionToken": session_token }));
        Ok(None)
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        self.record("create_verification_token", serde_json::to_value(&token)?);
        Ok(token)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        self.record(
            "use_verification_token",
            json!({ "identifier": identifier, "token": token }),
        );
        Ok(None)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        self.record("delete_expired_sessions", json!({ "now": now }));
        Ok(0)
    }

    async fn delete_expired_verification_tokens(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        self.record("delete_expired_verification_tokens", json!({ "now": now }));
        Ok(0)
    }
}
