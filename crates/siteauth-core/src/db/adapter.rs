// Storage adapter trait: the contract the hosting auth framework calls into.
//
// Every backend (memory, SQLite, no-op, tiered) implements this trait. The
// operations are independent request/response calls; none of them spans a
// transaction across entities.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{
    AdapterAccount, NewUser, Session, SessionAndUser, SessionUpdate, User, UserUpdate,
    VerificationToken,
};
use crate::error::{AdapterResult, AuthStoreError};

/// The storage adapter contract.
///
/// Lookups return `Ok(None)` when nothing matches. Deletes return the removed
/// record, or `None` when the key did not exist. Storage failures propagate
/// unchanged; there are no retries.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Short backend name, used in log lines.
    fn name(&self) -> &'static str;

    // ─── Users ───────────────────────────────────────────────────

    /// Create a user. An id is generated when `user.id` is `None`.
    async fn create_user(&self, user: NewUser) -> AdapterResult<User>;

    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>>;

    /// Find the user owning the provider account `(provider, provider_account_id)`.
    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>>;

    /// Merge `update` onto the stored user. Returns `None` if no user has that id.
    async fn update_user(&self, update: UserUpdate) -> AdapterResult<Option<User>>;

    /// Delete a user together with its sessions and linked accounts.
    async fn delete_user(&self, id: &str) -> AdapterResult<Option<User>>;

    // ─── Linked Accounts ─────────────────────────────────────────

    /// Link a provider account to a user. An id is generated when absent.
    async fn link_account(&self, account: AdapterAccount) -> AdapterResult<AdapterAccount>;

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<AdapterAccount>>;

    /// All provider accounts linked to a user.
    async fn get_accounts_for_user(&self, user_id: &str) -> AdapterResult<Vec<AdapterAccount>>;

    // ─── Sessions ────────────────────────────────────────────────

    /// Persist a session. Fails with `MissingField` on an empty token or user id.
    async fn create_session(&self, session: Session) -> AdapterResult<Session>;

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> AdapterResult<Option<SessionAndUser>>;

    /// Merge `update` onto the stored session. Returns `None` if the token is unknown.
    async fn update_session(&self, update: SessionUpdate) -> AdapterResult<Option<Session>>;

    async fn delete_session(&self, session_token: &str) -> AdapterResult<Option<Session>>;

    // ─── Verification Tokens ─────────────────────────────────────

    /// Persist a verification token. Fails with `MissingField` on an empty
    /// identifier or token.
    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken>;

    /// Consume a verification token: return it and delete it. A second call
    /// with the same pair returns `None`.
    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>>;

    // ─── Housekeeping ────────────────────────────────────────────

    /// Remove sessions whose expiry is at or before `now`. Returns how many
    /// were removed.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> AdapterResult<u64>;

    /// Remove verification tokens whose expiry is at or before `now`.
    async fn delete_expired_verification_tokens(&self, now: DateTime<Utc>) -> AdapterResult<u64>;
}

// ─── Validation ──────────────────────────────────────────────────

/// Reject a session that cannot be persisted.
pub fn validate_session(session: &Session) -> AdapterResult<()> {
    if session.session_token.trim().is_empty() {
        return Err(AuthStoreError::missing_field("session", "sessionToken"));
    }
    if session.user_id.trim().is_empty() {
        return Err(AuthStoreError::missing_field("session", "userId"));
    }
    Ok(())
}

/// Reject a verification token that cannot be persisted.
pub fn validate_verification_token(token: &VerificationToken) -> AdapterResult<()> {
    if token.identifier.trim().is_empty() {
        return Err(AuthStoreError::missing_field("verification_token", "identifier"));
    }
    if token.token.trim().is_empty() {
        return Err(AuthStoreError::missing_field("verification_token", "token"));
    }
    Ok(())
}
