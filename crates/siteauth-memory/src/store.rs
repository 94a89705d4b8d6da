// The four in-memory collections behind `MemoryAdapter`.
//
// Plain vectors scanned linearly by key. The store is an ordinary value owned
// by whoever created it; nothing here is global.

use siteauth_core::error::{AdapterResult, AuthStoreError};
use siteauth_core::{AdapterAccount, Session, User, VerificationToken};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    pub users: Vec<User>,
    pub accounts: Vec<AdapterAccount>,
    pub sessions: Vec<Session>,
    pub verification_tokens: Vec<VerificationToken>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    /// Fail with `Constraint` unless `user_id` names a stored user. Sessions and
    /// linked accounts must always point at one.
    pub fn require_user(&self, user_id: &str) -> AdapterResult<&User> {
        self.user(user_id).ok_or_else(|| {
            AuthStoreError::Constraint(format!("no user with id {user_id}"))
        })
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn account(&self, provider: &str, provider_account_id: &str) -> Option<&AdapterAccount> {
        self.accounts
            .iter()
            .find(|a| a.matches(provider, provider_account_id))
    }

    pub fn session(&self, session_token: &str) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.session_token == session_token)
    }

    pub fn session_mut(&mut self, session_token: &str) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.session_token == session_token)
    }

    pub fn remove_user(&mut self, id: &str) -> Option<User> {
        let pos = self.users.iter().position(|u| u.id == id)?;
        Some(self.users.remove(pos))
    }

    pub fn remove_account(
        &mut self,
        provider: &str,
        provider_account_id: &str,
    ) -> Option<AdapterAccount> {
        let pos = self
            .accounts
            .iter()
            .position(|a| a.matches(provider, provider_account_id))?;
        Some(self.accounts.remove(pos))
    }

    pub fn remove_session(&mut self, session_token: &str) -> Option<Session> {
        let pos = self
            .sessions
            .iter()
            .position(|s| s.session_token == session_token)?;
        Some(self.sessions.remove(pos))
    }

    pub fn remove_verification_token(
        &mut self,
        identifier: &str,
        token: &str,
    ) -> Option<VerificationToken> {
        let pos = self
            .verification_tokens
            .iter()
            .position(|t| t.matches(identifier, token))?;
        Some(self.verification_tokens.remove(pos))
    }

    /// Drop every session and linked account owned by `user_id`.
    /// Returns `(sessions_removed, accounts_removed)`.
    pub fn remove_owned_by(&mut self, user_id: &str) -> (usize, usize) {
        let sessions_before = self.sessions.len();
        self.sessions.retain(|s| s.user_id != user_id);
        let accounts_before = self.accounts.len();
        self.accounts.retain(|a| a.user_id != user_id);
        (
            sessions_before - self.sessions.len(),
            accounts_before - self.accounts.len(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.accounts.is_empty()
            && self.sessions.is_empty()
            && self.verification_tokens.is_empty()
    }
}
