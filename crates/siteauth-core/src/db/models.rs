// Auth entity models shared by every adapter.
//
// Field names serialize in camelCase because these records cross the boundary
// to the hosting auth framework as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── User ────────────────────────────────────────────────────────

/// A persisted user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    /// When the email address was verified, if ever.
    #[serde(default)]
    pub email_verified: Option<DateTime<Utc>>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Input for `create_user`. The adapter generates an id when `id` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Turn the input into a stored record under the given id.
    pub fn into_user(self, id: String) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            email_verified: self.email_verified,
            image: self.image,
        }
    }
}

impl From<User> for NewUser {
    fn from(user: User) -> Self {
        Self {
            id: Some(user.id),
            name: user.name,
            email: user.email,
            email_verified: user.email_verified,
            image: user.image,
        }
    }
}

/// Partial update for `update_user`. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UserUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Merge the present fields onto an existing record.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = Some(name.clone());
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(verified) = self.email_verified {
            user.email_verified = Some(verified);
        }
        if let Some(image) = &self.image {
            user.image = Some(image.clone());
        }
    }
}

// ─── Linked Account ──────────────────────────────────────────────

/// Kind of provider account, as reported by the auth framework.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Oauth,
    Oidc,
    Email,
    Webauthn,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oauth => "oauth",
            Self::Oidc => "oidc",
            Self::Email => "email",
            Self::Webauthn => "webauthn",
        }
    }

    /// Parse the stored column value. Unknown values fall back to `oauth`.
    pub fn parse(value: &str) -> Self {
        match value {
            "oidc" => Self::Oidc,
            "email" => Self::Email,
            "webauthn" => Self::Webauthn,
            _ => Self::Oauth,
        }
    }
}

/// A provider account linked to a local user.
///
/// Keyed by `(provider, provider_account_id)`. `expires_at` is epoch seconds,
/// exactly as the provider token response carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterAccount {
    /// Generated by the adapter on link when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(rename = "type", default)]
    pub account_type: AccountType,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
}

impl AdapterAccount {
    pub fn new(
        user_id: impl Into<String>,
        provider: impl Into<String>,
        provider_account_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            ..Default::default()
        }
    }

    /// Whether this account is the one identified by the composite key.
    pub fn matches(&self, provider: &str, provider_account_id: &str) -> bool {
        self.provider == provider && self.provider_account_id == provider_account_id
    }
}

// ─── Session ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn new(
        session_token: impl Into<String>,
        user_id: impl Into<String>,
        expires: DateTime<Utc>,
    ) -> Self {
        Self {
            session_token: session_token.into(),
            user_id: user_id.into(),
            expires,
        }
    }
}

/// Partial update for `update_session`, keyed by the session token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub session_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    pub fn expires(session_token: impl Into<String>, expires: DateTime<Utc>) -> Self {
        Self {
            session_token: session_token.into(),
            user_id: None,
            expires: Some(expires),
        }
    }

    pub fn apply_to(&self, session: &mut Session) {
        if let Some(user_id) = &self.user_id {
            session.user_id = user_id.clone();
        }
        if let Some(expires) = self.expires {
            session.expires = expires;
        }
    }
}

/// Result of `get_session_and_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAndUser {
    pub session: Session,
    pub user: User,
}

// ─── Verification Token ──────────────────────────────────────────

/// Single-use token keyed by `(identifier, token)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationToken {
    /// What the token proves control of, usually an email address.
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl VerificationToken {
    pub fn new(
        identifier: impl Into<String>,
        token: impl Into<String>,
        expires: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            token: token.into(),
            expires,
        }
    }

    pub fn matches(&self, identifier: &str, token: &str) -> bool {
        self.identifier == identifier && self.token == token
    }
}
