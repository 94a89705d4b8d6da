// Row types and column lists.
//
// Every query aliases snake_case columns to the camelCase field names the
// models use, and reads timestamp columns back as epoch seconds. The row
// structs below decode those aliased result sets.

use sqlx::FromRow;

use siteauth_core::error::AdapterResult;
use siteauth_core::{AccountType, AdapterAccount, Session, SessionAndUser, User, VerificationToken};

use crate::epoch::{from_epoch, from_epoch_opt};

pub(crate) const USER_COLUMNS: &str = "id, name, email, \
     CAST(strftime('%s', email_verified) AS INTEGER) AS emailVerified, image";

/// `USER_COLUMNS` for a query where `users` is aliased as `u`.
pub(crate) const JOINED_USER_COLUMNS: &str = "u.id AS id, u.name AS name, u.email AS email, \
     CAST(strftime('%s', u.email_verified) AS INTEGER) AS emailVerified, u.image AS image";

pub(crate) const ACCOUNT_COLUMNS: &str = "id, user_id AS userId, \"type\" AS type, provider, \
     provider_account_id AS providerAccountId, access_token AS accessToken, \
     refresh_token AS refreshToken, id_token AS idToken, expires_at AS expiresAt, scope, \
     token_type AS tokenType, session_state AS sessionState";

pub(crate) const SESSION_COLUMNS: &str = "session_token AS sessionToken, user_id AS userId, \
     CAST(strftime('%s', expires) AS INTEGER) AS expires";

pub(crate) const VERIFICATION_TOKEN_COLUMNS: &str =
    "identifier, token, CAST(strftime('%s', expires) AS INTEGER) AS expires";

#[derive(Debug, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub(crate) struct UserRow {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: Option<i64>,
    pub image: Option<String>,
}

impl UserRow {
    pub fn into_user(self) -> AdapterResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            email_verified: from_epoch_opt(self.email_verified)?,
            image: self.image,
        })
    }
}

#[derive(Debug, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub(crate) struct AccountRow {
    pub id: String,
    pub user_id: String,
    #[sqlx(rename = "type")]
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub session_state: Option<String>,
}

impl From<AccountRow> for AdapterAccount {
    fn from(row: AccountRow) -> Self {
        Self {
            id: Some(row.id),
            user_id: row.user_id,
            account_type: AccountType::parse(&row.account_type),
            provider: row.provider,
            provider_account_id: row.provider_account_id,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            id_token: row.id_token,
            expires_at: row.expires_at,
            scope: row.scope,
            token_type: row.token_type,
            session_state: row.session_state,
        }
    }
}

#[derive(Debug, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub(crate) struct SessionRow {
    pub session_token: String,
    pub user_id: String,
    pub expires: i64,
}

impl SessionRow {
    pub fn into_session(self) -> AdapterResult<Session> {
        Ok(Session {
            session_token: self.session_token,
            user_id: self.user_id,
            expires: from_epoch(self.expires)?,
        })
    }
}

/// A session joined with its owning user.
#[derive(Debug, FromRow)]
pub(crate) struct SessionUserRow {
    #[sqlx(flatten)]
    pub session: SessionRow,
    #[sqlx(flatten)]
    pub user: UserRow,
}

impl SessionUserRow {
    pub fn into_session_and_user(self) -> AdapterResult<SessionAndUser> {
        Ok(SessionAndUser {
            session: self.session.into_session()?,
            user: self.user.into_user()?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct VerificationTokenRow {
    pub identifier: String,
    pub token: String,
    pub expires: i64,
}

impl VerificationTokenRow {
    pub fn into_token(self) -> AdapterResult<VerificationToken> {
        Ok(VerificationToken {
            identifier: self.identifier,
            token: self.token,
            expires: from_epoch(self.expires)?,
        })
    }
}
