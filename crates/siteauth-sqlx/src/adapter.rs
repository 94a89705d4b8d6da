// Storage adapter over a SQLite database.
//
// Each operation is a single prepared statement that returns the affected row
// through `RETURNING`, except user deletion, which clears sessions and linked
// accounts first. Those statements run one after another without a wrapping
// transaction.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use siteauth_core::db::adapter::{validate_session, validate_verification_token, Adapter};
use siteauth_core::error::AdapterResult;
use siteauth_core::utils::generate_id;
use siteauth_core::{
    AdapterAccount, NewUser, Session, SessionAndUser, SessionUpdate, User, UserUpdate,
    VerificationToken,
};

use crate::epoch::{to_epoch, to_epoch_opt, TO_DATETIME};
use crate::error::{db_error, migrate_error};
use crate::rows::{
    AccountRow, SessionRow, SessionUserRow, UserRow, VerificationTokenRow, ACCOUNT_COLUMNS,
    JOINED_USER_COLUMNS, SESSION_COLUMNS, USER_COLUMNS, VERIFICATION_TOKEN_COLUMNS,
};

/// Connection settings for [`SqliteAdapter::connect_with`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// e.g. `sqlite://auth.db` or `sqlite::memory:`.
    pub url: String,
    /// Upper bound on open connections. In-memory databases always use one.
    pub max_connections: u32,
    /// Apply the bundled schema script after connecting.
    pub run_migrations: bool,
}

impl SqliteOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 1,
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// SQLite-backed storage adapter.
///
/// Holds one pool for the life of the process. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Connect with default options and apply the schema.
    pub async fn connect(url: &str) -> AdapterResult<Self> {
        Self::connect_with(SqliteOptions::new(url)).await
    }

    pub async fn connect_with(options: SqliteOptions) -> AdapterResult<Self> {
        let connect_options = SqliteConnectOptions::from_str(&options.url)
            .map_err(db_error)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so the pool must
        // hold exactly one and never recycle it.
        let pool_options = if options.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(options.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(db_error)?;
        tracing::info!(url = %options.url, "sqlite adapter connected");

        let adapter = Self { pool };
        if options.run_migrations {
            adapter.migrate().await?;
        }
        Ok(adapter)
    }

    /// Wrap an existing pool. The schema is assumed to be in place.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply `migrations/` to the database. Already-applied scripts are skipped.
    pub async fn migrate(&self) -> AdapterResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(migrate_error)?;
        tracing::info!("sqlite adapter schema up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn create_user(&self, user: NewUser) -> AdapterResult<User> {
        let id = user.id.clone().unwrap_or_else(|| generate_id("user"));
        let sql = format!(
            "INSERT INTO users (id, name, email, email_verified, image) \
             VALUES (?, ?, ?, {TO_DATETIME}, ?) RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(&id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(to_epoch_opt(user.email_verified)?)
            .bind(&user.image)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        tracing::debug!(adapter = "sqlite", user_id = %id, "create_user");
        row.into_user()
    }

    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        let sql = format!(
            "SELECT {JOINED_USER_COLUMNS} FROM users u \
             JOIN login_provider_accounts a ON a.user_id = u.id \
             WHERE a.provider = ? AND a.provider_account_id = ?"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(provider)
            .bind(provider_account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn update_user(&self, update: UserUpdate) -> AdapterResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET \
               name = COALESCE(?, name), \
               email = COALESCE(?, email), \
               email_verified = COALESCE({TO_DATETIME}, email_verified), \
               image = COALESCE(?, image) \
             WHERE id = ? RETURNING {USER_COLUMNS}"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(&update.name)
            .bind(&update.email)
            .bind(to_epoch_opt(update.email_verified)?)
            .bind(&update.image)
            .bind(&update.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        if row.is_none() {
            tracing::debug!(adapter = "sqlite", user_id = %update.id, "update_user: no such user");
        }
        row.map(UserRow::into_user).transpose()
    }

    async fn delete_user(&self, id: &str) -> AdapterResult<Option<User>> {
        let sessions = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();
        let accounts = sqlx::query("DELETE FROM login_provider_accounts WHERE user_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        let sql = format!("DELETE FROM users WHERE id = ? RETURNING {USER_COLUMNS}");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        tracing::debug!(
            adapter = "sqlite",
            user_id = id,
            found = row.is_some(),
            sessions,
            accounts,
            "delete_user"
        );
        row.map(UserRow::into_user).transpose()
    }

    async fn link_account(&self, account: AdapterAccount) -> AdapterResult<AdapterAccount> {
        let id = account.id.clone().unwrap_or_else(|| generate_id("account"));
        let sql = format!(
            "INSERT INTO login_provider_accounts \
               (id, user_id, \"type\", provider, provider_account_id, access_token, \
                refresh_token, id_token, expires_at, scope, token_type, session_state) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row: AccountRow = sqlx::query_as(&sql)
            .bind(&id)
            .bind(&account.user_id)
            .bind(account.account_type.as_str())
            .bind(&account.provider)
            .bind(&account.provider_account_id)
            .bind(&account.access_token)
            .bind(&account.refresh_token)
            .bind(&account.id_token)
            .bind(account.expires_at)
            .bind(&account.scope)
            .bind(&account.token_type)
            .bind(&account.session_state)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        tracing::debug!(
            adapter = "sqlite",
            user_id = %account.user_id,
            provider = %account.provider,
            "link_account"
        );
        Ok(row.into())
    }

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<AdapterAccount>> {
        let sql = format!(
            "DELETE FROM login_provider_accounts \
             WHERE provider = ? AND provider_account_id = ? RETURNING {ACCOUNT_COLUMNS}"
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(provider)
            .bind(provider_account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(AdapterAccount::from))
    }

    async fn get_accounts_for_user(&self, user_id: &str) -> AdapterResult<Vec<AdapterAccount>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM login_provider_accounts WHERE user_id = ? \
             ORDER BY provider, provider_account_id"
        );
        let rows: Vec<AccountRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AdapterAccount::from).collect())
    }

    async fn create_session(&self, session: Session) -> AdapterResult<Session> {
        validate_session(&session)?;
        let sql = format!(
            "INSERT INTO sessions (session_token, user_id, expires) \
             VALUES (?, ?, {TO_DATETIME}) RETURNING {SESSION_COLUMNS}"
        );
        let row: SessionRow = sqlx::query_as(&sql)
            .bind(&session.session_token)
            .bind(&session.user_id)
            .bind(to_epoch(session.expires)?)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        tracing::debug!(adapter = "sqlite", user_id = %session.user_id, "create_session");
        row.into_session()
    }

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> AdapterResult<Option<SessionAndUser>> {
        let sql = format!(
            "SELECT s.session_token AS sessionToken, s.user_id AS userId, \
               CAST(strftime('%s', s.expires) AS INTEGER) AS expires, {JOINED_USER_COLUMNS} \
             FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.session_token = ?"
        );
        let row: Option<SessionUserRow> = sqlx::query_as(&sql)
            .bind(session_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(SessionUserRow::into_session_and_user).transpose()
    }

    async fn update_session(&self, update: SessionUpdate) -> AdapterResult<Option<Session>> {
        let sql = format!(
            "UPDATE sessions SET \
               user_id = COALESCE(?, user_id), \
               expires = COALESCE({TO_DATETIME}, expires) \
             WHERE session_token = ? RETURNING {SESSION_COLUMNS}"
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(&update.user_id)
            .bind(to_epoch_opt(update.expires)?)
            .bind(&update.session_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(SessionRow::into_session).transpose()
    }

    async fn delete_session(&self, session_token: &str) -> AdapterResult<Option<Session>> {
        let sql = format!("DELETE FROM sessions WHERE session_token = ? RETURNING {SESSION_COLUMNS}");
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(session_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(SessionRow::into_session).transpose()
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        validate_verification_token(&token)?;
        let sql = format!(
            "INSERT INTO verification_tokens (identifier, token, expires) \
             VALUES (?, ?, {TO_DATETIME}) RETURNING {VERIFICATION_TOKEN_COLUMNS}"
        );
        let row: VerificationTokenRow = sqlx::query_as(&sql)
            .bind(&token.identifier)
            .bind(&token.token)
            .bind(to_epoch(token.expires)?)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        row.into_token()
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        // Lookup and delete are one statement, so a token can only be handed out once.
        let sql = format!(
            "DELETE FROM verification_tokens WHERE identifier = ? AND token = ? \
             RETURNING {VERIFICATION_TOKEN_COLUMNS}"
        );
        let row: Option<VerificationTokenRow> = sqlx::query_as(&sql)
            .bind(identifier)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(VerificationTokenRow::into_token).transpose()
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        let sql = format!("DELETE FROM sessions WHERE expires <= {TO_DATETIME}");
        let removed = sqlx::query(&sql)
            .bind(to_epoch(now)?)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();
        tracing::debug!(adapter = "sqlite", removed, "delete_expired_sessions");
        Ok(removed)
    }

    async fn delete_expired_verification_tokens(&self, now: DateTime<Utc>) -> AdapterResult<u64> {
        let sql = format!("DELETE FROM verification_tokens WHERE expires <= {TO_DATETIME}");
        let removed = sqlx::query(&sql)
            .bind(to_epoch(now)?)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();
        tracing::debug!(adapter = "sqlite", removed, "delete_expired_verification_tokens");
        Ok(removed)
    }
}
