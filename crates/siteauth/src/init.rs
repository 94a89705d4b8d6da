// Adapter selection: turns an `AuthConfig` into a ready `Arc<dyn Adapter>`.

use std::sync::Arc;

use chrono::Utc;
use siteauth_core::error::AdapterResult;
use siteauth_core::{Adapter, NoopAdapter, TieredAdapter};
use siteauth_memory::MemoryAdapter;
use siteauth_sqlx::{SqliteAdapter, SqliteOptions};

use crate::config::{AdapterConfig, AuthConfig, ProviderConfig, ProviderId, SessionStrategy};

/// A validated configuration together with the adapter it selects.
#[derive(Debug, Clone)]
pub struct SiteAuth {
    config: AuthConfig,
    adapter: Arc<dyn Adapter>,
}

impl SiteAuth {
    /// Validate `config` and build its adapter. SQLite databases get the
    /// schema applied before this returns.
    pub async fn init(config: AuthConfig) -> AdapterResult<Self> {
        config.validate()?;
        let adapter = build_adapter(&config.adapter).await?;
        tracing::info!(
            adapter = adapter.name(),
            session = ?config.session,
            providers = config.providers.len(),
            "siteauth initialized"
        );
        Ok(Self { config, adapter })
    }

    /// Use a prebuilt adapter instead of the one `config.adapter` names.
    pub fn with_adapter(config: AuthConfig, adapter: Arc<dyn Adapter>) -> AdapterResult<Self> {
        config.validate()?;
        Ok(Self { config, adapter })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn adapter(&self) -> Arc<dyn Adapter> {
        Arc::clone(&self.adapter)
    }

    pub fn session_strategy(&self) -> SessionStrategy {
        self.config.session
    }

    pub fn provider(&self, id: &ProviderId) -> Option<&ProviderConfig> {
        self.config.provider(id)
    }

    /// Remove every session and verification token that has expired by now.
    pub async fn sweep_expired(&self) -> AdapterResult<ExpiredSweep> {
        let now = Utc::now();
        let swept = ExpiredSweep {
            sessions: self.adapter.delete_expired_sessions(now).await?,
            verification_tokens: self.adapter.delete_expired_verification_tokens(now).await?,
        };
        tracing::debug!(
            adapter = self.adapter.name(),
            sessions = swept.sessions,
            verification_tokens = swept.verification_tokens,
            "expired records swept"
        );
        Ok(swept)
    }
}

/// How many records one `sweep_expired` call removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiredSweep {
    pub sessions: u64,
    pub verification_tokens: u64,
}

/// Construct the adapter described by `config`.
///
/// A SQLite adapter with a fallback policy other than `disabled` is wrapped in
/// a `TieredAdapter` over a fresh in-memory store.
pub async fn build_adapter(config: &AdapterConfig) -> AdapterResult<Arc<dyn Adapter>> {
    let adapter: Arc<dyn Adapter> = match config {
        AdapterConfig::Memory => Arc::new(MemoryAdapter::new()),
        AdapterConfig::Noop => Arc::new(NoopAdapter::new()),
        AdapterConfig::Sqlite {
            url,
            max_connections,
            fallback,
        } => {
            let sqlite = SqliteAdapter::connect_with(SqliteOptions {
                url: url.clone(),
                max_connections: *max_connections,
                run_migrations: true,
            })
            .await?;
            if fallback.is_enabled() {
                tracing::debug!(policy = ?fallback, "mirroring sqlite writes into memory");
                Arc::new(TieredAdapter::new(
                    Arc::new(sqlite),
                    Arc::new(MemoryAdapter::new()),
                    *fallback,
                ))
            } else {
                Arc::new(sqlite)
            }
        }
    };
    Ok(adapter)
}
