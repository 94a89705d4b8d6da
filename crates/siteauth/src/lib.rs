// siteauth: storage adapters for a site's authentication framework.
//
// Picks an adapter from configuration and hands it out as `Arc<dyn Adapter>`.
// The backends themselves live in `siteauth-memory` and `siteauth-sqlx`.

pub mod config;
pub mod init;

pub use config::{AdapterConfig, AuthConfig, ProviderConfig, ProviderId, SessionStrategy};
pub use init::{build_adapter, ExpiredSweep, SiteAuth};

pub use siteauth_core::env::init_logger;
pub use siteauth_core::{
    Adapter, AdapterAccount, AdapterResult, AuthStoreError, FallbackPolicy, NewUser, NoopAdapter,
    Session, SessionAndUser, SessionUpdate, TieredAdapter, User, UserUpdate, VerificationToken,
};
pub use siteauth_memory::MemoryAdapter;
pub use siteauth_sqlx::{SqliteAdapter, SqliteOptions};
