// siteauth-core: entity models and the storage adapter contract.
//
// Backends live in their own crates (`siteauth-memory`, `siteauth-sqlx`); the
// no-op stub and the two-tier composition live here because they only need
// the trait.

pub mod db;
pub mod env;
pub mod error;
pub mod utils;

pub use db::adapter::Adapter;
pub use db::models::{
    AccountType, AdapterAccount, NewUser, Session, SessionAndUser, SessionUpdate, User,
    UserUpdate, VerificationToken,
};
pub use db::noop::NoopAdapter;
pub use db::tiered::{FallbackPolicy, TieredAdapter};
pub use error::{AdapterResult, AuthStoreError};
