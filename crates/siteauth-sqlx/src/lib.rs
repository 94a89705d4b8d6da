// siteauth-sqlx: SQLite storage adapter.
//
// Maps the auth entity models onto the `users`, `login_provider_accounts`,
// `sessions`, and `verification_tokens` tables (see `migrations/`).

pub mod adapter;
pub mod epoch;
pub mod error;
mod rows;

pub use adapter::{SqliteAdapter, SqliteOptions};
