// sqlx error translation.

use siteauth_core::error::AuthStoreError;

/// Map a driver error onto the adapter error type. Unique, foreign-key and
/// check violations become `Constraint`, everything else `Database`.
pub fn db_error(err: sqlx::Error) -> AuthStoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() {
            return AuthStoreError::Constraint(db.message().to_string());
        }
    }
    AuthStoreError::Database(err.to_string())
}

pub fn migrate_error(err: sqlx::migrate::MigrateError) -> AuthStoreError {
    AuthStoreError::Database(format!("Migration failed: {err}"))
}
