// Record builders for adapter tests.
//
// Keys are randomized so checks can share one adapter without colliding.
// Timestamps are truncated to whole seconds, the precision the SQLite
// backend keeps.

use chrono::{DateTime, Duration, Timelike, Utc};

use siteauth_core::utils::id::generate_id_body;
use siteauth_core::{AccountType, AdapterAccount, NewUser, Session, VerificationToken};

/// `now` without sub-second precision.
pub fn now() -> DateTime<Utc> {
    whole_seconds(Utc::now())
}

pub fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_nanosecond(0).unwrap_or(at)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", generate_id_body(10))
}

pub fn unique_token() -> String {
    generate_id_body(32)
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        image: Some(format!("https://avatars.example.com/{name}.png")),
        ..NewUser::new(name, unique_email(&name.to_lowercase()))
    }
}

/// A GitHub account with a full set of token material.
pub fn github_account(user_id: &str) -> AdapterAccount {
    AdapterAccount {
        account_type: AccountType::Oauth,
        access_token: Some(format!("gho_{}", generate_id_body(20))),
        refresh_token: Some(format!("ghr_{}", generate_id_body(20))),
        expires_at: Some(now().timestamp() + 8 * 3600),
        scope: Some("read:user user:email".into()),
        token_type: Some("bearer".into()),
        ..AdapterAccount::new(user_id, "github", generate_id_body(8))
    }
}

pub fn session_for(user_id: &str, ttl: Duration) -> Session {
    Session::new(unique_token(), user_id, now() + ttl)
}

pub fn verification_token(identifier: &str, ttl: Duration) -> VerificationToken {
    VerificationToken::new(identifier, unique_token(), now() + ttl)
}
