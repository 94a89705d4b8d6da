pub mod adapter;
pub mod models;
pub mod noop;
pub mod tiered;

pub use adapter::{validate_session, validate_verification_token, Adapter};
pub use models::{
    AccountType, AdapterAccount, NewUser, Session, SessionAndUser, SessionUpdate, User,
    UserUpdate, VerificationToken,
};
pub use noop::{AdapterCall, NoopAdapter};
pub use tiered::{FallbackPolicy, TieredAdapter};
