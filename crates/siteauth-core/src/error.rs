// Error type shared by every adapter.
//
// Not-found is never an error: lookups return `Ok(None)` and the caller decides.

/// Storage adapter error.
#[derive(Debug, thiserror::Error)]
pub enum AuthStoreError {
    /// A create call was missing a field the record cannot exist without.
    /// Raised before anything is written.
    #[error("Missing required field `{field}` on {model}")]
    MissingField {
        model: &'static str,
        field: &'static str,
    },

    /// Unique or foreign-key constraint violation.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(String),

    /// The fallback tier of a write-through adapter rejected a mirrored write.
    #[error("Fallback store error: {0}")]
    Fallback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AuthStoreError {
    pub fn missing_field(model: &'static str, field: &'static str) -> Self {
        Self::MissingField { model, field }
    }

    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }
}

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, AuthStoreError>;
