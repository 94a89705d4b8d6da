// Deployment configuration: session strategy, identity providers, and which
// storage adapter backs them.
//
// Loaded from TOML or from `AUTH_*` environment variables. Both paths end in
// `validate()`.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use siteauth_core::error::{AdapterResult, AuthStoreError};
use siteauth_core::FallbackPolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://siteauth.db";

/// How the framework keeps sessions. `Database` needs an adapter that stores them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStrategy {
    #[default]
    Jwt,
    Database,
}

impl SessionStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "jwt" => Some(Self::Jwt),
            "database" | "db" => Some(Self::Database),
            _ => None,
        }
    }
}

/// Identity provider key. Unknown names become `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderId {
    GitHub,
    Google,
    Discord,
    GitLab,
    Custom(String),
}

impl ProviderId {
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "github" => Self::GitHub,
            "google" => Self::Google,
            "discord" => Self::Discord,
            "gitlab" => Self::GitLab,
            _ => Self::Custom(value),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::GitHub => "github",
            Self::Google => "google",
            Self::Discord => "discord",
            Self::GitLab => "gitlab",
            Self::Custom(name) => name,
        }
    }

    /// Prefix of this provider's credential variables, e.g. `AUTH_GITHUB`.
    pub fn env_prefix(&self) -> String {
        let key: String = self
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("AUTH_{key}")
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ProviderId> for String {
    fn from(id: ProviderId) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: ProviderId,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl ProviderConfig {
    pub fn new(id: ProviderId, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            id,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

// Keep the secret out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

fn default_max_connections() -> u32 {
    1
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

/// Which storage adapter to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdapterConfig {
    #[default]
    Memory,
    Sqlite {
        #[serde(default = "default_database_url")]
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Mirror into an in-memory tier when not `disabled`.
        #[serde(default)]
        fallback: FallbackPolicy,
    },
    Noop,
}

impl AdapterConfig {
    pub fn sqlite(url: impl Into<String>) -> Self {
        Self::Sqlite {
            url: url.into(),
            max_connections: default_max_connections(),
            fallback: FallbackPolicy::Disabled,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite { .. } => "sqlite",
            Self::Noop => "noop",
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub session: SessionStrategy,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub trust_host: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session", &self.session)
            .field("providers", &self.providers)
            .field("adapter", &self.adapter)
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .field("trust_host", &self.trust_host)
            .finish()
    }
}

impl AuthConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> AdapterResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AuthStoreError::Config(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AdapterResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthStoreError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Build from the process environment, after loading `.env` if present.
    pub fn from_env() -> AdapterResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    ///
    /// Recognized keys: `AUTH_ADAPTER` (`memory`, `sqlite`, `noop`; defaults to
    /// `sqlite` when `AUTH_DATABASE_URL` is set), `AUTH_DATABASE_URL`,
    /// `AUTH_FALLBACK`, `AUTH_SESSION_STRATEGY`, `AUTH_PROVIDERS` (comma
    /// separated, credentials in `AUTH_<PROVIDER>_ID` / `AUTH_<PROVIDER>_SECRET`),
    /// `AUTH_SECRET`, `AUTH_TRUST_HOST`.
    pub fn from_vars<F>(source: F) -> AdapterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| source(key).filter(|v| !v.trim().is_empty());

        let database_url = var("AUTH_DATABASE_URL");
        let default_kind = if database_url.is_some() { "sqlite" } else { "memory" };
        let kind = var("AUTH_ADAPTER").unwrap_or_else(|| default_kind.to_string());
        let adapter = match kind.trim().to_lowercase().as_str() {
            "memory" => AdapterConfig::Memory,
            "noop" => AdapterConfig::Noop,
            "sqlite" => {
                let fallback = match var("AUTH_FALLBACK") {
                    Some(value) => FallbackPolicy::parse(&value).ok_or_else(|| {
                        AuthStoreError::Config(format!("Unknown AUTH_FALLBACK value: {value}"))
                    })?,
                    None => FallbackPolicy::Disabled,
                };
                AdapterConfig::Sqlite {
                    url: database_url.unwrap_or_else(default_database_url),
                    max_connections: default_max_connections(),
                    fallback,
                }
            }
            other => {
                return Err(AuthStoreError::Config(format!(
                    "Unknown AUTH_ADAPTER value: {other}"
                )))
            }
        };

        let session = match var("AUTH_SESSION_STRATEGY") {
            Some(value) => SessionStrategy::parse(&value).ok_or_else(|| {
                AuthStoreError::Config(format!("Unknown AUTH_SESSION_STRATEGY value: {value}"))
            })?,
            None => SessionStrategy::default(),
        };

        let providers = var("AUTH_PROVIDERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                let id = ProviderId::parse(name);
                let prefix = id.env_prefix();
                ProviderConfig {
                    client_id: var(&format!("{prefix}_ID")).unwrap_or_default(),
                    client_secret: var(&format!("{prefix}_SECRET")).unwrap_or_default(),
                    id,
                }
            })
            .collect();

        let trust_host = var("AUTH_TRUST_HOST")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let config = Self {
            session,
            providers,
            adapter,
            secret: var("AUTH_SECRET"),
            trust_host,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the adapter layer can't serve.
    pub fn validate(&self) -> AdapterResult<()> {
        if self.session == SessionStrategy::Database && self.adapter == AdapterConfig::Noop {
            return Err(AuthStoreError::Config(
                "database sessions need a storing adapter, not noop".into(),
            ));
        }

        if let AdapterConfig::Sqlite {
            url,
            max_connections,
            ..
        } = &self.adapter
        {
            if url.trim().is_empty() {
                return Err(AuthStoreError::Config("sqlite adapter needs a url".into()));
            }
            if *max_connections == 0 {
                return Err(AuthStoreError::Config(
                    "max_connections must be greater than 0".into(),
                ));
            }
        }

        for (i, provider) in self.providers.iter().enumerate() {
            if provider.client_id.trim().is_empty() {
                return Err(AuthStoreError::Config(format!(
                    "provider {} is missing a client id ({}_ID)",
                    provider.id,
                    provider.id.env_prefix()
                )));
            }
            if provider.client_secret.trim().is_empty() {
                return Err(AuthStoreError::Config(format!(
                    "provider {} is missing a client secret ({}_SECRET)",
                    provider.id,
                    provider.id.env_prefix()
                )));
            }
            if self.providers[..i].iter().any(|p| p.id == provider.id) {
                return Err(AuthStoreError::Config(format!(
                    "provider {} is configured twice",
                    provider.id
                )));
            }
        }
        Ok(())
    }

    pub fn provider(&self, id: &ProviderId) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| &p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.session, SessionStrategy::Jwt);
        assert_eq!(config.adapter, AdapterConfig::Memory);
        assert!(config.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_id_parse() {
        assert_eq!(ProviderId::parse("GitHub"), ProviderId::GitHub);
        assert_eq!(ProviderId::parse(" gitlab "), ProviderId::GitLab);
        assert_eq!(
            ProviderId::parse("okta"),
            ProviderId::Custom("okta".to_string())
        );
        assert_eq!(ProviderId::GitHub.env_prefix(), "AUTH_GITHUB");
        assert_eq!(ProviderId::parse("azure-ad").env_prefix(), "AUTH_AZURE_AD");
    }

    #[test]
    fn test_from_toml_str() {
        let config = AuthConfig::from_toml_str(
            r#"
            session = "database"
            trust_host = true

            [adapter]
            kind = "sqlite"
            url = "sqlite://auth.db"
            fallback = "best-effort"

            [[providers]]
            id = "github"
            client_id = "gh-id"
            client_secret = "gh-secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.session, SessionStrategy::Database);
        assert!(config.trust_host);
        assert_eq!(
            config.adapter,
            AdapterConfig::Sqlite {
                url: "sqlite://auth.db".into(),
                max_connections: 1,
                fallback: FallbackPolicy::BestEffort,
            }
        );
        let github = config.provider(&ProviderId::GitHub).unwrap();
        assert_eq!(github.client_id, "gh-id");
        assert!(config.provider(&ProviderId::Google).is_none());
    }

    #[test]
    fn test_toml_rejects_unknown_adapter_kind() {
        let err = AuthConfig::from_toml_str("[adapter]\nkind = \"postgres\"\n").unwrap_err();
        assert!(matches!(err, AuthStoreError::Config(_)));
    }

    #[test]
    fn test_database_sessions_with_noop_rejected() {
        let config = AuthConfig {
            session: SessionStrategy::Database,
            adapter: AdapterConfig::Noop,
            ..AuthConfig::default()
        };
        assert!(matches!(config.validate(), Err(AuthStoreError::Config(_))));
    }

    #[test]
    fn test_provider_without_secret_rejected() {
        let config = AuthConfig {
            providers: vec![ProviderConfig::new(ProviderId::Google, "id", "")],
            ..AuthConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AUTH_GOOGLE_SECRET"), "{err}");
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let config = AuthConfig {
            providers: vec![
                ProviderConfig::new(ProviderId::GitHub, "a", "b"),
                ProviderConfig::new(ProviderId::GitHub, "c", "d"),
            ],
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_vars() {
        let config = AuthConfig::from_vars(vars(&[
            ("AUTH_DATABASE_URL", "sqlite://site.db"),
            ("AUTH_FALLBACK", "write_through"),
            ("AUTH_SESSION_STRATEGY", "database"),
            ("AUTH_PROVIDERS", "github, discord"),
            ("AUTH_GITHUB_ID", "gh"),
            ("AUTH_GITHUB_SECRET", "gh-s"),
            ("AUTH_DISCORD_ID", "dc"),
            ("AUTH_DISCORD_SECRET", "dc-s"),
            ("AUTH_SECRET", "s3cret"),
            ("AUTH_TRUST_HOST", "true"),
        ]))
        .unwrap();

        assert_eq!(
            config.adapter,
            AdapterConfig::Sqlite {
                url: "sqlite://site.db".into(),
                max_connections: 1,
                fallback: FallbackPolicy::WriteThrough,
            }
        );
        assert_eq!(config.session, SessionStrategy::Database);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(
            config.provider(&ProviderId::Discord).map(|p| p.client_secret.as_str()),
            Some("dc-s")
        );
        assert_eq!(config.secret.as_deref(), Some("s3cret"));
        assert!(config.trust_host);
    }

    #[test]
    fn test_from_vars_defaults_to_memory() {
        let config = AuthConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, AuthConfig::default());
    }

    #[test]
    fn test_from_vars_provider_missing_credentials() {
        let err = AuthConfig::from_vars(vars(&[("AUTH_PROVIDERS", "google")])).unwrap_err();
        assert!(err.to_string().contains("AUTH_GOOGLE_ID"), "{err}");
    }

    #[test]
    fn test_from_vars_rejects_unknown_values() {
        assert!(AuthConfig::from_vars(vars(&[("AUTH_ADAPTER", "redis")])).is_err());
        assert!(AuthConfig::from_vars(vars(&[
            ("AUTH_ADAPTER", "sqlite"),
            ("AUTH_FALLBACK", "sometimes"),
        ]))
        .is_err());
        assert!(AuthConfig::from_vars(vars(&[("AUTH_SESSION_STRATEGY", "cookie")])).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AuthConfig {
            secret: Some("top-secret".into()),
            providers: vec![ProviderConfig::new(ProviderId::GitHub, "id", "hidden")],
            ..AuthConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("hidden"));
    }
}
