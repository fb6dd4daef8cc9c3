use std::path::PathBuf;

use crate::secrets::SecretKey;

const ENVIRONMENT_VAR: &str = "Environment";
const PLATFORM_VAR: &str = "Platform";
const FUNCTION_VAR: &str = "Function";
const REGION_VAR: &str = "AWS_DEFAULT_REGION";
const SECRETS_ENABLED_VAR: &str = "SECRETS_ENABLED";
const ROUTE_FILE_VAR: &str = "ROUTE_FILE";
const SECRETS_ENDPOINT_VAR: &str = "SECRETS_ENDPOINT";
const LOCAL_SECRETS_FILE_VAR: &str = "LOCAL_SECRETS_FILE";

const DEFAULT_ROUTE_FILE: &str = "./routes.toml";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for environment variable {name}")]
    Invalid { name: &'static str, value: String },
}

/// Function configuration, built once at startup and shared by the secret
/// loader and the invocation wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Deployment environment name (e.g. "dev", "prod")
    pub environment: Option<String>,
    /// Platform the function belongs to
    pub platform: Option<String>,
    /// Name of the function itself
    pub function: Option<String>,
    /// Region for the secret store client, falls back to the default chain
    pub region: Option<String>,
    /// Whether secrets are fetched before every delegation
    pub secrets_enabled: bool,
    /// Declarative route file handed to the router
    pub route_file: PathBuf,
    /// Endpoint override for the secret store (LocalStack and friends)
    pub secrets_endpoint: Option<String>,
    /// When set, secrets are read from this JSON file instead of the managed store
    pub local_secrets_file: Option<PathBuf>,
}

impl Config {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration using the provided variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let secrets_enabled = match optional(SECRETS_ENABLED_VAR) {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: SECRETS_ENABLED_VAR,
                value,
            })?,
            None => false,
        };

        let config = Self {
            environment: optional(ENVIRONMENT_VAR),
            platform: optional(PLATFORM_VAR),
            function: optional(FUNCTION_VAR),
            region: optional(REGION_VAR),
            secrets_enabled,
            route_file: optional(ROUTE_FILE_VAR)
                .unwrap_or_else(|| DEFAULT_ROUTE_FILE.to_string())
                .into(),
            secrets_endpoint: optional(SECRETS_ENDPOINT_VAR),
            local_secrets_file: optional(LOCAL_SECRETS_FILE_VAR).map(PathBuf::from),
        };

        // The secret key names are only needed when secrets are loaded
        if config.secrets_enabled {
            config.secret_key()?;
        }

        Ok(config)
    }

    /// Key of the secret bundle belonging to this function
    pub fn secret_key(&self) -> Result<SecretKey, ConfigError> {
        let environment = self
            .environment
            .as_deref()
            .ok_or(ConfigError::Missing(ENVIRONMENT_VAR))?;
        let platform = self
            .platform
            .as_deref()
            .ok_or(ConfigError::Missing(PLATFORM_VAR))?;
        let function = self
            .function
            .as_deref()
            .ok_or(ConfigError::Missing(FUNCTION_VAR))?;

        Ok(SecretKey::new(environment, platform, function))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
