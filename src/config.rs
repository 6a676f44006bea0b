use std::path::PathBuf;

use thiserror::Error;

use crate::constants::DEFAULT_ATTENTION_CATEGORY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub session_cookie: String,

    // Workflow
    pub attention_category: String,
    pub pin_policy: PinPolicy,
    pub resolve_scope: ResolveScope,
}

/// Which viewers get needs-attention topics pinned to the top of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinPolicy {
    /// Site administrators only
    #[default]
    Administrators,
    /// Administrators, global moderators and moderators of the listed category
    Moderators,
    /// Every viewer, guests included
    Everyone,
    /// Listings are never reordered
    Nobody,
}

/// Which categories the resolved toggle is available in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveScope {
    /// Any category
    #[default]
    Any,
    /// Only the attention-eligible category
    EligibleOnly,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/forum.sqlite"),
            web_host: "0.0.0.0".to_string(),
            web_port: 8080,
            session_cookie: "session".to_string(),
            attention_category: DEFAULT_ATTENTION_CATEGORY.to_string(),
            pin_policy: PinPolicy::default(),
            resolve_scope: ResolveScope::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/forum.sqlite")),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
            session_cookie: env_or_default("SESSION_COOKIE", "session"),

            // Workflow
            attention_category: env_or_default("ATTENTION_CATEGORY", DEFAULT_ATTENTION_CATEGORY),
            pin_policy: parse_pin_policy(&env_or_default("PIN_POLICY", "administrators"))?,
            resolve_scope: parse_resolve_scope(&env_or_default("RESOLVE_SCOPE", "any"))?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attention_category.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "ATTENTION_CATEGORY".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.session_cookie.is_empty() || self.session_cookie.contains(['=', ';', ' ']) {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_COOKIE".to_string(),
                message: format!("'{}' is not a valid cookie name", self.session_cookie),
            });
        }
        Ok(())
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_pin_policy(value: &str) -> Result<PinPolicy, ConfigError> {
    match value.to_lowercase().as_str() {
        "administrators" | "admins" => Ok(PinPolicy::Administrators),
        "moderators" | "mods" => Ok(PinPolicy::Moderators),
        "everyone" | "all" => Ok(PinPolicy::Everyone),
        "nobody" | "none" => Ok(PinPolicy::Nobody),
        _ => Err(ConfigError::InvalidValue {
            name: "PIN_POLICY".to_string(),
            message: format!(
                "must be 'administrators', 'moderators', 'everyone' or 'nobody', got '{value}'"
            ),
        }),
    }
}

fn parse_resolve_scope(value: &str) -> Result<ResolveScope, ConfigError> {
    match value.to_lowercase().as_str() {
        "any" => Ok(ResolveScope::Any),
        "eligible" | "eligible-only" | "eligible_only" => Ok(ResolveScope::EligibleOnly),
        _ => Err(ConfigError::InvalidValue {
            name: "RESOLVE_SCOPE".to_string(),
            message: format!("must be 'any' or 'eligible', got '{value}'"),
        }),
    }
}
