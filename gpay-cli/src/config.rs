//! CLI configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! api_base_url = "https://api.linode.com/v4/"
//! api_token = "$LINODE_TOKEN"
//! timeout_secs = 30
//! cache_ttl_secs = 300
//!
//! [google_pay]
//! merchant_id = "BCR2DN4T000000"
//! environment = "PRODUCTION"
//! ```
//!
//! # Environment Variables
//!
//! - `GPAY_CONFIG` - Path to configuration file (default: `gpay.toml`)
//! - `API_BASE_URL` - Override the billing API base URL
//! - `API_TOKEN` - Override the billing API token

use std::path::Path;
use std::time::Duration;

use gpay::config::GooglePayConfig;
use gpay_http::constants::{DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};

/// Errors raised while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`CliConfig`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Billing API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Personal access token for the billing API.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Lifetime of cached list responses in seconds; `0` disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Google Pay merchant settings.
    #[serde(default)]
    pub google_pay: GooglePayConfig,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_cache_ttl_secs() -> u64 {
    gpay::cache::QueryCache::DEFAULT_TTL.as_secs()
}

impl CliConfig {
    /// Loads configuration from `path`, or defaults if the file is missing.
    ///
    /// String values with `$VAR` / `${VAR}` references are expanded from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            String::new()
        };
        Self::parse(&content, |name| std::env::var(name).ok())
    }

    /// Parses TOML after expanding variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the expanded text is not valid.
    pub fn parse(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content, lookup);
        let mut config: Self = toml::from_str(&expanded)?;
        // An unresolved `$VAR` is no token at all.
        if config
            .api_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty() || t.starts_with('$'))
        {
            config.api_token = None;
        }
        Ok(config)
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache lifetime for list responses.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match (name.is_empty(), lookup(name.as_str())) {
            (false, Some(value)) => result.push_str(&value),
            (true, _) => {
                result.push('$');
                if braced {
                    result.push('{');
                }
            }
            (false, None) => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if braced {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpay::config::Environment;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "TOKEN" => Some("secret".to_owned()),
            "MERCHANT" => Some("BCR2DN4T000000".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn expands_plain_and_braced_variables() {
        assert_eq!(
            expand_env_vars("a=$TOKEN b=${MERCHANT}!", lookup),
            "a=secret b=BCR2DN4T000000!"
        );
    }

    #[test]
    fn leaves_unresolved_variables() {
        assert_eq!(
            expand_env_vars("$MISSING ${ALSO_MISSING} $", lookup),
            "$MISSING ${ALSO_MISSING} $"
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = CliConfig::parse("", lookup).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.google_pay, GooglePayConfig::default());
        assert!(config.api_token.is_none());
    }

    #[test]
    fn parses_google_pay_section() {
        let config = CliConfig::parse(
            r#"
            api_token = "$TOKEN"
            cache_ttl_secs = 0

            [google_pay]
            merchant_id = "${MERCHANT}"
            environment = "PRODUCTION"
            "#,
            lookup,
        )
        .unwrap();
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.cache_ttl(), Duration::ZERO);
        assert_eq!(config.google_pay.environment, Environment::Production);
        assert!(config.google_pay.has_merchant_id());
    }

    #[test]
    fn unresolved_token_is_dropped() {
        let config = CliConfig::parse(r#"api_token = "$NOT_SET""#, lookup).unwrap();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn rejects_invalid_toml() {
        assert!(matches!(
            CliConfig::parse("timeout_secs = \"soon\"", lookup),
            Err(ConfigError::Parse(_))
        ));
    }
}
