//! Environment variable validation and configuration module for Tokengate
//!
//! This module provides centralized validation and configuration management
//! for all environment variables used by the token-relay proxy. Validation
//! runs once at startup; missing required values fail the process before it
//! accepts a single request.
//!
//! # Supported Environment Variables
//!
//! ## Identity Provider Configuration (required)
//! - `TOKENGATE_TOKEN_URL`: OAuth 2.0 token endpoint URL
//! - `TOKENGATE_CLIENT_ID`: OAuth client id
//! - `TOKENGATE_CLIENT_SECRET`: OAuth client secret
//! - `TOKENGATE_REDIRECT_URI`: redirect URI registered with the provider
//!
//! ## Upstream Configuration (required)
//! - `TOKENGATE_UPSTREAM_URL`: base URL of the proxied downstream service
//!
//! ## Relay Configuration
//! - `TOKENGATE_PROTECTED_PATH`: path prefix requiring a valid token (default: "/api")
//! - `TOKENGATE_HEADER_PREFIX`: provider-specific prefix for the injected
//!   token headers and the inbound auth-code header (default: "tmn")
//!
//! ## Server Configuration
//! - `TOKENGATE_HOST`: server bind address (default: "0.0.0.0")
//! - `TOKENGATE_PORT`: server port (default: "8080")
//!
//! ## Cache Configuration
//! - `TOKENGATE_CACHE_TTL_SECS`: token cache entry TTL in seconds (default: "300")
//! - `TOKENGATE_CACHE_CLEANUP_INTERVAL_SECS`: cleanup sweep interval in seconds (default: "600")
//!
//! ## Client Configuration
//! - `TOKENGATE_CLIENT_TIMEOUT_SECS`: process-wide outbound HTTP timeout (default: "30")
//!
//! ## Logging Configuration
//! - `RUST_LOG`: standard Rust logging configuration
//! - `TOKENGATE_LOG_LEVEL`: application-specific log level override

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::cache::{DEFAULT_CACHE_CLEANUP_INTERVAL_SECS, DEFAULT_TOKEN_CACHE_TTL_SECS};

pub const DEFAULT_LOG_LEVEL: &str = "tokengate=info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROTECTED_PATH: &str = "/api";
const DEFAULT_HEADER_PREFIX: &str = "tmn";
const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Environment validation errors
#[derive(Debug, Clone)]
pub struct EnvValidationError {
    pub variable: String,
    pub message: String,
    pub severity: ErrorSeverity,
}

impl fmt::Display for EnvValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.variable, self.message)
    }
}

/// Severity level for environment validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    /// Critical errors that prevent application startup
    Critical,
    /// Warnings about suboptimal configurations
    Warning,
    /// Informational messages about default values being used
    Info,
}

/// Validated application configuration derived from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Identity provider
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,

    // Upstream
    pub upstream_url: String,

    // Relay
    pub protected_path: String,
    pub header_prefix: String,

    // Server
    pub host: String,
    pub port: u16,
    pub bind_address: SocketAddr,

    // Cache
    pub cache_ttl_secs: u64,
    pub cache_cleanup_interval_secs: u64,

    // Outbound client
    pub client_timeout_secs: u64,
}

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Validate all environment variables and return configuration or errors
pub fn validate_environment() -> Result<AppConfig, Vec<EnvValidationError>> {
    validate_with(|name| env::var(name).ok())
}

/// Validate configuration from an arbitrary variable source
pub fn validate_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, Vec<EnvValidationError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Required identity provider and upstream values, fail fast when missing
    let token_url = required(&lookup, "TOKENGATE_TOKEN_URL", &mut errors);
    let client_id = required(&lookup, "TOKENGATE_CLIENT_ID", &mut errors);
    let client_secret = required(&lookup, "TOKENGATE_CLIENT_SECRET", &mut errors);
    let redirect_uri = required(&lookup, "TOKENGATE_REDIRECT_URI", &mut errors);
    let upstream_url = required(&lookup, "TOKENGATE_UPSTREAM_URL", &mut errors);

    for (name, value) in [
        ("TOKENGATE_TOKEN_URL", &token_url),
        ("TOKENGATE_UPSTREAM_URL", &upstream_url),
    ] {
        if !value.is_empty() && !value.starts_with("http://") && !value.starts_with("https://") {
            errors.push(EnvValidationError {
                variable: name.to_string(),
                message: format!("Must be an http(s) URL, got '{}'", value),
                severity: ErrorSeverity::Critical,
            });
        }
    }

    let protected_path = match lookup("TOKENGATE_PROTECTED_PATH") {
        Some(path) => {
            if !path.starts_with('/') {
                errors.push(EnvValidationError {
                    variable: "TOKENGATE_PROTECTED_PATH".to_string(),
                    message: format!("Must start with '/', got '{}'", path),
                    severity: ErrorSeverity::Critical,
                });
            }
            path
        }
        None => {
            warnings.push(EnvValidationError {
                variable: "TOKENGATE_PROTECTED_PATH".to_string(),
                message: format!("Using default protected path '{}'", DEFAULT_PROTECTED_PATH),
                severity: ErrorSeverity::Info,
            });
            DEFAULT_PROTECTED_PATH.to_string()
        }
    };

    let header_prefix = match lookup("TOKENGATE_HEADER_PREFIX") {
        Some(prefix) => {
            // The prefix becomes part of header names, keep it to token chars
            if prefix.is_empty()
                || !prefix
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                errors.push(EnvValidationError {
                    variable: "TOKENGATE_HEADER_PREFIX".to_string(),
                    message: format!(
                        "Must be non-empty lowercase letters, digits or '-', got '{}'",
                        prefix
                    ),
                    severity: ErrorSeverity::Critical,
                });
            }
            prefix
        }
        None => DEFAULT_HEADER_PREFIX.to_string(),
    };

    // Server configuration
    let host = lookup("TOKENGATE_HOST").unwrap_or_else(|| {
        warnings.push(EnvValidationError {
            variable: "TOKENGATE_HOST".to_string(),
            message: format!("Using default host '{}'", DEFAULT_HOST),
            severity: ErrorSeverity::Info,
        });
        DEFAULT_HOST.to_string()
    });

    if IpAddr::from_str(&host).is_err() {
        errors.push(EnvValidationError {
            variable: "TOKENGATE_HOST".to_string(),
            message: format!("Invalid IP address: {}", host),
            severity: ErrorSeverity::Critical,
        });
    }

    let port = match lookup("TOKENGATE_PORT") {
        Some(port_str) => match port_str.parse::<u16>() {
            Ok(port) => {
                if port < 1024 && port != 0 {
                    warnings.push(EnvValidationError {
                        variable: "TOKENGATE_PORT".to_string(),
                        message: format!(
                            "Using privileged port {}, may require root privileges",
                            port
                        ),
                        severity: ErrorSeverity::Warning,
                    });
                }
                port
            }
            Err(_) => {
                errors.push(EnvValidationError {
                    variable: "TOKENGATE_PORT".to_string(),
                    message: format!("Invalid port number: {}", port_str),
                    severity: ErrorSeverity::Critical,
                });
                DEFAULT_PORT
            }
        },
        None => DEFAULT_PORT,
    };

    let bind_address = match format!("{}:{}", host, port).parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(_) => {
            errors.push(EnvValidationError {
                variable: "TOKENGATE_HOST/TOKENGATE_PORT".to_string(),
                message: format!("Cannot create valid socket address from {}:{}", host, port),
                severity: ErrorSeverity::Critical,
            });
            SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
        }
    };

    let cache_ttl_secs = parse_u64(
        &lookup,
        "TOKENGATE_CACHE_TTL_SECS",
        DEFAULT_TOKEN_CACHE_TTL_SECS,
        &mut errors,
    );
    let cache_cleanup_interval_secs = parse_u64(
        &lookup,
        "TOKENGATE_CACHE_CLEANUP_INTERVAL_SECS",
        DEFAULT_CACHE_CLEANUP_INTERVAL_SECS,
        &mut errors,
    );
    let client_timeout_secs = parse_u64(
        &lookup,
        "TOKENGATE_CLIENT_TIMEOUT_SECS",
        DEFAULT_CLIENT_TIMEOUT_SECS,
        &mut errors,
    );

    if errors.iter().any(|e| e.severity == ErrorSeverity::Critical) {
        return Err(errors);
    }

    // Surface non-fatal findings through tracing
    for warning in &warnings {
        match warning.severity {
            ErrorSeverity::Warning => tracing::warn!("{}", warning),
            _ => tracing::info!("{}", warning),
        }
    }

    Ok(AppConfig {
        token_url,
        client_id,
        client_secret,
        redirect_uri,
        upstream_url,
        protected_path,
        header_prefix,
        host,
        port,
        bind_address,
        cache_ttl_secs,
        cache_cleanup_interval_secs,
        client_timeout_secs,
    })
}

///////////////////////////////////////////////////////////////////////////////
//****                      Private Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    errors: &mut Vec<EnvValidationError>,
) -> String {
    match lookup(name) {
        Some(value) if !value.is_empty() => value,
        _ => {
            errors.push(EnvValidationError {
                variable: name.to_string(),
                message: "Required variable is missing or empty".to_string(),
                severity: ErrorSeverity::Critical,
            });
            String::new()
        }
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    errors: &mut Vec<EnvValidationError>,
) -> u64 {
    match lookup(name) {
        Some(value) => match value.parse::<u64>() {
            Ok(parsed) => parsed,
            Err(_) => {
                errors.push(EnvValidationError {
                    variable: name.to_string(),
                    message: format!("Invalid number: {}", value),
                    severity: ErrorSeverity::Critical,
                });
                default
            }
        },
        None => default,
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TOKENGATE_TOKEN_URL", "https://idp.example.com/oauth2/v1/token"),
            ("TOKENGATE_CLIENT_ID", "cid"),
            ("TOKENGATE_CLIENT_SECRET", "csecret"),
            ("TOKENGATE_REDIRECT_URI", "http://localhost:8080/redirect"),
            ("TOKENGATE_UPSTREAM_URL", "http://localhost:9000"),
        ])
    }

    fn validate(vars: &HashMap<&str, &str>) -> Result<AppConfig, Vec<EnvValidationError>> {
        validate_with(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_minimal_configuration_uses_defaults() {
        let config = validate(&base_vars()).unwrap();
        assert_eq!(config.protected_path, "/api");
        assert_eq!(config.header_prefix, "tmn");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.cache_cleanup_interval_secs, 600);
        assert_eq!(config.client_timeout_secs, 30);
    }

    #[test]
    fn test_missing_required_variable_is_critical() {
        let mut vars = base_vars();
        vars.remove("TOKENGATE_CLIENT_SECRET");
        let errors = validate(&vars).unwrap_err();
        assert!(errors.iter().any(|e| {
            e.variable == "TOKENGATE_CLIENT_SECRET" && e.severity == ErrorSeverity::Critical
        }));
    }

    #[test]
    fn test_non_http_token_url_is_rejected() {
        let mut vars = base_vars();
        vars.insert("TOKENGATE_TOKEN_URL", "idp.example.com/token");
        assert!(validate(&vars).is_err());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut vars = base_vars();
        vars.insert("TOKENGATE_PORT", "not-a-port");
        assert!(validate(&vars).is_err());
    }

    #[test]
    fn test_header_prefix_must_be_header_safe() {
        let mut vars = base_vars();
        vars.insert("TOKENGATE_HEADER_PREFIX", "Bad Prefix");
        assert!(validate(&vars).is_err());

        vars.insert("TOKENGATE_HEADER_PREFIX", "acme-auth");
        let config = validate(&vars).unwrap();
        assert_eq!(config.header_prefix, "acme-auth");
    }

    #[test]
    fn test_protected_path_must_be_absolute() {
        let mut vars = base_vars();
        vars.insert("TOKENGATE_PROTECTED_PATH", "api");
        assert!(validate(&vars).is_err());
    }
}
