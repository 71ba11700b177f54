//! Process configuration
//!
//! Loaded from `RELAY_*` environment variables with development-friendly
//! defaults. OAuth settings are optional; without them every origin
//! fetch goes out unauthenticated.

use relay_engine::EngineConfig;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Credentials for the refresh-token OAuth flow against the origin's
/// authorization server.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_endpoint: String,
}

/// Server-wide configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind host for the HTTP server.
    pub host: String,
    /// Bind port for the HTTP server.
    pub port: u16,
    /// Timezone used when resolving date templates in request URLs.
    pub timezone: String,
    /// Strip identifying keys from publicly served responses.
    pub anonymize_responses: bool,
    /// Record origin failures as error records.
    pub log_errors: bool,
    /// OAuth client settings, absent in unauthenticated deployments.
    pub oauth: Option<OAuthConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            timezone: "utc".to_string(),
            anonymize_responses: false,
            log_errors: true,
            oauth: None,
        }
    }
}

impl RelayConfig {
    /// Create RelayConfig from environment variables.
    ///
    /// Environment variables:
    /// - `RELAY_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` / `RELAY_PORT`: bind port (default: 3000)
    /// - `RELAY_TIMEZONE`: date-template timezone (default: utc)
    /// - `RELAY_ANONYMIZE_RESPONSES`: "true" or "false" (default: false)
    /// - `RELAY_LOG_ERRORS`: "true" or "false" (default: true)
    /// - `RELAY_OAUTH_CLIENT_ID` / `RELAY_OAUTH_CLIENT_SECRET` /
    ///   `RELAY_OAUTH_TOKEN_ENDPOINT`: all three present enables the
    ///   refresh-token flow
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("RELAY_BIND").unwrap_or(defaults.host);
        let port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("RELAY_PORT").ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.port);
        let timezone = std::env::var("RELAY_TIMEZONE").unwrap_or(defaults.timezone);
        let anonymize_responses =
            env_bool("RELAY_ANONYMIZE_RESPONSES", defaults.anonymize_responses);
        let log_errors = env_bool("RELAY_LOG_ERRORS", defaults.log_errors);

        let oauth = match (
            std::env::var("RELAY_OAUTH_CLIENT_ID").ok(),
            std::env::var("RELAY_OAUTH_CLIENT_SECRET").ok(),
            std::env::var("RELAY_OAUTH_TOKEN_ENDPOINT").ok(),
        ) {
            (Some(client_id), Some(client_secret), Some(token_endpoint)) => Some(OAuthConfig {
                client_id,
                client_secret,
                token_endpoint,
            }),
            _ => None,
        };

        Self {
            host,
            port,
            timezone,
            anonymize_responses,
            log_errors,
            oauth,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The engine-facing slice of this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            timezone: self.timezone.clone(),
            anonymize_responses: self.anonymize_responses,
            log_errors: self.log_errors,
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
