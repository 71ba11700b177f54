//! Engine behavior toggles.

/// Knobs that change how responses are served and how failures are
/// recorded. The API layer populates this from the process environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Named North-American timezone (or "utc") used when resolving
    /// relative date templates in request URLs.
    pub timezone: String,
    /// Strip identifying properties from responses before they are
    /// cached for public consumption.
    pub anonymize_responses: bool,
    /// Record origin failures as error records. When disabled, failed
    /// refreshes never trip the error limit.
    pub log_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "utc".to_string(),
            anonymize_responses: false,
            log_errors: true,
        }
    }
}
