//! Environment-based application configuration.

use serde::{Deserialize, Deserializer};

/// Application settings, loaded from environment variables via figment.
///
/// Every field has a default so the binary starts with nothing but
/// `PORTAL_BASE_URL` overridden in production.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the web server binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the registration portal (no trailing slash).
    #[serde(default = "default_portal_base_url")]
    pub portal_base_url: String,

    /// Per-request timeout for outbound portal calls, in seconds.
    #[serde(default = "default_portal_timeout_secs")]
    pub portal_timeout_secs: u64,

    /// Overall deadline for one enrollment fetch (fan-out included), in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long a bootstrapped portal session is trusted, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Default TTL for cached enrollment results, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Redis connection URL. When unset, an in-process store is used instead.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Cap on simultaneous outbound portal calls (search and detail combined).
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Maximum subject codes accepted per search call.
    #[serde(default = "default_max_subjects_per_request")]
    pub max_subjects_per_request: usize,

    /// Term codes searched when a request does not name a term.
    ///
    /// Comma-separated in the environment (e.g. `2025FA,2026SP`). This list is
    /// maintained by hand; when empty, searches run unconstrained by term.
    #[serde(default, deserialize_with = "comma_list")]
    pub default_terms: Vec<String>,

    /// Base log level for the crate's own modules.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8000
}

fn default_portal_base_url() -> String {
    "https://selfservice.example.edu".to_string()
}

fn default_portal_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_cache_ttl_secs() -> u64 {
    5 * 60
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_max_subjects_per_request() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Deserialize a comma-separated string into a list, dropping empty entries.
fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct TermsOnly {
        #[serde(default, deserialize_with = "comma_list")]
        default_terms: Vec<String>,
    }

    #[test]
    fn comma_list_splits_and_trims() {
        let parsed: TermsOnly =
            serde_json::from_str(r#"{"default_terms": " 2025FA, 2026SP ,,"}"#).unwrap();
        assert_eq!(parsed.default_terms, vec!["2025FA", "2026SP"]);
    }

    #[test]
    fn comma_list_defaults_empty() {
        let parsed: TermsOnly = serde_json::from_str("{}").unwrap();
        assert!(parsed.default_terms.is_empty());
    }
}
