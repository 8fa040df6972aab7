//! Error taxonomy for the portal client and fetch orchestrator.

use std::time::Duration;

/// Classified failures surfaced by the portal client stack.
///
/// The orchestrator relies on these tags to decide per-kind whether to keep
/// aggregating partial results or abort: validation errors are terminal and
/// raised before any network call, authentication errors only surface after
/// the refresh-once retry is exhausted, and network/request failures for one
/// (subject, term) unit never abort sibling units.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("portal authentication failed: {0}")]
    Authentication(String),

    #[error("portal request failed with status {status}")]
    Request { status: u16 },

    #[error("network error: {0}")]
    Network(#[source] anyhow::Error),

    #[error("failed to parse portal response from {url}")]
    Parse {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("enrollment fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("no enrollment data retrieved: {0}")]
    Aggregate(String),
}

impl PortalError {
    pub fn network(err: impl Into<anyhow::Error>) -> Self {
        Self::Network(err.into())
    }
}
