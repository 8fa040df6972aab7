//! Enrollment service: cache-aside front over the fetch orchestrator.

use crate::cache::{CacheError, CacheLayer, CacheStats, cache_key};
use crate::models::{EnrollmentResult, normalize_subjects};
use crate::orchestrator::FetchOrchestrator;
use crate::portal::PortalError;
use crate::portal::session::{SessionInfo, SessionManager};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One entry point per fetch: validates, consults the cache, runs the
/// orchestrator under the overall deadline, then writes back off the request
/// path.
pub struct EnrollmentService {
    orchestrator: FetchOrchestrator,
    cache: CacheLayer,
    sessions: Arc<SessionManager>,
    request_timeout: Duration,
}

impl EnrollmentService {
    pub fn new(
        orchestrator: FetchOrchestrator,
        cache: CacheLayer,
        sessions: Arc<SessionManager>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            sessions,
            request_timeout,
        }
    }

    /// Fetch enrollment data, serving from cache when permitted.
    ///
    /// Normalization runs first so a bad request is rejected identically
    /// whether or not its result happens to be cached. `use_cache: false`
    /// bypasses the lookup but still refreshes the entry on success.
    pub async fn get_enrollment(
        &self,
        subjects: &[String],
        term: Option<&str>,
        use_cache: bool,
    ) -> Result<EnrollmentResult, PortalError> {
        let subjects = normalize_subjects(subjects)?;
        let key = cache_key(&subjects, term);

        if use_cache {
            if let Some(hit) = self.cache.lookup(&key).await {
                info!(%key, "serving enrollment data from cache");
                return Ok(hit);
            }
        } else {
            debug!(%key, "cache bypass requested");
        }

        let result = match tokio::time::timeout(
            self.request_timeout,
            self.orchestrator.fetch(&subjects, term),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    %key,
                    timeout_secs = self.request_timeout.as_secs(),
                    "enrollment fetch exceeded overall deadline"
                );
                return Err(PortalError::Timeout(self.request_timeout));
            }
        };

        // Write-behind: the response never waits on the cache backend.
        let cache = self.cache.clone();
        let cached = result.clone();
        tokio::spawn(async move {
            cache.store(&key, &cached).await;
        });

        Ok(result)
    }

    pub async fn invalidate_cache(&self, pattern: &str) -> Result<u64, CacheError> {
        self.cache.invalidate(pattern).await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated().await
    }

    pub async fn session_info(&self) -> Option<SessionInfo> {
        self.sessions.session_info().await
    }
}
