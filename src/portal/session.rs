//! Authenticated portal session lifecycle.
//!
//! The portal exposes no credentialed API; a "session" is whatever cookies
//! and anti-forgery token a browser would hold after loading the course
//! catalog page. One manager owns one session, replaced wholesale on refresh,
//! never mutated in place.

use crate::portal::errors::PortalError;
use crate::portal::token;
use crate::portal::transport::Transport;
use crate::utils::fmt_duration;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Cookie the portal requires on every authenticated request.
pub const ANTIFORGERY_COOKIE: &str = ".ColleagueSelfServiceAntiforgery";

/// Catalog page visited to bootstrap cookies and the CSRF token.
pub const BOOTSTRAP_PATH: &str = "/Student/Courses";

/// An immutable snapshot of portal credentials.
#[derive(Debug, Clone)]
pub struct Session {
    pub cookies: HashMap<String, String>,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// A session is valid iff the anti-forgery cookie is present, the CSRF
    /// token is non-empty, and it has not expired.
    pub fn is_valid(&self) -> bool {
        self.cookies
            .get(ANTIFORGERY_COOKIE)
            .is_some_and(|v| !v.is_empty())
            && !self.csrf_token.is_empty()
            && !self.is_expired()
    }

    /// Headers that make a portal XHR pass for the browser that bootstrapped
    /// this session.
    pub fn request_headers(&self, base_url: &str) -> Vec<(String, String)> {
        let cookie_header = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        vec![
            ("Cookie".to_string(), cookie_header),
            (
                "__RequestVerificationToken".to_string(),
                self.csrf_token.clone(),
            ),
            ("__IsGuestUser".to_string(), "true".to_string()),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            ("Origin".to_string(), base_url.to_string()),
            (
                "Referer".to_string(),
                format!("{base_url}{BOOTSTRAP_PATH}"),
            ),
            (
                "Accept".to_string(),
                "application/json, text/javascript, */*; q=0.01".to_string(),
            ),
        ]
    }
}

/// Diagnostic view of the current session, for the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_valid: bool,
    pub has_cookies: bool,
    pub has_csrf_token: bool,
}

/// Owns the one shared session and serializes its replacement.
///
/// All mutation happens under a single async mutex, so concurrent callers
/// that find no valid session converge on one bootstrap instead of racing
/// to create several.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    base_url: String,
    session_ttl: chrono::Duration,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        session_ttl: std::time::Duration,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            session_ttl: chrono::Duration::from_std(session_ttl)
                .unwrap_or_else(|_| chrono::Duration::minutes(30)),
            current: Mutex::new(None),
        }
    }

    /// Return a currently valid session, bootstrapping one if necessary.
    pub async fn acquire(&self) -> Result<Session, PortalError> {
        let mut guard = self.current.lock().await;
        if let Some(session) = guard.as_ref()
            && session.is_valid()
        {
            debug!("using existing portal session");
            return Ok(session.clone());
        }

        info!("creating new portal session");
        let session = self.bootstrap().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Discard the current session and bootstrap a new one unconditionally.
    pub async fn force_refresh(&self) -> Result<Session, PortalError> {
        let mut guard = self.current.lock().await;
        info!("refreshing portal session");
        let session = self.bootstrap().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Report validity of the current session without side effects.
    pub async fn is_authenticated(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(Session::is_valid)
    }

    /// Snapshot of the current session for diagnostics, if one exists.
    pub async fn session_info(&self) -> Option<SessionInfo> {
        self.current.lock().await.as_ref().map(|s| SessionInfo {
            created_at: s.created_at,
            expires_at: s.expires_at,
            is_valid: s.is_valid(),
            has_cookies: !s.cookies.is_empty(),
            has_csrf_token: !s.csrf_token.is_empty(),
        })
    }

    /// Visit the catalog page and build a session from its cookies and token.
    ///
    /// A missing cookie or token is an authentication failure; transport
    /// failures pass through as network errors. Neither is retried here --
    /// the retry-once policy belongs to the search/detail clients.
    async fn bootstrap(&self) -> Result<Session, PortalError> {
        let url = format!("{}{}", self.base_url, BOOTSTRAP_PATH);
        let started = Instant::now();
        let response = self.transport.get(&url).await?;
        debug!(
            status = response.status,
            duration = fmt_duration(started.elapsed()),
            "bootstrap page fetched"
        );

        if response.status != 200 {
            return Err(PortalError::Request {
                status: response.status,
            });
        }

        if !response
            .cookies
            .get(ANTIFORGERY_COOKIE)
            .is_some_and(|v| !v.is_empty())
        {
            return Err(PortalError::Authentication(
                "portal did not set the required anti-forgery cookie".to_string(),
            ));
        }

        let csrf_token = token::extract_csrf_token(&response.body).ok_or_else(|| {
            PortalError::Authentication(
                "could not extract CSRF token from bootstrap page".to_string(),
            )
        })?;

        let now = Utc::now();
        Ok(Session {
            cookies: response.cookies,
            csrf_token,
            created_at: now,
            expires_at: now + self.session_ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_with(cookie: Option<&str>, token: &str, ttl_minutes: i64) -> Session {
        let mut cookies = HashMap::new();
        if let Some(value) = cookie {
            cookies.insert(ANTIFORGERY_COOKIE.to_string(), value.to_string());
        }
        let now = Utc::now();
        Session {
            cookies,
            csrf_token: token.to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn valid_session_passes_all_checks() {
        assert!(session_with(Some("cookie"), "token", 30).is_valid());
    }

    #[test]
    fn missing_antiforgery_cookie_is_never_valid() {
        // Token set, expiry in the future -- the cookie alone decides.
        assert!(!session_with(None, "token", 30).is_valid());
        assert!(!session_with(Some(""), "token", 30).is_valid());
    }

    #[test]
    fn empty_csrf_token_is_invalid() {
        assert!(!session_with(Some("cookie"), "", 30).is_valid());
    }

    #[test]
    fn expired_session_is_invalid() {
        assert!(!session_with(Some("cookie"), "token", -1).is_valid());
    }

    #[test]
    fn request_headers_carry_cookie_and_token() {
        let session = session_with(Some("abc"), "tok", 30);
        let headers = session.request_headers("https://portal.example.edu");
        let lookup = |name: &str| {
            headers
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(
            lookup("Cookie").unwrap(),
            format!("{ANTIFORGERY_COOKIE}=abc")
        );
        assert_eq!(lookup("__RequestVerificationToken").unwrap(), "tok");
        assert_eq!(
            lookup("Referer").unwrap(),
            "https://portal.example.edu/Student/Courses"
        );
    }
}
