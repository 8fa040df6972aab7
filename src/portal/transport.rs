//! HTTP transport seam for portal calls.
//!
//! The session, search, and detail clients talk to the portal exclusively
//! through the [`Transport`] trait so the whole stack can be exercised in
//! tests with a scripted implementation. [`HttpTransport`] is the production
//! implementation over reqwest.

use crate::portal::errors::PortalError;
use anyhow::Context;
use async_trait::async_trait;
use http::header;
use std::collections::HashMap;
use std::time::Duration;

/// Firefox on macOS; the portal rejects obviously non-browser agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:140.0) Gecko/20100101 Firefox/140.0";

/// A portal response reduced to what the clients need: status, body, and any
/// cookies the server set.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub status: u16,
    pub body: String,
    pub cookies: HashMap<String, String>,
}

/// Generic request/response client for the portal.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET, returning the body and response cookies.
    async fn get(&self, url: &str) -> Result<PortalResponse, PortalError>;

    /// Issue a POST with a JSON body and the given extra headers.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<PortalResponse, PortalError>;
}

/// Production transport over a shared reqwest client.
///
/// Redirects are never followed: a 302 to the login page is an authentication
/// signal the detail client must observe, not silently chase.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        default_headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(default_headers)
            .build()
            .context("failed to build portal HTTP client")?;
        Ok(Self { client })
    }

    fn collect(response: &reqwest::Response) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        for value in response.headers().get_all(header::SET_COOKIE) {
            if let Ok(raw) = value.to_str()
                && let Ok(parsed) = cookie::Cookie::parse(raw.to_owned())
            {
                cookies.insert(parsed.name().to_string(), parsed.value().to_string());
            }
        }
        cookies
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<PortalResponse, PortalError> {
        let response = self
            .client
            .get(url)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(PortalError::network)?;

        let status = response.status().as_u16();
        let cookies = Self::collect(&response);
        let body = response.text().await.map_err(PortalError::network)?;
        Ok(PortalResponse {
            status,
            body,
            cookies,
        })
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<PortalResponse, PortalError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(PortalError::network)?;
        let status = response.status().as_u16();
        let cookies = Self::collect(&response);
        let body = response.text().await.map_err(PortalError::network)?;
        Ok(PortalResponse {
            status,
            body,
            cookies,
        })
    }
}
