//! HTTP client seam with a native-tls `ureq` implementation.
//!
//! The fetcher only ever needs two exchanges: a GET for an artifact and a
//! JSON POST for the reload request. Both go through [`HttpClient`] so the
//! orchestration layer can be driven by a scripted client in tests.

use crate::error::HttpError;
use siterm_fetcher_config::HttpSettings;
use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("siterm-config-fetcher/", env!("CARGO_PKG_VERSION"));

/// A completed HTTP exchange. Any status may appear here; classification is
/// left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Blocking HTTP collaborator.
///
/// `Err` means no response was received at all (the transport-failure
/// sentinel); any status code the server sent comes back as `Ok`.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;

    fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError>;
}

impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        (**self).get(url)
    }

    fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError> {
        (**self).post_json(url, body)
    }
}

/// Validate that a URL may be requested.
///
/// HTTPS is always accepted. Plain HTTP is accepted only when `allow_http`
/// is set; every other scheme is rejected.
pub fn validate_url(url: &str, allow_http: bool) -> Result<(), HttpError> {
    let parsed = url::Url::parse(url).map_err(|e| HttpError::UrlPolicy {
        url: url.to_string(),
        reason: format!("invalid URL: {}", e),
    })?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if allow_http => {
            log::warn!(
                "Fetching '{}' over insecure HTTP (allow_http is enabled)",
                url
            );
            Ok(())
        }
        "http" => Err(HttpError::UrlPolicy {
            url: url.to_string(),
            reason: "insecure scheme 'http'; only HTTPS is allowed unless \
                     `http.allow_http` is set"
                .to_string(),
        }),
        scheme => Err(HttpError::UrlPolicy {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

/// [`HttpClient`] backed by a `ureq` agent using native-tls.
pub struct UreqClient {
    agent: Agent,
    max_body_bytes: u64,
    allow_http: bool,
}

impl std::fmt::Debug for UreqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqClient")
            .field("max_body_bytes", &self.max_body_bytes)
            .field("allow_http", &self.allow_http)
            .finish_non_exhaustive()
    }
}

impl UreqClient {
    /// Create a client from the configured HTTP settings.
    ///
    /// Non-2xx statuses are returned as responses rather than errors so the
    /// retry layer can classify them.
    pub fn new(settings: &HttpSettings) -> Self {
        let tls_config = TlsConfig::builder()
            .provider(TlsProvider::NativeTls)
            .root_certs(RootCerts::PlatformVerifier)
            .build();

        let agent: Agent = Agent::config_builder()
            .tls_config(tls_config)
            .timeout_global(Some(settings.timeout()))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            max_body_bytes: settings.max_body_bytes,
            allow_http: settings.allow_http,
        }
    }

    fn read_response(
        &self,
        url: &str,
        mut response: ureq::http::Response<ureq::Body>,
    ) -> Result<HttpResponse, HttpError> {
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(HttpResponse {
                status,
                body: String::new(),
            });
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_string()
            .map_err(|e| HttpError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(HttpResponse { status, body })
    }
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        validate_url(url, self.allow_http)?;

        let response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| HttpError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        self.read_response(url, response)
    }

    fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError> {
        validate_url(url, self.allow_http)?;

        let response = self
            .agent
            .post(url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .send(body)
            .map_err(|e| HttpError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        self.read_response(url, response)
    }
}
