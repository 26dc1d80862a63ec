//! Reload requests sent to the site frontend after a configuration change.

use crate::error::HttpError;
use crate::http::HttpClient;
use serde::{Deserialize, Serialize};

/// Body of the frontend's service-action request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadRequest {
    pub servicename: String,
    pub hostname: String,
}

impl ReloadRequest {
    /// Request a reload of `service_name` on behalf of this host.
    pub fn for_local_host(service_name: &str) -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        Self {
            servicename: service_name.to_string(),
            hostname,
        }
    }
}

/// Something that can ask the persistent service to reload its configuration.
pub trait ReloadNotifier: Send {
    fn notify(&self, request: &ReloadRequest) -> Result<(), HttpError>;
}

/// Posts [`ReloadRequest`]s as JSON to a fixed endpoint.
#[derive(Debug)]
pub struct HttpReloadNotifier<C> {
    client: C,
    endpoint: String,
}

impl<C: HttpClient> HttpReloadNotifier<C> {
    pub fn new(client: C, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<C: HttpClient> ReloadNotifier for HttpReloadNotifier<C> {
    fn notify(&self, request: &ReloadRequest) -> Result<(), HttpError> {
        let body = serde_json::to_string(request).map_err(|e| HttpError::Body {
            url: self.endpoint.clone(),
            message: format!("failed to encode reload request: {}", e),
        })?;

        log::info!(
            "Requesting reload of '{}' for host {} via {}",
            request.servicename,
            request.hostname,
            self.endpoint
        );
        let response = self.client.post_json(&self.endpoint, &body)?;
        if !response.is_ok() {
            return Err(HttpError::Status {
                url: self.endpoint.clone(),
                status: response.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;

    const ENDPOINT: &str = "https://fe.example.org/sitefe/json/frontend/serviceaction";

    #[test]
    fn test_payload_shape() {
        let request = ReloadRequest {
            servicename: "ALL".to_string(),
            hostname: "node1.example.org".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json["servicename"], "ALL");
        assert_eq!(json["hostname"], "node1.example.org");
    }

    #[test]
    fn test_for_local_host_sets_service_and_hostname() {
        let request = ReloadRequest::for_local_host("ALL");
        assert_eq!(request.servicename, "ALL");
        assert!(!request.hostname.is_empty());
    }

    #[test]
    fn test_notify_posts_json_to_endpoint() {
        let client = ScriptedClient::new();
        let notifier = HttpReloadNotifier::new(client.clone(), ENDPOINT);
        let request = ReloadRequest {
            servicename: "ALL".to_string(),
            hostname: "h".to_string(),
        };

        notifier.notify(&request).unwrap();

        let posts = client.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, ENDPOINT);
        let sent: ReloadRequest = serde_json::from_str(&posts[0].1).unwrap();
        assert_eq!(sent, request);
        assert!(client.requests().is_empty());
    }
}
