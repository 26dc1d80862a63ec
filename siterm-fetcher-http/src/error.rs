//! Errors produced by the HTTP collaborator.

/// A single failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// URL could not be parsed or uses a scheme that is not allowed.
    #[error("URL '{url}' rejected: {reason}")]
    UrlPolicy { url: String, reason: String },

    /// Connection, DNS, TLS or timeout failure. No status was received.
    #[error("Transport failure for '{url}': {message}")]
    Transport { url: String, message: String },

    /// The server answered with something other than 200 OK.
    #[error("HTTP status {status} for '{url}'")]
    Status { url: String, status: u16 },

    /// The response body could not be read (truncated, too large, not UTF-8).
    #[error("Failed to read response body from '{url}': {message}")]
    Body { url: String, message: String },
}

impl HttpError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// URL policy violations are local and permanent; everything else is
    /// treated as transient.
    pub fn is_transient(&self) -> bool {
        !matches!(self, HttpError::UrlPolicy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let url = "https://example.org/x".to_string();
        assert!(
            HttpError::Transport {
                url: url.clone(),
                message: "timed out".into()
            }
            .is_transient()
        );
        assert!(
            HttpError::Status {
                url: url.clone(),
                status: 503
            }
            .is_transient()
        );
        assert!(
            HttpError::Status {
                url: url.clone(),
                status: 404
            }
            .is_transient()
        );
        assert!(
            !HttpError::UrlPolicy {
                url,
                reason: "scheme".into()
            }
            .is_transient()
        );
    }
}
