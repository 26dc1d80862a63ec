//! Bounded-retry artifact download.
//!
//! [`RetryPolicy`] describes how many attempts a fetch gets, how long to wait
//! between them and which failures are worth another attempt.
//! [`RetryingFetcher`] applies a policy to GET requests and never fails: every
//! call ends in [`FetchOutcome::Success`] or [`FetchOutcome::Exhausted`].

use crate::error::HttpError;
use crate::http::HttpClient;
use siterm_fetcher_config::RetrySettings;
use std::time::Duration;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Delay doubles after each retry, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the `failed_attempts`-th failure (1-based).
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, max } => {
                let shift = failed_attempts.saturating_sub(1).min(31);
                initial.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

/// Declarative retry policy shared by every fetch call site.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Decides whether a failed attempt may be retried.
    pub retryable: fn(&HttpError) -> bool,
}

impl Default for RetryPolicy {
    /// Three attempts, five seconds apart, retrying every transient failure.
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            backoff: Backoff::Fixed(settings.delay()),
            retryable: HttpError::is_transient,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retryable(mut self, retryable: fn(&HttpError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Terminal result of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200 OK with the decoded body.
    Success(String),
    /// No usable response within the budget. Callers keep their last-known-good copy.
    Exhausted {
        attempts: u32,
        last_error: HttpError,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn into_body(self) -> Option<String> {
        match self {
            FetchOutcome::Success(body) => Some(body),
            FetchOutcome::Exhausted { .. } => None,
        }
    }
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Applies a [`RetryPolicy`] to GET requests made through an [`HttpClient`].
pub struct RetryingFetcher<C> {
    client: C,
    policy: RetryPolicy,
    sleeper: Sleeper,
}

impl<C> std::fmt::Debug for RetryingFetcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<C: HttpClient> RetryingFetcher<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Replace the blocking sleep used between attempts.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` until it returns 200 or the attempt budget runs out.
    pub fn fetch(&self, url: &str) -> FetchOutcome {
        let mut remaining = self.policy.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            remaining -= 1;

            let error = match self.client.get(url) {
                Ok(response) if response.is_ok() => return FetchOutcome::Success(response.body),
                Ok(response) => HttpError::Status {
                    url: url.to_string(),
                    status: response.status,
                },
                Err(e) => e,
            };

            if !(self.policy.retryable)(&error) {
                log::warn!("Not retrying {}: {}", url, error);
                return FetchOutcome::Exhausted {
                    attempts,
                    last_error: error,
                };
            }

            if remaining == 0 {
                log::warn!(
                    "Giving up on {} after {} attempt(s): {}",
                    url,
                    attempts,
                    error
                );
                return FetchOutcome::Exhausted {
                    attempts,
                    last_error: error,
                };
            }

            let delay = self.policy.backoff.delay_after(attempts);
            log::debug!(
                "Attempt {} for {} failed ({}); retrying in {:?}, {} left",
                attempts,
                url,
                error,
                delay,
                remaining
            );
            (self.sleeper)(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::testing::ScriptedClient;
    use parking_lot::Mutex;
    use std::sync::Arc;

    const URL: &str = "https://raw.example.org/repo/master/mapping.yaml";

    fn recording_fetcher(client: ScriptedClient) -> (RetryingFetcher<ScriptedClient>, Arc<Mutex<Vec<Duration>>>) {
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sleeps);
        let fetcher = RetryingFetcher::new(client, RetryPolicy::default())
            .with_sleeper(move |d| sink.lock().push(d));
        (fetcher, sleeps)
    }

    #[test]
    fn test_success_first_attempt() {
        let client = ScriptedClient::new();
        client.push(URL, Ok(HttpResponse::ok("a: 1\n")));
        let (fetcher, sleeps) = recording_fetcher(client);

        assert_eq!(fetcher.fetch(URL), FetchOutcome::Success("a: 1\n".to_string()));
        assert!(sleeps.lock().is_empty());
        assert_eq!(fetcher.client().requests(), vec![URL.to_string()]);
    }

    #[test]
    fn test_transport_failure_exhausts_after_three_attempts() {
        let client = ScriptedClient::new();
        let (fetcher, sleeps) = recording_fetcher(client);

        let outcome = fetcher.fetch(URL);
        match outcome {
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(last_error, HttpError::Transport { .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(fetcher.client().requests().len(), 3);
        assert_eq!(
            *sleeps.lock(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[test]
    fn test_non_200_is_retried_then_succeeds() {
        let client = ScriptedClient::new();
        client.push(
            URL,
            Ok(HttpResponse {
                status: 502,
                body: String::new(),
            }),
        );
        client.push(URL, Ok(HttpResponse::ok("ok: true\n")));
        let (fetcher, sleeps) = recording_fetcher(client);

        assert_eq!(
            fetcher.fetch(URL),
            FetchOutcome::Success("ok: true\n".to_string())
        );
        assert_eq!(sleeps.lock().len(), 1);
        assert_eq!(fetcher.client().requests().len(), 2);
    }

    #[test]
    fn test_non_retryable_error_stops_immediately() {
        let client = ScriptedClient::new();
        client.push(
            URL,
            Err(HttpError::UrlPolicy {
                url: URL.to_string(),
                reason: "nope".to_string(),
            }),
        );
        let (fetcher, sleeps) = recording_fetcher(client);

        let outcome = fetcher.fetch(URL);
        assert!(matches!(outcome, FetchOutcome::Exhausted { attempts: 1, .. }));
        assert!(sleeps.lock().is_empty());
    }

    #[test]
    fn test_custom_predicate_and_single_attempt() {
        let client = ScriptedClient::new();
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        }
        .with_retryable(|_| true);
        let fetcher = RetryingFetcher::new(client, policy).with_sleeper(|_| {});

        assert!(!fetcher.fetch(URL).is_success());
        assert_eq!(fetcher.client().requests().len(), 1);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
        };
        assert_eq!(backoff.delay_after(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_after(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_after(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_after(4), Duration::from_secs(5));
        assert_eq!(backoff.delay_after(60), Duration::from_secs(5));
    }

    #[test]
    fn test_policy_from_settings_clamps_zero_attempts() {
        let policy = RetryPolicy::from_settings(&RetrySettings {
            max_attempts: 0,
            delay_secs: 2,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_secs(2)));
    }
}
