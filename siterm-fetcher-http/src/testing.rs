//! In-memory collaborators for exercising fetch cycles without a network.
//!
//! [`ScriptedClient`] answers GETs from per-URL queues and records every
//! request; an unscripted URL behaves like an unreachable host.
//! [`RecordingNotifier`] stores reload requests and can be told to fail.

use crate::error::HttpError;
use crate::http::{HttpClient, HttpResponse};
use crate::notify::{ReloadNotifier, ReloadRequest};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, VecDeque<Result<HttpResponse, HttpError>>>,
    sticky: HashMap<String, Result<HttpResponse, HttpError>>,
    requests: Vec<String>,
    posts: Vec<(String, String)>,
}

/// Scripted [`HttpClient`]. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for `url`.
    pub fn push(&self, url: &str, response: Result<HttpResponse, HttpError>) {
        self.inner
            .lock()
            .responses
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answer every otherwise unqueued request for `url` with `response`.
    pub fn always(&self, url: &str, response: Result<HttpResponse, HttpError>) {
        self.inner.lock().sticky.insert(url.to_string(), response);
    }

    /// Shorthand for `always(url, Ok(HttpResponse::ok(body)))`.
    pub fn serve(&self, url: &str, body: &str) {
        self.always(url, Ok(HttpResponse::ok(body)));
    }

    /// Every GET URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.inner.lock().requests.clone()
    }

    /// Every POST as `(url, body)`, in order.
    pub fn posts(&self) -> Vec<(String, String)> {
        self.inner.lock().posts.clone()
    }

    pub fn clear_requests(&self) {
        let mut inner = self.inner.lock();
        inner.requests.clear();
        inner.posts.clear();
    }
}

impl HttpClient for ScriptedClient {
    fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let mut inner = self.inner.lock();
        inner.requests.push(url.to_string());
        if let Some(next) = inner.responses.get_mut(url).and_then(VecDeque::pop_front) {
            return next;
        }
        inner.sticky.get(url).cloned().unwrap_or_else(|| {
            Err(HttpError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
        })
    }

    fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError> {
        let mut inner = self.inner.lock();
        inner.posts.push((url.to_string(), body.to_string()));
        Ok(HttpResponse::ok(""))
    }
}

/// [`ReloadNotifier`] that records requests. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<ReloadRequest>>>,
    fail_with: Arc<Mutex<Option<HttpError>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent notifications fail with `error` (or succeed with `None`).
    pub fn fail_with(&self, error: Option<HttpError>) {
        *self.fail_with.lock() = error;
    }

    pub fn sent(&self) -> Vec<ReloadRequest> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl ReloadNotifier for RecordingNotifier {
    fn notify(&self, request: &ReloadRequest) -> Result<(), HttpError> {
        self.sent.lock().push(request.clone());
        match self.fail_with.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
