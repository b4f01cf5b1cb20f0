//! Network request interception.
//!
//! Rules registered on a session selectively control its outbound traffic:
//! observe, abort, fabricate, delay, or fetch-then-rewrite responses
//! without a real backend. Rules are evaluated in registration order and
//! the first match wins; unmatched requests proceed to the real network.
//!
//! Each rule carries a private call counter scoped to the owning session,
//! so handlers can be stateful ("fail the first call, succeed on retry")
//! without module-level state.

use crate::result::{EnsayarError, EnsayarResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Reasons for aborting a network request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbortReason {
    /// Request failed
    Failed,
    /// Request was aborted
    Aborted,
    /// Request timed out
    TimedOut,
    /// Access was denied
    AccessDenied,
    /// Connection was refused
    ConnectionRefused,
    /// Internet is disconnected
    InternetDisconnected,
    /// DNS name could not be resolved
    NameNotResolved,
    /// Request was blocked by client
    BlockedByClient,
}

impl AbortReason {
    /// Get the error message for this abort reason
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Failed => "net::ERR_FAILED",
            Self::Aborted => "net::ERR_ABORTED",
            Self::TimedOut => "net::ERR_TIMED_OUT",
            Self::AccessDenied => "net::ERR_ACCESS_DENIED",
            Self::ConnectionRefused => "net::ERR_CONNECTION_REFUSED",
            Self::InternetDisconnected => "net::ERR_INTERNET_DISCONNECTED",
            Self::NameNotResolved => "net::ERR_NAME_NOT_RESOLVED",
            Self::BlockedByClient => "net::ERR_BLOCKED_BY_CLIENT",
        }
    }
}

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// PATCH request
    Patch,
    /// HEAD request
    Head,
    /// OPTIONS request
    Options,
    /// Any method
    Any,
}

impl HttpMethod {
    /// Parse from a method string; unknown strings match any method
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            _ => Self::Any,
        }
    }

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "*",
        }
    }

    /// Check if this method filter matches another method
    #[must_use]
    pub fn matches(&self, other: Self) -> bool {
        *self == Self::Any || other == Self::Any || *self == other
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match (validated at registration)
    Regex(String),
    /// Glob pattern (e.g., "**/api/products*")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Any => true,
        }
    }

    /// Validate the pattern; malformed patterns are rejected here so a
    /// bad rule never fails silently at match time.
    pub fn validate(&self) -> EnsayarResult<()> {
        match self {
            Self::Regex(pattern) => regex::Regex::new(pattern).map(|_| ()).map_err(|e| {
                EnsayarError::InterceptionConfig {
                    message: format!("invalid regex pattern '{pattern}': {e}"),
                }
            }),
            Self::Exact(p) | Self::Prefix(p) | Self::Contains(p) | Self::Glob(p) => {
                if p.is_empty() {
                    Err(EnsayarError::InterceptionConfig {
                        message: "empty URL pattern".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
            Self::Any => Ok(()),
        }
    }

    /// Simple glob matching for URLs
    fn glob_matches(pattern: &str, url: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.is_empty() {
            return url.is_empty();
        }

        let mut pos = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if let Some(found) = url[pos..].find(part) {
                if i == 0 && found != 0 {
                    return false;
                }
                pos += found + part.len();
            } else {
                return false;
            }
        }

        pattern.ends_with('*') || pos == url.len()
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) | Self::Prefix(s) | Self::Contains(s) | Self::Regex(s)
            | Self::Glob(s) => write!(f, "{s}"),
            Self::Any => write!(f, "*"),
        }
    }
}

/// A mocked or fetched HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
    /// Artificial delay before delivery, in milliseconds
    pub delay_ms: u64,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            content_type: "application/json".to_string(),
            delay_ms: 0,
        }
    }
}

impl MockResponse {
    /// Create an empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON response
    pub fn json<T: Serialize>(data: &T) -> EnsayarResult<Self> {
        let body = serde_json::to_vec(data)?;
        Ok(Self {
            body,
            ..Self::default()
        })
    }

    /// Create a text response
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self {
            body: content.as_bytes().to_vec(),
            content_type: "text/plain".to_string(),
            ..Self::default()
        }
    }

    /// Create an error response with a JSON error body
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self {
            status,
            body: body.into_bytes(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set body
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        let _ = self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Set content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Deliver after an artificial delay
    #[must_use]
    pub const fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Whether the status is a success (2xx)
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse body as JSON
    pub fn body_json<T: for<'de> Deserialize<'de>>(&self) -> EnsayarResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Read-only view of a pending outbound request, handed to rule handlers
#[derive(Debug, Clone)]
pub struct RequestView {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request body, when present
    pub body: Option<Vec<u8>>,
}

impl RequestView {
    /// Create a request view
    #[must_use]
    pub fn new(url: &str, method: HttpMethod, body: Option<Vec<u8>>) -> Self {
        Self {
            url: url.to_string(),
            method,
            body,
        }
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Parse the outbound body as JSON, for body-keyed dynamic responses
    pub fn body_json<T: for<'de> Deserialize<'de>>(&self) -> EnsayarResult<T> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| EnsayarError::AssertionFailed {
                message: "no request body".to_string(),
            })?;
        Ok(serde_json::from_slice(body)?)
    }
}

/// Per-rule state handed to handlers alongside the request view
#[derive(Debug, Clone, Copy)]
pub struct RuleState {
    call: u64,
}

impl RuleState {
    /// 1-based number of this call on the owning rule. Monotonic for the
    /// rule's lifetime, never wraps or resets.
    #[must_use]
    pub const fn call(&self) -> u64 {
        self.call
    }
}

/// Response rewrite applied after a pass-through fetch completes
pub type Transform = Arc<dyn Fn(MockResponse) -> EnsayarResult<MockResponse> + Send + Sync>;

/// What a handler decides to do with a matched request
pub enum Outcome {
    /// Let the request reach the real network unmodified
    Continue,
    /// Let the real request complete, then rewrite the response.
    /// Untouched status/headers/content-type are preserved.
    Transform(Transform),
    /// Abort the request
    Abort(AbortReason),
    /// Fabricate a response; the real network is never reached
    Fulfill(MockResponse),
    /// Wait the given milliseconds, then continue to the real network
    Delay(u64),
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => write!(f, "Continue"),
            Self::Transform(_) => write!(f, "Transform(..)"),
            Self::Abort(reason) => write!(f, "Abort({reason:?})"),
            Self::Fulfill(resp) => write!(f, "Fulfill(status={})", resp.status),
            Self::Delay(ms) => write!(f, "Delay({ms}ms)"),
        }
    }
}

type HandlerFn = Arc<dyn Fn(&RequestView, &RuleState) -> EnsayarResult<Outcome> + Send + Sync>;

/// An interception rule: pattern, optional method filter, and handler
pub struct Rule {
    pattern: UrlPattern,
    method: HttpMethod,
    handler: HandlerFn,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// Create a rule with a custom handler
    pub fn new<H>(pattern: UrlPattern, handler: H) -> Self
    where
        H: Fn(&RequestView, &RuleState) -> EnsayarResult<Outcome> + Send + Sync + 'static,
    {
        Self {
            pattern,
            method: HttpMethod::Any,
            handler: Arc::new(handler),
        }
    }

    /// Observe matching requests without altering them
    #[must_use]
    pub fn observe(pattern: UrlPattern) -> Self {
        Self::new(pattern, |_req, _state| Ok(Outcome::Continue))
    }

    /// Abort matching requests
    #[must_use]
    pub fn abort(pattern: UrlPattern, reason: AbortReason) -> Self {
        Self::new(pattern, move |_req, _state| Ok(Outcome::Abort(reason)))
    }

    /// Fabricate the same response for every matching request
    #[must_use]
    pub fn fulfill(pattern: UrlPattern, response: MockResponse) -> Self {
        Self::new(pattern, move |_req, _state| {
            Ok(Outcome::Fulfill(response.clone()))
        })
    }

    /// Delay matching requests, then continue to the real network
    #[must_use]
    pub fn delay(pattern: UrlPattern, ms: u64) -> Self {
        Self::new(pattern, move |_req, _state| Ok(Outcome::Delay(ms)))
    }

    /// Fetch the real response, then rewrite it
    pub fn transform<F>(pattern: UrlPattern, f: F) -> Self
    where
        F: Fn(MockResponse) -> EnsayarResult<MockResponse> + Send + Sync + 'static,
    {
        let f: Transform = Arc::new(f);
        Self::new(pattern, move |_req, _state| {
            Ok(Outcome::Transform(f.clone()))
        })
    }

    /// Fetch the real response, rewrite its JSON payload in place.
    /// Status, headers and content type are preserved.
    pub fn rewrite_json<F>(pattern: UrlPattern, f: F) -> Self
    where
        F: Fn(&mut serde_json::Value) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::transform(pattern, move |mut resp: MockResponse| {
            let mut value: serde_json::Value = serde_json::from_slice(&resp.body)?;
            f(&mut value);
            resp.body = serde_json::to_vec(&value)?;
            Ok(resp)
        })
    }

    /// Restrict the rule to one HTTP method
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// The rule's URL pattern
    #[must_use]
    pub const fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }
}

/// A request the engine saw, for observation assertions
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request body, when present
    pub body: Option<Vec<u8>>,
    /// Milliseconds since the engine was created
    pub timestamp_ms: u64,
}

struct RegisteredRule {
    rule: Rule,
    calls: u64,
}

struct EngineInner {
    rules: Vec<RegisteredRule>,
    captured: Vec<CapturedRequest>,
    start: std::time::Instant,
}

/// Session-scoped interception engine.
///
/// Owned by a [`crate::session::Session`] and installed into its driver;
/// all rule state is discarded with the session, so nothing leaks between
/// tests.
pub struct InterceptionEngine {
    inner: Mutex<EngineInner>,
}

impl std::fmt::Debug for InterceptionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionEngine")
            .field("rules", &self.rule_count())
            .finish_non_exhaustive()
    }
}

impl Default for InterceptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptionEngine {
    /// Create an engine with no rules
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(EngineInner {
                rules: Vec::new(),
                captured: Vec::new(),
                start: std::time::Instant::now(),
            }),
        }
    }

    /// Register a rule. Registration order is match order: the first
    /// registered rule whose pattern matches a request is applied
    /// exclusively.
    pub fn register(&self, rule: Rule) -> EnsayarResult<()> {
        rule.pattern.validate()?;
        let mut inner = self.inner.lock().unwrap();
        inner.rules.push(RegisteredRule { rule, calls: 0 });
        Ok(())
    }

    /// Number of registered rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.inner.lock().unwrap().rules.len()
    }

    /// Discard all rules and their private counters
    pub fn clear_rules(&self) {
        self.inner.lock().unwrap().rules.clear();
    }

    /// Discard captured requests
    pub fn clear_captured(&self) {
        self.inner.lock().unwrap().captured.clear();
    }

    /// All requests the engine has seen, matched or not
    #[must_use]
    pub fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.inner.lock().unwrap().captured.clone()
    }

    /// Captured requests whose URL matches a pattern
    #[must_use]
    pub fn requests_matching(&self, pattern: &UrlPattern) -> Vec<CapturedRequest> {
        self.captured_requests()
            .into_iter()
            .filter(|r| pattern.matches(&r.url))
            .collect()
    }

    /// Assert at least one request matched the pattern
    pub fn assert_requested(&self, pattern: &UrlPattern) -> EnsayarResult<()> {
        if self.requests_matching(pattern).is_empty() {
            return Err(EnsayarError::AssertionFailed {
                message: format!("expected request matching '{pattern}', but none was seen"),
            });
        }
        Ok(())
    }

    /// Assert exactly N requests matched the pattern
    pub fn assert_requested_times(&self, pattern: &UrlPattern, times: usize) -> EnsayarResult<()> {
        let seen = self.requests_matching(pattern).len();
        if seen != times {
            return Err(EnsayarError::AssertionFailed {
                message: format!("expected {times} requests matching '{pattern}', saw {seen}"),
            });
        }
        Ok(())
    }

    /// Assert no request matched the pattern
    pub fn assert_not_requested(&self, pattern: &UrlPattern) -> EnsayarResult<()> {
        let seen = self.requests_matching(pattern).len();
        if seen != 0 {
            return Err(EnsayarError::AssertionFailed {
                message: format!("expected no requests matching '{pattern}', saw {seen}"),
            });
        }
        Ok(())
    }

    /// Resolve an outbound request against the registered rules.
    ///
    /// `passthrough` performs the real fetch; it is invoked at most once,
    /// and only when the winning outcome is continue, delay-then-continue,
    /// or a two-phase transform. Handler errors propagate as the failure
    /// of this request.
    pub async fn resolve<F, Fut>(
        &self,
        request: RequestView,
        passthrough: F,
    ) -> EnsayarResult<MockResponse>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = EnsayarResult<MockResponse>> + Send,
    {
        let matched = {
            let mut inner = self.inner.lock().unwrap();
            let timestamp_ms = inner.start.elapsed().as_millis() as u64;
            inner.captured.push(CapturedRequest {
                url: request.url.clone(),
                method: request.method,
                body: request.body.clone(),
                timestamp_ms,
            });

            let mut found = None;
            for registered in &mut inner.rules {
                if registered.rule.pattern.matches(&request.url)
                    && registered.rule.method.matches(request.method)
                {
                    registered.calls += 1;
                    found = Some((
                        registered.rule.handler.clone(),
                        RuleState {
                            call: registered.calls,
                        },
                    ));
                    break;
                }
            }
            found
        };

        let outcome = match matched {
            Some((handler, state)) => handler(&request, &state)?,
            None => Outcome::Continue,
        };

        tracing::debug!(url = %request.url, method = request.method.as_str(), outcome = ?outcome, "resolving request");

        match outcome {
            Outcome::Continue => passthrough().await,
            Outcome::Transform(f) => {
                let real = passthrough().await?;
                f(real)
            }
            Outcome::Abort(reason) => Err(EnsayarError::RequestAborted {
                url: request.url,
                reason: reason.message().to_string(),
            }),
            Outcome::Fulfill(response) => {
                if response.delay_ms > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(response.delay_ms)).await;
                }
                Ok(response)
            }
            Outcome::Delay(ms) => {
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                passthrough().await
            }
        }
    }
}
