//! The request pipeline: rate limit, authenticate, send, classify, retry.
//!
//! [`RequestPipeline::execute`] is the only way the gateway talks to the
//! backend. Each attempt goes through the same sequence:
//!
//! 1. wait for a rate-limiter token
//! 2. obtain a credential from the [`AuthProvider`]
//! 3. take a connection slot and send under a deadline
//! 4. classify the response into the error taxonomy
//! 5. report the attempt to the [`AttemptObserver`]
//!
//! A 401/403 triggers one credential refresh and retry outside the retry
//! budget. Transient failures are handed to the [`RetryPolicy`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::{AuthProvider, Credential};
use crate::error::{ErrorKind, GatewayError, Result};

use super::classify::{classify_response, classify_transport};
use super::events::{AttemptEvent, AttemptObserver, NoopObserver};
use super::rate_limit::RateLimiter;
use super::retry::{RetryDecision, RetryPolicy};
use super::transport::{
    OutboundRequest, RawResponse, Transport, TransportError, TransportErrorKind,
};
use super::types::{RequestSpec, ResponseEnvelope, StatusClass};

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on concurrent in-flight backend requests.
pub const DEFAULT_MAX_CONNECTIONS: usize = 32;

/// Shared pipeline composing rate limiting, auth, transport and retry.
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    auth: Arc<AuthProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    connections: Semaphore,
    max_connections: usize,
    timeout: Duration,
    extra_headers: Vec<(String, String)>,
    observer: Arc<dyn AttemptObserver>,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("auth", &self.auth.scheme())
            .field("retry", &self.retry)
            .field("max_connections", &self.max_connections)
            .field("timeout", &self.timeout)
            .field("extra_headers", &self.extra_headers.len())
            .finish()
    }
}

impl RequestPipeline {
    /// Create a pipeline with no rate limit, the default retry policy and no observer.
    pub fn new(transport: Arc<dyn Transport>, auth: Arc<AuthProvider>) -> Self {
        Self {
            transport,
            auth,
            limiter: Arc::new(RateLimiter::unlimited()),
            retry: RetryPolicy::default(),
            connections: Semaphore::new(DEFAULT_MAX_CONNECTIONS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            timeout: DEFAULT_TIMEOUT,
            extra_headers: Vec::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bound concurrent in-flight requests. Values below 1 are raised to 1.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        let max = max.max(1);
        self.connections = Semaphore::new(max);
        self.max_connections = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Headers added to every backend request.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.extra_headers = headers;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn auth(&self) -> &AuthProvider {
        &self.auth
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Execute `spec` until it succeeds or fails terminally.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<ResponseEnvelope> {
        let started = Instant::now();
        // Attempts counted against the retry budget.
        let mut budgeted: u32 = 0;
        // Every send, including the auth refresh retry.
        let mut sends: u32 = 0;
        let mut auth_refreshed = false;

        loop {
            budgeted += 1;
            self.limiter.acquire().await;

            let credential = match self.auth.credential(spec.required_scope()).await {
                Ok(credential) => credential,
                Err(err) => {
                    let err = self.contextualize(err, spec);
                    // No backend request was sent, so any transient failure is safe to repeat.
                    match self.retry.decide(&err, budgeted, true, None) {
                        RetryDecision::RetryAfter(delay) => {
                            self.log_retry(spec, budgeted, &err, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        RetryDecision::Surface => return Err(err),
                        RetryDecision::Exhausted => {
                            return Err(self.retry.exhausted(budgeted, err))
                        }
                    }
                }
            };

            sends += 1;
            let request = self.build_request(spec, &credential);
            let sent_at = Instant::now();
            let outcome = self.send(request).await;
            let latency = sent_at.elapsed();

            let (err, retry_after) = match outcome {
                Ok(response) => match classify_response(&response) {
                    None => {
                        self.emit(spec, Some(response.status), latency, sends, None);
                        return Ok(ResponseEnvelope {
                            class: StatusClass::from_status(response.status),
                            status: Some(response.status),
                            content_type: response.content_type,
                            body: response.body,
                            latency: started.elapsed(),
                            attempts: sends,
                        });
                    }
                    Some(err) => (err, response.retry_after),
                },
                Err(transport_err) => (classify_transport(&transport_err), None),
            };

            let err = self.contextualize(err, spec);
            self.emit(spec, err.status(), latency, sends, Some(err.kind()));

            if matches!(err, GatewayError::Auth(_)) {
                if auth_refreshed {
                    return Err(err);
                }
                auth_refreshed = true;
                debug!(
                    operation = spec.operation(),
                    scheme = credential.scheme(),
                    "Credential rejected, refreshing once"
                );
                self.auth.invalidate(&credential).await;
                budgeted -= 1;
                continue;
            }

            match self
                .retry
                .decide(&err, budgeted, spec.is_idempotent(), retry_after)
            {
                RetryDecision::RetryAfter(delay) => {
                    self.log_retry(spec, budgeted, &err, delay);
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Surface => return Err(err),
                RetryDecision::Exhausted => return Err(self.retry.exhausted(budgeted, err)),
            }
        }
    }

    fn build_request(&self, spec: &RequestSpec, credential: &Credential) -> OutboundRequest {
        let mut headers = Vec::with_capacity(self.extra_headers.len() + 3);
        headers.push(credential.header());
        headers.push(("Accept".to_string(), "application/json".to_string()));
        headers.extend(self.extra_headers.iter().cloned());
        if let Some(key) = spec.idempotency_key() {
            headers.push(("Idempotency-Key".to_string(), key.to_string()));
        }

        OutboundRequest {
            method: spec.method(),
            url: spec.path().to_string(),
            query: spec.query_params().to_vec(),
            headers,
            body: spec.body().cloned(),
        }
    }

    async fn send(&self, request: OutboundRequest) -> std::result::Result<RawResponse, TransportError> {
        let _permit = self.connections.acquire().await.map_err(|_| {
            TransportError::new(TransportErrorKind::Other, "connection pool closed")
        })?;
        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::timeout(self.timeout)),
        }
    }

    fn contextualize(&self, err: GatewayError, spec: &RequestSpec) -> GatewayError {
        let err = err.with_operation(spec.operation());
        match spec.entity_id() {
            Some(id) => err.with_entity(id),
            None => err,
        }
    }

    fn emit(
        &self,
        spec: &RequestSpec,
        status: Option<u16>,
        latency: Duration,
        attempt: u32,
        error_kind: Option<ErrorKind>,
    ) {
        self.observer.on_attempt(&AttemptEvent {
            operation: spec.operation().to_string(),
            method: spec.method(),
            path: spec.path().to_string(),
            status,
            latency,
            attempt,
            error_kind,
        });
    }

    fn log_retry(&self, spec: &RequestSpec, attempt: u32, err: &GatewayError, delay: Duration) {
        warn!(
            operation = spec.operation(),
            attempt = attempt,
            max_attempts = self.retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying backend request after transient error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::events::RecordingObserver;
    use crate::client::types::Method;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    type Scripted = std::result::Result<RawResponse, TransportError>;

    /// Returns scripted outcomes in order; repeats the last one when the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        last: Mutex<Option<Scripted>>,
        calls: AtomicU32,
        seen: Mutex<Vec<OutboundRequest>>,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: OutboundRequest) -> Scripted {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(outcome) => {
                    *self.last.lock().unwrap() = Some(outcome.clone());
                    outcome
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Ok(RawResponse::new(200, ""))),
            }
        }
    }

    fn ok(body: serde_json::Value) -> Scripted {
        Ok(RawResponse::json(200, &body))
    }

    fn status(code: u16) -> Scripted {
        Ok(RawResponse::json(code, &json!({"error": format!("HTTP {}", code)})))
    }

    fn dropped() -> Scripted {
        Err(TransportError::new(TransportErrorKind::Other, "connection reset"))
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    fn api_key() -> Arc<AuthProvider> {
        Arc::new(AuthProvider::ApiKey {
            header: "X-API-Key".into(),
            key: "k".into(),
        })
    }

    fn pipeline(transport: Arc<ScriptedTransport>) -> RequestPipeline {
        RequestPipeline::new(transport, api_key()).with_retry(fast_retry())
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(json!({"id": "DOC-1"}))]));
        let observer = Arc::new(RecordingObserver::new());
        let p = pipeline(transport.clone()).with_observer(observer.clone());

        let env = p
            .execute(&RequestSpec::get("get_document", "/documents/DOC-1"))
            .await
            .unwrap();
        assert_eq!(env.class, StatusClass::Success);
        assert_eq!(env.attempts, 1);
        assert_eq!(env.json().unwrap()["id"], "DOC-1");

        let events = observer.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, Some(200));
        assert_eq!(events[0].method, Method::Get);
        assert!(events[0].is_success());
    }

    #[tokio::test]
    async fn test_headers_attached() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(json!({}))]));
        let p = pipeline(transport.clone())
            .with_headers(vec![("X-Tenant".into(), "acme".into())]);
        p.execute(&RequestSpec::post("create_document", "/documents").create())
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].header("x-api-key"), Some("k"));
        assert_eq!(seen[0].header("X-Tenant"), Some("acme"));
        assert!(seen[0].header("Idempotency-Key").is_some());
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            status(503),
            dropped(),
            ok(json!({"id": "DOC-1"})),
        ]));
        let observer = Arc::new(RecordingObserver::new());
        let p = pipeline(transport.clone()).with_observer(observer.clone());

        let env = p
            .execute(&RequestSpec::get("get_document", "/documents/DOC-1"))
            .await
            .unwrap();
        assert_eq!(env.attempts, 3);
        assert_eq!(transport.calls(), 3);

        let events = observer.events();
        assert_eq!(
            events.iter().map(|e| e.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(events[0].error_kind, Some(ErrorKind::TransientBackendError));
        assert_eq!(events[1].status, None);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let transport = Arc::new(ScriptedTransport::new(vec![status(503)]));
        let p = pipeline(transport.clone());
        let err = p
            .execute(&RequestSpec::get("get_document", "/documents/DOC-1").entity("DOC-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(err.status(), Some(503));
        let f = err.failure().unwrap();
        assert_eq!(f.operation.as_deref(), Some("get_document"));
        assert_eq!(f.entity_id.as_deref(), Some("DOC-1"));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_not_found_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![status(404)]));
        let p = pipeline(transport.clone());
        let err = p
            .execute(&RequestSpec::get("get_document", "/documents/nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_not_retried_after_server_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![status(500), ok(json!({}))]));
        let p = pipeline(transport.clone());
        let err = p
            .execute(&RequestSpec::post("create_document", "/documents").create())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transient(_)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_retried_when_no_response_with_same_key() {
        let transport = Arc::new(ScriptedTransport::new(vec![dropped(), ok(json!({"id": "D"}))]));
        let p = pipeline(transport.clone());
        p.execute(&RequestSpec::post("create_document", "/documents").create())
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);

        let seen = transport.seen.lock().unwrap();
        assert_eq!(
            seen[0].header("Idempotency-Key"),
            seen[1].header("Idempotency-Key")
        );
    }

    #[tokio::test]
    async fn test_auth_failure_refreshes_once_outside_budget() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            status(401),
            status(503),
            status(503),
            ok(json!({})),
        ]));
        let p = pipeline(transport.clone());
        let env = p
            .execute(&RequestSpec::get("get_document", "/documents/DOC-1"))
            .await
            .unwrap();
        // One auth retry plus the full three-attempt budget.
        assert_eq!(transport.calls(), 4);
        assert_eq!(env.attempts, 4);
    }

    #[tokio::test]
    async fn test_second_auth_failure_is_terminal() {
        let transport = Arc::new(ScriptedTransport::new(vec![status(401), status(403)]));
        let p = pipeline(transport.clone());
        let err = p
            .execute(&RequestSpec::get("get_document", "/documents/DOC-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
        assert_eq!(err.status(), Some(403));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_is_transient_and_retried() {
        let transport = Arc::new(ScriptedTransport {
            delay: Duration::from_millis(200),
            ..ScriptedTransport::new(vec![ok(json!({}))])
        });
        let p = pipeline(transport.clone()).with_timeout(Duration::from_millis(20));
        let err = p
            .execute(&RequestSpec::get("get_document", "/documents/DOC-1"))
            .await
            .unwrap_err();
        match err {
            GatewayError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, GatewayError::Transient(_)));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_unreachable() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TransportError::new(
            TransportErrorKind::Connect,
            "refused",
        ))]));
        let p = pipeline(transport.clone()).with_retry(RetryPolicy::none());
        let err = p
            .execute(&RequestSpec::get("get_document", "/documents/DOC-1"))
            .await
            .unwrap_err();
        match err {
            GatewayError::RetriesExhausted { last, .. } => {
                assert!(matches!(*last, GatewayError::Unreachable(_)))
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_max_connections_bounds_in_flight() {
        struct Gauge {
            in_flight: AtomicU32,
            peak: AtomicU32,
        }

        #[async_trait]
        impl Transport for Gauge {
            async fn send(&self, _request: OutboundRequest) -> Scripted {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(RawResponse::new(200, "{}"))
            }
        }

        let gauge = Arc::new(Gauge {
            in_flight: AtomicU32::new(0),
            peak: AtomicU32::new(0),
        });
        let p = Arc::new(RequestPipeline::new(gauge.clone(), api_key()).with_max_connections(2));
        let mut handles = Vec::new();
        for i in 0..8 {
            let p = Arc::clone(&p);
            handles.push(tokio::spawn(async move {
                p.execute(&RequestSpec::get("get_document", format!("/documents/{}", i)))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    }
}
