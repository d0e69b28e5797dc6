//! API Client
//!
//! Main client for the API: combines the effective configuration with a
//! transport and runs every call through the same pipeline (authenticate,
//! send, retry, classify).

use super::envelope::{self, Envelope};
use super::http::{sanitize_for_log, HttpRequest, RawResponse, ReqwestTransport, Transport};
use super::request::Request;
use super::retry::{self, RetryState};
use crate::config::{CallOptions, Config, EffectiveConfig, Session};
use crate::error::{CancelReason, Error, Result};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Account routing header, mirrors the `accountId` query parameter
pub const ACCOUNT_HEADER: &str = "x-spot-account-id";

/// Query parameter the API routes accounts by
pub const ACCOUNT_PARAM: &str = "accountId";

/// Client-generated id, constant across the retries of one call
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Main API client. Cheap to clone; clones share configuration and
/// connection pool.
#[derive(Clone)]
pub struct Client {
    config: Arc<EffectiveConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client from a session with no extra overrides
    pub fn new(session: &Session) -> Result<Self> {
        Self::with_overrides(session, &Config::new())
    }

    /// Create a client from a session plus client-level overrides
    pub fn with_overrides(session: &Session, overrides: &Config) -> Result<Self> {
        let config = session.resolve(overrides)?;
        Self::from_config(config)
    }

    /// Create a client from an already resolved configuration
    pub fn from_config(config: EffectiveConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.user_agent, config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: EffectiveConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Execute one API operation and return its decoded envelope.
    ///
    /// Transient failures are retried per the retry policy; exhaustion yields
    /// [`Error::RetriesExhausted`] wrapping the last failure. Cancellation and
    /// the per-call timeout are honoured while waiting on the network and
    /// while sleeping between attempts.
    pub async fn execute(&self, request: Request, options: &CallOptions) -> Result<Envelope> {
        let deadline = options.timeout.map(|t| Instant::now() + t);

        // An already-expired signal never reaches the network
        if options.cancel.is_cancelled() {
            return Err(Error::Cancelled(CancelReason::Cancelled));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::Cancelled(CancelReason::DeadlineExceeded));
        }

        let config = self.config.refine(options)?;
        let request_id = uuid::Uuid::new_v4().to_string();
        let http = self.prepare(request, &config, &request_id)?;

        let span = tracing::debug_span!(
            "api_call",
            method = %http.method,
            path = %http.url.path(),
            request_id = %request_id,
        );

        self.run(http, &config, &options.cancel, deadline)
            .instrument(span)
            .await
    }

    /// Attach authentication, routing headers and the absolute URL
    fn prepare(&self, mut request: Request, config: &EffectiveConfig, request_id: &str) -> Result<HttpRequest> {
        if let Some(account) = config.account_id() {
            if !request.query.contains(ACCOUNT_PARAM) {
                request.set_param(ACCOUNT_PARAM, account);
            }
            request.header(ACCOUNT_HEADER, account)?;
        }
        request.header(REQUEST_ID_HEADER, request_id)?;

        let url = request.url(&config.base_url)?;

        let mut headers = request.headers;
        let bearer = HeaderValue::from_str(&config.credentials.bearer()).map_err(|_| {
            Error::Configuration("API token contains characters not allowed in a header".to_string())
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(agent) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, agent);
        }

        if config.log_http_bodies {
            if let Some(body) = &request.body {
                tracing::trace!("request body: {}", sanitize_for_log(&String::from_utf8_lossy(body)));
            }
        }

        Ok(HttpRequest {
            method: request.method,
            url,
            headers,
            body: request.body,
        })
    }

    async fn run(
        &self,
        http: HttpRequest,
        config: &EffectiveConfig,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<Envelope> {
        let mut state = RetryState::new(&config.retry);

        loop {
            let attempt = state.begin_attempt();
            tracing::debug!(attempt, "{} {}", http.method, http.url);

            let sent = tokio::select! {
                biased;
                reason = interrupted(cancel, deadline) => return Err(Error::Cancelled(reason)),
                sent = self.transport.send(http.clone()) => sent,
            };

            let error = match sent {
                Ok(raw) => match classify(raw, config) {
                    Ok(envelope) => return Ok(envelope),
                    Err(e) => e,
                },
                Err(e) => Error::Transport(e),
            };

            if !retry::is_retryable(&http.method, &error) {
                return Err(error);
            }

            let retry_after = error.api_error().and_then(|api| api.retry_after);
            let Some(delay) = state.next_delay(retry_after) else {
                tracing::error!("Giving up after {} attempts: {}", state.attempts(), error);
                return Err(Error::RetriesExhausted {
                    attempts: state.attempts(),
                    last: Box::new(error),
                });
            };

            tracing::warn!("Attempt {} failed ({}), retrying in {:?}", attempt, error, delay);

            tokio::select! {
                biased;
                reason = interrupted(cancel, deadline) => return Err(Error::Cancelled(reason)),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Resolves when the call must stop: the token fired or the deadline passed
async fn interrupted(cancel: &CancellationToken, deadline: Option<Instant>) -> CancelReason {
    match deadline {
        Some(deadline) => tokio::select! {
            () = cancel.cancelled() => CancelReason::Cancelled,
            () = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
        },
        None => {
            cancel.cancelled().await;
            CancelReason::Cancelled
        }
    }
}

/// 2xx -> envelope (empty body is zero items); anything else -> structured error
fn classify(raw: RawResponse, config: &EffectiveConfig) -> Result<Envelope> {
    if config.log_http_bodies {
        tracing::trace!(
            "response body: {}",
            sanitize_for_log(&String::from_utf8_lossy(&raw.body))
        );
    }

    if raw.status.is_success() {
        return Envelope::parse(raw.status, &raw.body);
    }

    // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
    tracing::error!(
        "API error: {} - {}",
        raw.status,
        sanitize_for_log(&String::from_utf8_lossy(&raw.body))
    );
    Err(Error::Api(envelope::api_error(raw.status, &raw.headers, &raw.body)))
}
