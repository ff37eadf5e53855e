//! Asynchronous request dispatcher.
//!
//! Every call goes through the same steps:
//! 1. Validate the base URL and build the absolute URL
//! 2. Register a `pending` ledger entry
//! 3. Spawn the network call on the current Tokio runtime
//! 4. Parse the response into an envelope and settle the ledger entry

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use reqwest::header::ACCEPT;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::envelope::ResponseEnvelope;
use crate::config::Config;
use crate::error::DispatchError;
use crate::ledger::{LedgerStatus, RequestLedger};
use crate::messages::{Category, DefaultMessages, MessageProvider};
use crate::metrics::{self, LatencyTimer};
use crate::routes::ResolvedRequest;

/// Sends resolved requests and records each one in the ledger.
#[derive(Clone)]
pub struct Dispatcher {
    /// Shared HTTP client (connection pool, timeouts, user agent).
    http: reqwest::Client,
    /// Ledger receiving one entry per call.
    ledger: Arc<RequestLedger>,
    /// Operator message source.
    messages: Arc<dyn MessageProvider>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("ledger_entries", &self.ledger.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher with an HTTP client built from config.
    pub fn new(
        config: &Config,
        ledger: Arc<RequestLedger>,
        messages: Arc<dyn MessageProvider>,
    ) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.as_str())
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| DispatchError::ClientBuild(e.to_string()))?;

        Ok(Self::with_client(http, ledger, messages))
    }

    /// Create a dispatcher around an existing HTTP client.
    pub fn with_client(
        http: reqwest::Client,
        ledger: Arc<RequestLedger>,
        messages: Arc<dyn MessageProvider>,
    ) -> Self {
        Self {
            http,
            ledger,
            messages,
        }
    }

    /// Dispatcher with default settings and English messages.
    pub fn with_defaults(ledger: Arc<RequestLedger>) -> Result<Self, DispatchError> {
        Self::new(&Config::default(), ledger, Arc::new(DefaultMessages))
    }

    /// Ledger this dispatcher writes to.
    pub fn ledger(&self) -> &Arc<RequestLedger> {
        &self.ledger
    }

    /// Start a call and return a handle to await its envelope.
    ///
    /// Fails before any ledger entry is created when the base URL is missing
    /// or the URL is invalid, or when called outside a Tokio runtime.
    pub fn send(
        &self,
        request: ResolvedRequest,
        base_url: Option<&str>,
    ) -> Result<DispatchHandle, DispatchError> {
        let Some(base) = base_url.map(str::trim).filter(|b| !b.is_empty()) else {
            error!(
                critical = true,
                "{}",
                self.messages
                    .message(Category::Client, "base_url", &[("route", request.route())])
            );
            return Err(DispatchError::MissingBaseUrl {
                route: request.route().to_string(),
            });
        };

        let url = join_url(base, request.path())?;
        let runtime = Handle::try_current().map_err(|e| DispatchError::NoRuntime(e.to_string()))?;

        let entry = self.ledger.create(request.path(), base);
        info!(
            id = entry.id,
            "{}",
            self.messages.message(
                Category::Client,
                "call",
                &[("method", request.method().as_str()), ("route", request.route())],
            )
        );

        let id = entry.id;
        let dispatcher = self.clone();
        let task = runtime.spawn(async move { dispatcher.execute(id, request, url).await });

        Ok(DispatchHandle {
            id,
            task,
            ledger: Arc::clone(&self.ledger),
        })
    }

    /// Send a call and wait for its envelope.
    pub async fn dispatch(
        &self,
        request: ResolvedRequest,
        base_url: Option<&str>,
    ) -> Result<ResponseEnvelope, DispatchError> {
        self.send(request, base_url)?.await
    }

    #[instrument(skip(self, request, url), fields(method = %request.method(), url = %url))]
    async fn execute(
        &self,
        id: u64,
        request: ResolvedRequest,
        url: Url,
    ) -> Result<ResponseEnvelope, DispatchError> {
        let method = request.method();
        metrics::inc_dispatches(method.as_str());
        let _timer = LatencyTimer::new(method.as_str());

        let mut builder = self
            .http
            .request(method.as_reqwest(), url.clone())
            .header(ACCEPT, "application/json");

        if method.sends_body() {
            let body = request.body().cloned().unwrap_or_default();
            builder = builder.json(&body);
        }

        let result = exchange(builder).await;

        match &result {
            Ok(envelope) if envelope.is_success() => {
                self.ledger.set_status(id, LedgerStatus::Success);
                metrics::inc_dispatch_successes();
                debug!(id, status = envelope.status_code(), "Dispatch succeeded");
            }
            Ok(envelope) => {
                self.ledger.set_status(id, LedgerStatus::Error);
                metrics::inc_dispatch_failures();
                let status = envelope.status_code().to_string();
                warn!(
                    id,
                    "{}",
                    self.messages.message(
                        Category::Client,
                        "status",
                        &[
                            ("method", method.as_str()),
                            ("url", url.as_str()),
                            ("status", status.as_str())
                        ],
                    )
                );
            }
            Err(e) => {
                self.ledger.set_status(id, LedgerStatus::Error);
                metrics::inc_dispatch_failures();
                let reason = e.to_string();
                error!(
                    id,
                    critical = true,
                    "{}",
                    self.messages.message(
                        Category::Client,
                        "error",
                        &[("method", method.as_str()), ("error", reason.as_str())],
                    )
                );
            }
        }

        result
    }
}

/// Send the request and turn the response into an envelope.
async fn exchange(builder: reqwest::RequestBuilder) -> Result<ResponseEnvelope, DispatchError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await?;

    let mut envelope = ResponseEnvelope::with_status(status.as_u16());
    if body.trim().is_empty() {
        return Ok(envelope);
    }

    if status.is_success() {
        envelope
            .parse(&body)
            .map_err(|e| DispatchError::MalformedBody {
                status: status.as_u16(),
                reason: e.to_string(),
            })?;
    } else if envelope.parse(&body).is_err() {
        debug!(status = status.as_u16(), "Error response carried no JSON object");
    }

    Ok(envelope)
}

/// Join a base URL and a resolved path into an absolute URL.
pub fn join_url(base: &str, path: &str) -> Result<Url, DispatchError> {
    let base = base.trim_end_matches('/');
    let joined = if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    };

    Url::parse(&joined).map_err(|e| DispatchError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })
}

/// In-flight call: ledger id plus the awaitable outcome.
#[derive(Debug)]
pub struct DispatchHandle {
    id: u64,
    task: JoinHandle<Result<ResponseEnvelope, DispatchError>>,
    ledger: Arc<RequestLedger>,
}

impl DispatchHandle {
    /// Ledger id of this call.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel the call. Awaiting the handle afterwards yields `Aborted`.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Future for DispatchHandle {
    type Output = Result<ResponseEnvelope, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.task.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => {
                self.ledger.set_status(self.id, LedgerStatus::Error);
                Poll::Ready(Err(DispatchError::Aborted(e.to_string())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
