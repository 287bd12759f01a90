//! Single-flight REST dispatcher
//!
//! All control-plane traffic funnels through one worker task. Requests
//! are executed strictly in submission order; the worker gates each
//! execution on the global throttle and the route's bucket, requeues
//! (never discards) requests whose bucket is exhausted, and retries
//! 429 responses inline until they succeed or fail for a
//! non-throttling reason.
//!
//! One worker process-wide is a deliberate correctness-over-throughput
//! choice: it keeps global and bucket throttling centrally enforceable
//! at the cost of head-of-line blocking across unrelated routes.

use crate::error::{RestError, RestResult};
use crate::ratelimit::{GlobalThrottle, RateLimitTable, RateLimitUpdate};
use crate::request::{Method, Request, ResponseBody};
use crate::routes::Route;
use parley_common::ClientConfig;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// Gateway discovery response
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayInfo {
    /// WebSocket URL to connect to
    pub url: String,
}

struct InFlight {
    request: Request,
    resolve: oneshot::Sender<RestResult<ResponseBody>>,
}

/// Handle to the dispatcher worker
///
/// Cloning is cheap; all clones feed the same queue. The worker exits
/// once every handle has been dropped.
#[derive(Clone)]
pub struct RestDispatcher {
    tx: mpsc::UnboundedSender<InFlight>,
}

impl RestDispatcher {
    /// Create a dispatcher and spawn its worker task
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            user_agent: format!("parley/{}", env!("CARGO_PKG_VERSION")),
            timeout: config.rest_request_timeout,
            table: RateLimitTable::new(),
            global: GlobalThrottle::new(),
            queue: VecDeque::new(),
            rx,
        };
        tokio::spawn(worker.run());

        Self { tx }
    }

    /// Submit a request and await its resolution
    ///
    /// Requests start in submission order. Throttled requests (bucket
    /// exhaustion or 429) are delayed and retried — without bound, by
    /// contract — and never surface as failures; every other failure
    /// resolves as a typed [`RestError`].
    pub async fn submit(&self, request: Request) -> RestResult<ResponseBody> {
        let (resolve, rx) = oneshot::channel();
        self.tx
            .send(InFlight { request, resolve })
            .map_err(|_| RestError::Closed)?;
        rx.await.map_err(|_| RestError::Closed)?
    }

    /// Discover the gateway connection URL
    pub async fn get_gateway(&self) -> RestResult<GatewayInfo> {
        let route = Route::gateway_bot();
        let path = route.path.clone();
        let body = self.submit(Request::get(route)).await?;

        let value = body.into_json().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(|source| RestError::Decode {
            method: Method::GET,
            path,
            source,
        })
    }
}

struct Worker {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_agent: String,
    timeout: Duration,
    table: RateLimitTable,
    global: GlobalThrottle,
    queue: VecDeque<InFlight>,
    rx: mpsc::UnboundedReceiver<InFlight>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            // Pull newly submitted requests behind anything already queued,
            // so requeued descriptors keep their place at the front.
            while let Ok(item) = self.rx.try_recv() {
                self.queue.push_back(item);
            }

            let item = match self.queue.pop_front() {
                Some(item) => item,
                None => match self.rx.recv().await {
                    Some(item) => item,
                    None => break,
                },
            };

            // Global throttle gate
            while let Some(delay) = self.global.remaining_delay(Instant::now()) {
                tracing::warn!(
                    delay_ms = delay.as_millis() as u64,
                    "Global rate limit active; waiting"
                );
                tokio::time::sleep(delay).await;
            }

            // Bucket gate: exhaustion delays the request, never discards it
            let wait = self
                .table
                .bucket_for(&item.request.route.bucket)
                .and_then(|bucket| bucket.delay_until_reset(Instant::now()));
            if let Some(delay) = wait {
                tracing::warn!(
                    bucket = %item.request.route.bucket,
                    delay_ms = delay.as_millis() as u64,
                    "Bucket exhausted; delaying request"
                );
                self.queue.push_front(item);
                tokio::time::sleep(delay).await;
                continue;
            }

            let outcome = self.execute(&item.request).await;
            // The caller may have given up waiting; that must not stop the worker
            let _ = item.resolve.send(outcome);
        }

        // Channel closed with requests still queued: resolve them all
        for item in self.queue.drain(..) {
            let _ = item.resolve.send(Err(RestError::Closed));
        }
    }

    async fn execute(&mut self, request: &Request) -> RestResult<ResponseBody> {
        loop {
            let response = self.send_once(request).await?;
            self.record_rate_limits(&request.route.bucket, response.headers());

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = header_f64(response.headers(), "retry-after").unwrap_or(1.0);
                let delay = Duration::from_secs_f64(retry_after.max(0.0));
                tracing::warn!(
                    route = %request.route,
                    delay_ms = delay.as_millis() as u64,
                    "429 received; retrying after delay"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return self.read_body(request, response).await;
        }
    }

    async fn send_once(&self, request: &Request) -> RestResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, request.route.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(USER_AGENT, &self.user_agent);

        if request.attachments.is_empty() {
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
        } else {
            // Structured body rides along as a named field; each blob is
            // its own part.
            let mut form = Form::new();
            if let Some(body) = &request.body {
                form = form.text("payload_json", body.to_string());
            }
            for (index, attachment) in request.attachments.iter().enumerate() {
                form = form.part(
                    format!("files[{index}]"),
                    Part::bytes(attachment.data.clone()).file_name(attachment.name.clone()),
                );
            }
            builder = builder.multipart(form);
        }

        match tokio::time::timeout(self.timeout, builder.send()).await {
            Err(_) => Err(RestError::Timeout {
                method: request.method.clone(),
                path: request.route.path.clone(),
            }),
            Ok(Err(source)) if source.is_timeout() => Err(RestError::Timeout {
                method: request.method.clone(),
                path: request.route.path.clone(),
            }),
            Ok(Err(source)) => Err(RestError::Network {
                method: request.method.clone(),
                path: request.route.path.clone(),
                source,
            }),
            Ok(Ok(response)) => Ok(response),
        }
    }

    /// Update bucket and global state from response headers
    fn record_rate_limits(&mut self, route_bucket: &str, headers: &HeaderMap) {
        let now = Instant::now();

        let limit = header_u32(headers, "x-ratelimit-limit");
        let remaining = header_u32(headers, "x-ratelimit-remaining");
        let reset_after = header_f64(headers, "x-ratelimit-reset-after");

        if let (Some(limit), Some(remaining), Some(reset_after)) = (limit, remaining, reset_after) {
            self.table.record(
                route_bucket,
                RateLimitUpdate {
                    bucket_id: header_str(headers, "x-ratelimit-bucket").map(String::from),
                    limit,
                    remaining,
                    reset_after: Duration::from_secs_f64(reset_after.max(0.0)),
                },
                now,
            );
        }

        if header_str(headers, "x-ratelimit-global") == Some("true") {
            let retry_after = header_f64(headers, "retry-after").unwrap_or(1.0);
            self.global
                .set(Duration::from_secs_f64(retry_after.max(0.0)), now);
            tracing::warn!(
                retry_after_s = retry_after,
                "Global rate limit encountered"
            );
        } else {
            self.global.clear();
        }
    }

    async fn read_body(
        &self,
        request: &Request,
        response: reqwest::Response,
    ) -> RestResult<ResponseBody> {
        let status = response.status();
        let is_json = header_str(response.headers(), CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.contains("application/json"));

        let bytes = response
            .bytes()
            .await
            .map_err(|source| RestError::Network {
                method: request.method.clone(),
                path: request.route.path.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(RestError::Api {
                status: status.as_u16(),
                method: request.method.clone(),
                path: request.route.path.clone(),
                body: bytes.to_vec(),
            });
        }

        if status == StatusCode::NO_CONTENT || bytes.is_empty() {
            return Ok(ResponseBody::Empty);
        }

        if is_json {
            return serde_json::from_slice(&bytes)
                .map(ResponseBody::Json)
                .map_err(|source| RestError::Decode {
                    method: request.method.clone(),
                    path: request.route.path.clone(),
                    source,
                });
        }

        Ok(ResponseBody::Bytes(bytes.to_vec()))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    header_str(headers, name).and_then(|value| value.parse().ok())
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    header_str(headers, name).and_then(|value| value.parse().ok())
}
