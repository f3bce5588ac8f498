//! Request gateway for the SideQuest API.
//!
//! Every network call made by the client goes through [`Gateway::call`],
//! which gives them a uniform contract:
//!
//! - JSON request bodies (pre-serialized strings pass through unchanged)
//! - `X-Debug-User` header whenever an identity is supplied
//! - A per-call timeout, or caller-driven cancellation
//! - JSON response decoding where an empty body means `null`
//! - Structured [`GatewayError`]s carrying status and payload
//!
//! The gateway never retries. Callers decide what a failure means.

pub mod error;

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sidequest_core::Identity;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use crate::config::ClientConfig;

pub use error::{GatewayError, UNAUTHENTICATED_MESSAGE, UNREACHABLE_MESSAGE};

/// Header carrying the debug identity.
pub const IDENTITY_HEADER: &str = "X-Debug-User";

/// Request body for a gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized to JSON before sending.
    Json(Value),
    /// Sent exactly as given.
    Raw(String),
}

impl RequestBody {
    fn into_string(self) -> Result<String, GatewayError> {
        match self {
            Self::Json(value) => Ok(serde_json::to_string(&value)?),
            Self::Raw(raw) => Ok(raw),
        }
    }
}

/// Options for a single [`Gateway::call`].
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    /// Overrides the gateway default when set.
    pub timeout: Option<Duration>,
    pub identity: Option<Identity>,
    /// External cancellation. When present, the internal timer is not used.
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    /// Options for a request with the given method and no body.
    #[must_use]
    pub const fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            timeout: None,
            identity: None,
            cancel: None,
        }
    }

    #[must_use]
    pub const fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub const fn post() -> Self {
        Self::new(Method::POST)
    }

    #[must_use]
    pub const fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    #[must_use]
    pub const fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Attach a body serialized from `body`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Decode` if `body` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, GatewayError> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Attach a pre-serialized body.
    #[must_use]
    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// HTTP gateway to the SideQuest API.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: reqwest::Client,
    /// Root of every path, e.g. `http://localhost:5000/api`
    api_root: String,
    default_timeout: Duration,
}

impl Gateway {
    /// Create a gateway from client configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sidequest-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, config.api_root(), config.timeout))
    }

    /// Create a gateway around an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, api_root: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            client,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            default_timeout,
        }
    }

    /// Root URL every path is appended to.
    #[must_use]
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Timeout applied when a call does not specify one.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Perform a request and decode the response body as JSON.
    ///
    /// An empty body decodes to `Value::Null`.
    ///
    /// # Errors
    ///
    /// - `GatewayError::Timeout` if no cancellation token was supplied and
    ///   the call outlived its timeout
    /// - `GatewayError::Cancelled` if the supplied token was cancelled
    /// - `GatewayError::Network` on connection failures
    /// - `GatewayError::Decode` if a non-empty body is not valid JSON
    /// - `GatewayError::Http` for non-success statuses
    #[instrument(
        skip(self, options),
        fields(method = %options.method, identity = options.identity.as_ref().map(Identity::as_str))
    )]
    pub async fn call(&self, path: &str, options: CallOptions) -> Result<Value, GatewayError> {
        let url = format!("{}{path}", self.api_root);
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let method = options.method.clone();
        debug!(%url, timeout_ms = millis(timeout), "API request");

        let mut request = self
            .client
            .request(options.method, &url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(body) = options.body {
            request = request.body(body.into_string()?);
        }

        if let Some(identity) = &options.identity {
            let value = HeaderValue::from_str(identity.as_str())
                .map_err(|e| GatewayError::InvalidRequest(format!("identity header: {e}")))?;
            request = request.header(IDENTITY_HEADER, value);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, GatewayError>((status, text))
        };

        let (status, text) = match options.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(%url, "API request cancelled");
                    return Err(GatewayError::Cancelled);
                }
                result = exchange => result?,
            },
            None => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| {
                    error!(%url, timeout_ms = millis(timeout), "API request timed out");
                    GatewayError::Timeout {
                        timeout_ms: millis(timeout),
                    }
                })??,
        };

        debug!(status = status.as_u16(), %method, path, "API response");

        let data = parse_json(&text)?;

        if !status.is_success() {
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .map_or_else(
                    || format!("Request failed with status {}", status.as_u16()),
                    str::to_string,
                );
            error!(status = status.as_u16(), %message, payload = %data, "API error");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
                payload: data,
            });
        }

        debug!(%method, path, "API success");
        Ok(data)
    }

    /// Perform a request and decode the response into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::call`], plus `GatewayError::Decode` if the body does
    /// not match `T`.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, GatewayError> {
        let value = self.call(path, options).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn parse_json(text: &str) -> Result<Value, GatewayError> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| {
        error!(error = %e, "Failed to parse JSON response");
        GatewayError::Decode(e)
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
