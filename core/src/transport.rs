//! Transport executor: turns an `HttpRequest` into an `HttpResponse`.
//!
//! # Design
//! `Transport` is the only seam that touches the network. `UreqTransport` is
//! the bundled blocking implementation; hosts with their own HTTP stack can
//! implement the trait, or skip it entirely and feed responses straight into
//! `CodesClient::parse_response`.
//!
//! Every HTTP status, 4xx and 5xx included, comes back as data. Only a failed
//! exchange (DNS, connect, TLS, broken stream) is an `Err`.
//! Undecodable body bytes are not a failure; see `decode_body`.

use std::time::Duration;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{decode_body, HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and blocks until the exchange completes or fails.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// `timeout` bounds the whole exchange; `None` keeps ureq's defaults.
    /// Redirects are not followed: a 3xx is handed to the classifier.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Wrap a preconfigured agent. It must have `http_status_as_error`
    /// disabled, or error statuses will surface as transport failures, and
    /// `max_redirects` at 0 if 3xx statuses should reach the classifier.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        debug!(method = %request.method, endpoint = %request.endpoint, "sending request");

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(url), &request.headers);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| ApiError::transport(url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ApiError::transport(url, e))?;
        let body = decode_body(&bytes);

        debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
