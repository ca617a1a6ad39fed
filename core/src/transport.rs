//! Executing an `HttpRequest` over the network.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::BbbResult;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs exactly one HTTP round trip per call.
///
/// Any response that arrives, whatever its status, is returned as data.
/// `Err` is reserved for failures to complete the exchange at all.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> BbbResult<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> BbbResult<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent is cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> BbbResult<HttpResponse> {
        debug!(method = ?request.method, "sending request");

        let mut response = match (request.method, &request.body) {
            (HttpMethod::Get, _) => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.call()?
            }
            (HttpMethod::Post, body) => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                match body {
                    Some(bytes) => builder.send(&bytes[..])?,
                    None => builder.send_empty()?,
                }
            }
        };

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
        let body = response.body_mut().read_to_vec()?;

        let response = HttpResponse {
            status,
            headers,
            body,
        };
        if response.is_success() {
            debug!(status, bytes = response.body.len(), "received response");
        } else {
            warn!(status, bytes = response.body.len(), "non-success HTTP status");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BbbError;

    #[test]
    fn unreachable_host_is_a_transport_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = UreqTransport::new(Duration::from_secs(2));
        let request = HttpRequest::get(format!("http://127.0.0.1:{port}/api/getMeetings?checksum=x"));
        let err = transport.execute(&request).unwrap_err();
        assert!(matches!(err, BbbError::Transport(_) | BbbError::Timeout));
    }

    #[test]
    fn malformed_url_is_a_transport_failure() {
        let transport = UreqTransport::default();
        let request = HttpRequest::get("not a url".to_string());
        assert!(transport.execute(&request).is_err());
    }
}
