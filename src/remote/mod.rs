//! Typed clients for the remote prompt-tools API.
//!
//! ```text
//! ObjectStore ─┐
//!              ├─▶ RemoteClient ──▶ dyn Transport ──▶ HTTP
//! TransformClient ┘      │
//!                        └─▶ CallLog (one entry per call)
//! ```
//!
//! 1. [`transport`]: request/response types and the reqwest transport
//! 2. [`objects`]  : create / fetch / delete named remote objects
//! 3. [`transform`]: run a templated prompt over stored objects
//!
//! [`RemoteClient::call`] is the single funnel every request goes through:
//! it sends, records exactly one audit entry, and classifies the outcome.

pub mod objects;
pub mod transform;
pub mod transport;

use crate::audit::CallLog;
use crate::error::UNKNOWN_ERROR;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use transport::{ApiRequest, Transport};

pub use objects::{ObjectStore, RemoteValue};
pub use transform::{CombineMode, TransformAck, TransformClient, TransformInput};
pub use transport::{ApiResponse, HttpTransport, TransportError};

/// Why a call did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFailure {
    /// `None` when no response arrived.
    pub status: Option<u16>,
    /// Remote `message` field, transport error text, or [`UNKNOWN_ERROR`].
    pub message: String,
    /// Response body, `Null` on transport failure.
    pub body: Value,
}

/// Shared funnel over a [`Transport`] that logs every call.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    log: CallLog,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>, log: CallLog) -> Self {
        Self { transport, log }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Send `request`, record it, and return the 2xx body or the failure.
    pub async fn call(&self, request: ApiRequest) -> Result<Value, CallFailure> {
        let url = self.transport.url(&request.path);
        let outcome = self.transport.send(&request).await;

        match outcome {
            Ok(response) => {
                let sequence = self.log.record(
                    request.method,
                    url,
                    request.body,
                    response.body.clone(),
                    Some(response.status),
                );
                debug!("call #{} returned {}", sequence, response.status);
                if response.is_success() {
                    Ok(response.body)
                } else {
                    Err(CallFailure {
                        status: Some(response.status),
                        message: remote_message(&response.body)
                            .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
                        body: response.body,
                    })
                }
            }
            Err(e) => {
                let message = if e.0.trim().is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    e.0
                };
                let sequence = self.log.record(
                    request.method,
                    url,
                    request.body,
                    serde_json::json!({ "error": message }),
                    None,
                );
                debug!("call #{} failed in transport: {}", sequence, message);
                Err(CallFailure {
                    status: None,
                    message,
                    body: Value::Null,
                })
            }
        }
    }
}

/// The `message` field of an error body, when it is a non-empty string.
fn remote_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}


#[cfg(test)]
mod tests {
    use super::testing::{Reply, StubTransport};
    use super::*;
    use serde_json::json;

    fn client(stub: StubTransport) -> RemoteClient {
        RemoteClient::new(Arc::new(stub), CallLog::new())
    }

    #[tokio::test]
    async fn success_returns_body_and_logs() {
        let c = client(StubTransport::new().reply(
            "GET return_data/x",
            Reply::Status(200, json!({"text_value": "hi"})),
        ));
        let body = c.call(ApiRequest::get("return_data/x")).await.unwrap();
        assert_eq!(body["text_value"], "hi");

        let log = c.log().list();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].url, "http://stub/api_tools/return_data/x");
        assert_eq!(log[0].status, Some(200));
    }

    #[tokio::test]
    async fn non_2xx_surfaces_remote_message() {
        let c = client(StubTransport::new().reply(
            "POST input_data",
            Reply::Status(500, json!({"message": "disk full"})),
        ));
        let err = c
            .call(ApiRequest::post("input_data", json!({"a": 1})))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(500));
        assert_eq!(err.message, "disk full");

        let log = c.log().list();
        assert_eq!(log[0].request, Some(json!({"a": 1})));
        assert_eq!(log[0].response, json!({"message": "disk full"}));
    }

    #[tokio::test]
    async fn non_2xx_without_message_uses_fallback() {
        let c = client(
            StubTransport::new().reply("DELETE objects/x", Reply::Status(404, json!("Not Found"))),
        );
        let err = c.call(ApiRequest::delete("objects/x")).await.unwrap_err();
        assert_eq!(err.message, UNKNOWN_ERROR);
    }

    #[tokio::test]
    async fn transport_failure_is_logged_once() {
        let c = client(
            StubTransport::new().reply("GET return_data/x", Reply::Fail("connection refused".into())),
        );
        let err = c.call(ApiRequest::get("return_data/x")).await.unwrap_err();
        assert_eq!(err.status, None);
        assert_eq!(err.message, "connection refused");

        let log = c.log().list();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, None);
        assert_eq!(log[0].response, json!({"error": "connection refused"}));
    }
}
