//! Remote object store: named values in the service's namespace.

use super::transport::ApiRequest;
use super::{CallFailure, RemoteClient};
use crate::error::SummarizeError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// The only `data_type` this client uploads.
pub const DATA_TYPE_STRINGS: &str = "strings";

/// Value returned by `GET /return_data/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteValue {
    /// The materialised text.
    pub text_value: String,
    /// The full response object, `text_value` included, kept opaque.
    pub raw: Map<String, Value>,
}

impl RemoteValue {
    /// Validate a response body: it must be an object with a string `text_value`.
    pub fn from_body(body: Value) -> Result<Self, String> {
        let raw = match body {
            Value::Object(map) => map,
            other => {
                return Err(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                ))
            }
        };
        let text_value = match raw.get("text_value") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(format!(
                    "text_value is {}, expected a string",
                    json_kind(other)
                ))
            }
            None => return Err("response has no text_value".to_string()),
        };
        Ok(Self { text_value, raw })
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed create / fetch / delete over [`RemoteClient`].
#[derive(Clone)]
pub struct ObjectStore {
    client: RemoteClient,
}

impl ObjectStore {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// `POST /input_data`: bind `name` to the ordered `values`.
    pub async fn create_object(&self, name: &str, values: &[String]) -> Result<(), SummarizeError> {
        let body = json!({
            "created_object_name": name,
            "data_type": DATA_TYPE_STRINGS,
            "input_data": values,
        });
        let total: usize = values.iter().map(String::len).sum();
        debug!("Creating object '{}' ({} values, {} bytes)", name, values.len(), total);

        self.client
            .call(ApiRequest::post("input_data", body))
            .await
            .map_err(|f: CallFailure| SummarizeError::RemoteWrite {
                object: name.to_string(),
                message: f.message,
            })?;
        info!("Created remote object '{}'", name);
        Ok(())
    }

    /// `GET /return_data/{name}`: read the value bound to `name`.
    pub async fn fetch_object(&self, name: &str) -> Result<RemoteValue, SummarizeError> {
        let read_error = |message: String| SummarizeError::RemoteRead {
            object: name.to_string(),
            message,
        };
        let body = self
            .client
            .call(ApiRequest::get(format!("return_data/{name}")))
            .await
            .map_err(|f| read_error(f.message))?;
        RemoteValue::from_body(body).map_err(read_error)
    }

    /// `DELETE /objects/{name}`.
    pub async fn delete_object(&self, name: &str) -> Result<(), SummarizeError> {
        self.client
            .call(ApiRequest::delete(format!("objects/{name}")))
            .await
            .map_err(|f| SummarizeError::RemoteDelete {
                object: name.to_string(),
                message: f.message,
            })?;
        info!("Deleted remote object '{}'", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{CallLog, HttpMethod};
    use crate::remote::testing::{Reply, StubTransport};
    use std::sync::Arc;

    fn store(stub: StubTransport) -> (ObjectStore, CallLog) {
        let log = CallLog::new();
        let client = RemoteClient::new(Arc::new(stub), log.clone());
        (ObjectStore::new(client), log)
    }

    #[tokio::test]
    async fn create_sends_contract_body() {
        let (store, log) = store(StubTransport::new());
        store
            .create_object("uploaded_document", &["hello world".to_string()])
            .await
            .unwrap();

        let entry = &log.list()[0];
        assert_eq!(entry.method, HttpMethod::Post);
        assert_eq!(
            entry.request,
            Some(json!({
                "created_object_name": "uploaded_document",
                "data_type": "strings",
                "input_data": ["hello world"],
            }))
        );
    }

    #[tokio::test]
    async fn create_failure_is_remote_write() {
        let (store, log) = store(StubTransport::new().reply(
            "POST input_data",
            Reply::Status(500, json!({"message": "boom"})),
        ));
        let err = store
            .create_object("doc", &["x".to_string()])
            .await
            .unwrap_err();
        assert!(
            matches!(err, SummarizeError::RemoteWrite { ref message, .. } if message == "boom")
        );
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn fetch_returns_text_and_raw() {
        let (store, _) = store(StubTransport::new().reply(
            "GET return_data/document_summary",
            Reply::Status(200, json!({"text_value": "• a\n• b", "object_name": "document_summary"})),
        ));
        let v = store.fetch_object("document_summary").await.unwrap();
        assert_eq!(v.text_value, "• a\n• b");
        assert_eq!(v.raw["object_name"], "document_summary");
        assert!(v.raw.contains_key("text_value"));
    }

    #[tokio::test]
    async fn fetch_without_text_value_is_remote_read() {
        let (store, log) = store(StubTransport::new().reply(
            "GET return_data/s",
            Reply::Status(200, json!({"status": "pending"})),
        ));
        let err = store.fetch_object("s").await.unwrap_err();
        assert!(matches!(err, SummarizeError::RemoteRead { .. }));
        assert!(err.to_string().contains("no text_value"), "got: {err}");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn from_body_rejects_non_string_text_value() {
        let err = RemoteValue::from_body(json!({"text_value": 3})).unwrap_err();
        assert!(err.contains("a number"), "got: {err}");
        let err = RemoteValue::from_body(json!(["x"])).unwrap_err();
        assert!(err.contains("an array"), "got: {err}");
    }

    #[tokio::test]
    async fn delete_failure_is_remote_delete() {
        let (store, _) = store(
            StubTransport::new().reply("DELETE objects/gone", Reply::Fail("reset by peer".into())),
        );
        let err = store.delete_object("gone").await.unwrap_err();
        assert!(matches!(
            err,
            SummarizeError::RemoteDelete { ref object, ref message }
                if object == "gone" && message == "reset by peer"
        ));
    }
}
