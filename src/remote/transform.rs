//! Transform invocation: `POST /apply_prompt`.
//!
//! The service substitutes each `{input_object_name}` placeholder in the
//! prompt with that object's content and materialises the result under the
//! requested output name. The output may not be readable by the time this
//! call returns; read it with [`super::ObjectStore::fetch_object`].

use super::transport::ApiRequest;
use super::RemoteClient;
use crate::error::SummarizeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// How the service merges several values bound to one input before substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CombineMode {
    /// `"combine_events"`: join every value into one unit.
    CombineEvents,
    /// Any other directive, passed through untouched.
    Other(String),
}

impl CombineMode {
    pub fn as_str(&self) -> &str {
        match self {
            CombineMode::CombineEvents => "combine_events",
            CombineMode::Other(s) => s,
        }
    }
}

impl From<String> for CombineMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "combine_events" => CombineMode::CombineEvents,
            _ => CombineMode::Other(s),
        }
    }
}

impl From<CombineMode> for String {
    fn from(m: CombineMode) -> Self {
        match m {
            CombineMode::CombineEvents => "combine_events".to_string(),
            CombineMode::Other(s) => s,
        }
    }
}

/// One input of a transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformInput {
    #[serde(rename = "input_object_name")]
    pub object_name: String,
    pub mode: CombineMode,
}

impl TransformInput {
    pub fn combined(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            mode: CombineMode::CombineEvents,
        }
    }
}

#[derive(Serialize)]
struct ApplyPromptBody<'a> {
    created_object_names: [&'a str; 1],
    prompt_string: &'a str,
    inputs: &'a [TransformInput],
}

/// Accepted transform. The body is whatever the service answered.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformAck {
    pub output_name: String,
    pub body: Value,
}

/// Issues `apply_prompt` requests over [`RemoteClient`].
#[derive(Clone)]
pub struct TransformClient {
    client: RemoteClient,
}

impl TransformClient {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    pub async fn apply_transform(
        &self,
        output_name: &str,
        template: &str,
        inputs: &[TransformInput],
    ) -> Result<TransformAck, SummarizeError> {
        let transform_error = |message: String| SummarizeError::Transform {
            object: output_name.to_string(),
            message,
        };

        let body = serde_json::to_value(ApplyPromptBody {
            created_object_names: [output_name],
            prompt_string: template,
            inputs,
        })
        .map_err(|e| transform_error(format!("could not encode request: {e}")))?;

        debug!(
            "Applying prompt -> '{}' over {:?}",
            output_name,
            inputs.iter().map(|i| i.object_name.as_str()).collect::<Vec<_>>()
        );

        let body = self
            .client
            .call(ApiRequest::post("apply_prompt", body))
            .await
            .map_err(|f| transform_error(f.message))?;
        info!("Transform accepted for '{}'", output_name);

        Ok(TransformAck {
            output_name: output_name.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CallLog;
    use crate::remote::testing::{Reply, StubTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn transform(stub: StubTransport) -> (TransformClient, CallLog) {
        let log = CallLog::new();
        let client = RemoteClient::new(Arc::new(stub), log.clone());
        (TransformClient::new(client), log)
    }

    #[test]
    fn combine_mode_serde() {
        assert_eq!(
            serde_json::to_value(CombineMode::CombineEvents).unwrap(),
            json!("combine_events")
        );
        let other: CombineMode = serde_json::from_value(json!("first_event")).unwrap();
        assert_eq!(other, CombineMode::Other("first_event".into()));
        assert_eq!(other.as_str(), "first_event");
    }

    #[tokio::test]
    async fn apply_sends_contract_body() {
        let (client, log) = transform(StubTransport::new());
        let ack = client
            .apply_transform(
                "document_summary",
                "Summarise {uploaded_document}",
                &[TransformInput::combined("uploaded_document")],
            )
            .await
            .unwrap();
        assert_eq!(ack.output_name, "document_summary");

        assert_eq!(
            log.list()[0].request,
            Some(json!({
                "created_object_names": ["document_summary"],
                "prompt_string": "Summarise {uploaded_document}",
                "inputs": [{"input_object_name": "uploaded_document", "mode": "combine_events"}],
            }))
        );
    }

    #[tokio::test]
    async fn non_2xx_is_transform_error() {
        let (client, _) = transform(StubTransport::new().reply(
            "POST apply_prompt",
            Reply::Status(422, json!({"message": "unknown input"})),
        ));
        let err = client
            .apply_transform("out", "{in}", &[TransformInput::combined("in")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate summary: unknown input");
    }
}
