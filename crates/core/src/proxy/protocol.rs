//! Wire messages exchanged with the child context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use storyvault_api::{FetchFormat, Payload};

/// Correlation id of a relayed fetch. Allocated monotonically per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Messages posted by the parent to the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ParentMessage {
    #[serde(rename_all = "camelCase")]
    FetchFile {
        url: String,
        content_type: FetchFormat,
        request_id: RequestId,
    },
}

/// Messages posted by the child to the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChildMessage {
    /// Unsolicited; completes the handshake.
    ProxyReady,
    #[serde(rename_all = "camelCase")]
    FileContent {
        request_id: RequestId,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Payload>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    ProxyError {
        error: String,
    },
}

impl ChildMessage {
    pub fn success(request_id: RequestId, url: impl Into<String>, content: Payload) -> Self {
        ChildMessage::FileContent {
            request_id,
            success: true,
            content: Some(content),
            error: None,
            url: Some(url.into()),
        }
    }

    pub fn failure(request_id: RequestId, url: impl Into<String>, error: impl Into<String>) -> Self {
        ChildMessage::FileContent {
            request_id,
            success: false,
            content: None,
            error: Some(error.into()),
            url: Some(url.into()),
        }
    }
}

/// A dispatched request, alive until its response or its timeout.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub id: RequestId,
    pub url: String,
    pub desired_format: FetchFormat,
    pub created_at: Instant,
}

impl ProxyRequest {
    pub fn to_message(&self) -> ParentMessage {
        ParentMessage::FetchFile {
            url: self.url.clone(),
            content_type: self.desired_format,
            request_id: self.id,
        }
    }
}

/// Reply correlated to a request by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub id: RequestId,
    pub outcome: Result<Payload, String>,
}

impl ProxyResponse {
    /// Extract a response from a `fileContent` message.
    pub fn from_message(message: ChildMessage) -> Option<Self> {
        let ChildMessage::FileContent {
            request_id,
            success,
            content,
            error,
            ..
        } = message
        else {
            return None;
        };

        let outcome = match (success, content) {
            (true, Some(content)) => Ok(content),
            (true, None) => Err("child reported success without content".to_string()),
            (false, _) => Err(error.unwrap_or_else(|| "unknown relay error".to_string())),
        };
        Some(Self {
            id: request_id,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_file_wire_shape() {
        let msg = ParentMessage::FetchFile {
            url: "https://example.com/a.txt".into(),
            content_type: FetchFormat::Text,
            request_id: RequestId(7),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "fetchFile",
                "url": "https://example.com/a.txt",
                "contentType": "text",
                "requestId": 7
            })
        );
    }

    #[test]
    fn child_messages_parse_from_wire() {
        let ready: ChildMessage = serde_json::from_str(r#"{"type":"proxyReady"}"#).unwrap();
        assert_eq!(ready, ChildMessage::ProxyReady);

        let content: ChildMessage = serde_json::from_str(
            r#"{"type":"fileContent","requestId":3,"success":true,"content":"érase una vez","url":"u"}"#,
        )
        .unwrap();
        let response = ProxyResponse::from_message(content).unwrap();
        assert_eq!(response.id, RequestId(3));
        assert_eq!(response.outcome, Ok(Payload::Text("érase una vez".into())));

        let failed: ChildMessage = serde_json::from_str(
            r#"{"type":"fileContent","requestId":4,"success":false,"error":"HTTP 404"}"#,
        )
        .unwrap();
        let response = ProxyResponse::from_message(failed).unwrap();
        assert_eq!(response.outcome, Err("HTTP 404".to_string()));

        let error: ChildMessage =
            serde_json::from_str(r#"{"type":"proxyError","error":"boom"}"#).unwrap();
        assert!(ProxyResponse::from_message(error).is_none());
    }
}
