//! Queue message envelope codec
//!
//! Requests arrive as `{"CorrelationId": "...", ...args}` and responses leave as
//! `{"Value": {...}, "CorrelationId": "..."}`. On the wire both are the UTF-8
//! bytes of the JSON text. The correlation id is opaque and only ever copied.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

/// Request envelope carrying a correlation id and operation arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope<A> {
    /// Identifies the originating tool call
    #[serde(rename = "CorrelationId")]
    pub correlation_id: String,
    /// Operation-specific arguments, flattened beside the correlation id
    #[serde(flatten)]
    pub args: A,
}

impl<A> RequestEnvelope<A> {
    /// Create a request envelope
    pub fn new(correlation_id: impl Into<String>, args: A) -> Self {
        RequestEnvelope {
            correlation_id: correlation_id.into(),
            args,
        }
    }
}

/// Response envelope. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope<V> {
    /// Operation result
    #[serde(rename = "Value")]
    pub value: V,
    /// Copied verbatim from the request
    #[serde(rename = "CorrelationId")]
    pub correlation_id: String,
}

impl<V> ResponseEnvelope<V> {
    /// Build the response to `request`, echoing its correlation id
    pub fn reply<A>(request: &RequestEnvelope<A>, value: V) -> Self {
        ResponseEnvelope {
            value,
            correlation_id: request.correlation_id.clone(),
        }
    }
}

/// Arguments of an operation that takes none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoArgs {}

/// Decode message bytes into a typed envelope
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> std::result::Result<T, DecodeError> {
    let text =
        std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8(e.to_string()))?;
    // Parse to a value first so a non-object body is a JSON error, not a schema error
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(DecodeError::InvalidJson("expected a JSON object".to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

/// Encode an envelope to message bytes
pub fn encode<T: Serialize>(envelope: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(envelope)?)
}

/// Read only the correlation id of a response body
pub fn peek_correlation_id(bytes: &[u8]) -> std::result::Result<String, DecodeError> {
    #[derive(Deserialize)]
    struct Peek {
        #[serde(rename = "CorrelationId")]
        correlation_id: String,
    }
    decode::<Peek>(bytes).map(|p| p.correlation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct ProjectArgs {
        #[serde(rename = "Project")]
        project: String,
    }

    #[test]
    fn test_decode_request_without_args() {
        let env: RequestEnvelope<NoArgs> = decode(br#"{"CorrelationId":"c1"}"#).unwrap();
        assert_eq!(env.correlation_id, "c1");
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let env: RequestEnvelope<NoArgs> =
            decode(br#"{"CorrelationId":"c1","Extra":42}"#).unwrap();
        assert_eq!(env, RequestEnvelope::new("c1", NoArgs {}));
    }

    #[test]
    fn test_decode_request_with_args() {
        let env: RequestEnvelope<ProjectArgs> =
            decode(br#"{"CorrelationId":"c2","Project":"Gizmo Galaxy"}"#).unwrap();
        assert_eq!(env.args.project, "Gizmo Galaxy");
    }

    #[test]
    fn test_missing_correlation_id() {
        let err = decode::<RequestEnvelope<NoArgs>>(br#"{"Project":"x"}"#).unwrap_err();
        match err {
            DecodeError::Schema(msg) => assert!(msg.contains("CorrelationId")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_operation_field() {
        let err =
            decode::<RequestEnvelope<ProjectArgs>>(br#"{"CorrelationId":"c"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Schema(_)));
    }

    #[test]
    fn test_invalid_bodies() {
        assert!(matches!(
            decode::<RequestEnvelope<NoArgs>>(&[0xff, 0xfe, 0x00]),
            Err(DecodeError::InvalidUtf8(_))
        ));
        assert!(matches!(
            decode::<RequestEnvelope<NoArgs>>(b"not json"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert!(matches!(
            decode::<RequestEnvelope<NoArgs>>(b"[\"c1\"]"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert!(matches!(
            decode::<RequestEnvelope<NoArgs>>(br#"{"CorrelationId":7}"#),
            Err(DecodeError::Schema(_))
        ));
    }

    #[test]
    fn test_request_round_trip() {
        let original = RequestEnvelope::new(
            "3f2a",
            ProjectArgs {
                project: "Widget Whirlwind".to_string(),
            },
        );
        let bytes = encode(&original).unwrap();
        let decoded: RequestEnvelope<ProjectArgs> = decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_response_wire_shape() {
        let request = RequestEnvelope::new("c9", NoArgs {});
        let response = ResponseEnvelope::reply(&request, serde_json::json!({"Projects": []}));
        let bytes = encode(&response).unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"Value":{"Projects":[]},"CorrelationId":"c9"}"#
        );
        assert_eq!(peek_correlation_id(&bytes).unwrap(), "c9");
    }
}
