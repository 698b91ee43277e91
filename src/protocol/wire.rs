//! Extraction of typed requests from raw HTTP parts.

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::{GateError, ProtocolErrorKind};

use super::request::{
    InboundRequest, SubmissionHeaders, HEADER_IDEMPOTENCY_KEY, HEADER_SIGNATURE,
    HEADER_SIGNATURE_LEGACY, HEADER_TIMESTAMP, HEADER_WEBHOOK_SIGNATURE,
};

/// Read a header as UTF-8. Non-UTF-8 values are treated as absent.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Build a payment submission from raw parts without interpreting the body.
pub fn payment_submission(headers: &HeaderMap, body: Bytes) -> InboundRequest {
    let signature = header_str(headers, HEADER_SIGNATURE)
        .or_else(|| header_str(headers, HEADER_SIGNATURE_LEGACY))
        .map(str::to_string);

    InboundRequest::PaymentSubmission {
        headers: SubmissionHeaders {
            signature,
            timestamp: header_str(headers, HEADER_TIMESTAMP).map(str::to_string),
            idempotency_key: header_str(headers, HEADER_IDEMPOTENCY_KEY).map(str::to_string),
        },
        body,
    }
}

/// Build a provider webhook from raw parts.
pub fn provider_webhook(headers: &HeaderMap, body: Bytes) -> InboundRequest {
    InboundRequest::ProviderWebhook {
        signature_header: header_str(headers, HEADER_WEBHOOK_SIGNATURE).map(str::to_string),
        body,
    }
}

/// Parse an authenticated JSON body.
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, GateError> {
    serde_json::from_slice(body).map_err(|e| GateError::Protocol {
        kind: ProtocolErrorKind::InvalidBody {
            message: format!("Invalid JSON: {}", e),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PaymentSubmission;
    use axum::http::HeaderValue;

    #[test]
    fn test_submission_headers_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_static("abcd"));
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_static("1700000000"));
        headers.insert(HEADER_IDEMPOTENCY_KEY, HeaderValue::from_static("key-1"));

        match payment_submission(&headers, Bytes::from_static(b"{}")) {
            InboundRequest::PaymentSubmission { headers, .. } => {
                assert_eq!(headers.signature.as_deref(), Some("abcd"));
                assert_eq!(headers.timestamp.as_deref(), Some("1700000000"));
                assert_eq!(headers.idempotency_key.as_deref(), Some("key-1"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_legacy_signature_header_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SIGNATURE_LEGACY, HeaderValue::from_static("beef"));

        match payment_submission(&headers, Bytes::new()) {
            InboundRequest::PaymentSubmission { headers, .. } => {
                assert_eq!(headers.signature.as_deref(), Some("beef"));
                assert!(headers.idempotency_key.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_body_error_is_protocol() {
        let result: Result<PaymentSubmission, _> = parse_json_body(b"not json");
        assert!(matches!(
            result,
            Err(GateError::Protocol {
                kind: ProtocolErrorKind::InvalidBody { .. }
            })
        ));
    }
}
