//! Standard Webhooks signatures for payment events.
//!
//! The processor signs `{webhook-id}.{webhook-timestamp}.{body}` with HMAC-SHA256 and sends
//! `webhook-signature: v1,<base64>`; several space-separated signatures may be present during
//! secret rotation. Secrets are `whsec_` followed by base64 key bytes.
//!
//! See: <https://www.standardwebhooks.com/>

use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::prelude::RngExt;
use sha2::Sha256;

use super::PaymentError;

type HmacSha256 = Hmac<Sha256>;

pub const SECRET_PREFIX: &str = "whsec_";

/// Maximum age (and clock skew) of a signed delivery
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";
pub const HEADER_SIGNATURE: &str = "webhook-signature";

/// A fresh `whsec_` secret with 32 random bytes
pub fn generate_secret() -> String {
    let mut secret_bytes = [0u8; 32];
    rand::rng().fill(&mut secret_bytes);
    format!("{SECRET_PREFIX}{}", BASE64_STANDARD.encode(secret_bytes))
}

/// Key bytes of a `whsec_` secret; `None` if the prefix or base64 is wrong
pub fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let encoded = secret.strip_prefix(SECRET_PREFIX)?;
    BASE64_STANDARD.decode(encoded).ok().filter(|bytes| !bytes.is_empty())
}

fn mac(msg_id: &str, timestamp: i64, payload: &str, key: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(format!("{msg_id}.{timestamp}.{payload}").as_bytes());
    Some(mac)
}

/// Signature header value (`v1,<base64>`) for a payload
pub fn sign_payload(msg_id: &str, timestamp: i64, payload: &str, secret: &str) -> Option<String> {
    let key = decode_secret(secret)?;
    let signature = mac(msg_id, timestamp, payload, &key)?.finalize().into_bytes();
    Some(format!("v1,{}", BASE64_STANDARD.encode(signature)))
}

/// True if any `v1` entry of the signature header matches
pub fn verify_signature(msg_id: &str, timestamp: i64, payload: &str, signature_header: &str, secret: &str) -> bool {
    let Some(key) = decode_secret(secret) else {
        return false;
    };

    signature_header
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|encoded| BASE64_STANDARD.decode(encoded).ok())
        .any(|candidate| mac(msg_id, timestamp, payload, &key).is_some_and(|m| m.verify_slice(&candidate).is_ok()))
}

/// Verify the three Standard Webhooks headers against the raw body
pub fn verify_request(headers: &HeaderMap, body: &str, secret: &str, now: DateTime<Utc>) -> Result<(), PaymentError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PaymentError::InvalidSignature(format!("missing {name} header")))
    };

    let msg_id = header(HEADER_ID)?;
    let timestamp: i64 = header(HEADER_TIMESTAMP)?
        .parse()
        .map_err(|_| PaymentError::InvalidSignature("malformed timestamp".to_string()))?;
    let signature = header(HEADER_SIGNATURE)?;

    if (now.timestamp() - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance".to_string()));
    }
    if !verify_signature(msg_id, timestamp, body, signature, secret) {
        return Err(PaymentError::InvalidSignature("signature mismatch".to_string()));
    }
    Ok(())
}

/// Headers for a signed delivery; used by tests and local tooling that replay events
pub fn signed_headers(msg_id: &str, timestamp: i64, body: &str, secret: &str) -> Option<Vec<(&'static str, String)>> {
    Some(vec![
        (HEADER_ID, msg_id.to_string()),
        (HEADER_TIMESTAMP, timestamp.to_string()),
        (HEADER_SIGNATURE, sign_payload(msg_id, timestamp, body, secret)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: Vec<(&'static str, String)>) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name, HeaderValue::from_str(&value).unwrap());
        }
        map
    }

    #[test]
    fn test_generate_and_decode_secret() {
        let secret = generate_secret();
        assert!(secret.starts_with(SECRET_PREFIX));
        assert_eq!(decode_secret(&secret).unwrap().len(), 32);

        assert!(decode_secret("invalid_secret").is_none());
        assert!(decode_secret("whsec_not-valid-base64!!!").is_none());
        assert!(decode_secret("whsec_").is_none());
    }

    #[test]
    fn test_sign_and_verify() {
        let secret = generate_secret();
        let body = r#"{"type":"payment.completed","data":{"payment_id":"pay_1"}}"#;
        let signature = sign_payload("msg_1", 1704067200, body, &secret).unwrap();

        assert!(verify_signature("msg_1", 1704067200, body, &signature, &secret));
        assert!(!verify_signature("msg_1", 1704067200, "tampered", &signature, &secret));
        assert!(!verify_signature("msg_1", 1704067201, body, &signature, &secret));
        assert!(!verify_signature("msg_2", 1704067200, body, &signature, &secret));
        assert!(!verify_signature("msg_1", 1704067200, body, &signature, &generate_secret()));
        assert!(!verify_signature("msg_1", 1704067200, body, "v2,abc", &secret));
    }

    #[test]
    fn test_rotated_signatures_accepted() {
        let old = generate_secret();
        let new = generate_secret();
        let body = "{}";
        let header = format!(
            "{} {}",
            sign_payload("msg", 10, body, &old).unwrap(),
            sign_payload("msg", 10, body, &new).unwrap()
        );
        assert!(verify_signature("msg", 10, body, &header, &new));
        assert!(verify_signature("msg", 10, body, &header, &old));
    }

    #[test]
    fn test_verify_request_tolerance() {
        let secret = generate_secret();
        let body = "{}";
        let now = Utc::now();

        let fresh = headers(signed_headers("msg", now.timestamp(), body, &secret).unwrap());
        assert!(verify_request(&fresh, body, &secret, now).is_ok());

        let stale_ts = now.timestamp() - TIMESTAMP_TOLERANCE_SECS - 1;
        let stale = headers(signed_headers("msg", stale_ts, body, &secret).unwrap());
        assert!(matches!(
            verify_request(&stale, body, &secret, now),
            Err(PaymentError::InvalidSignature(_))
        ));

        assert!(verify_request(&HeaderMap::new(), body, &secret, now).is_err());
    }
}
