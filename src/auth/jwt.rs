//! Unverified JWT payload decoding, used only to detect expired tokens early.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::{BridgeError, BridgeResult};

/// base64url that accepts both padded and unpadded segments.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the claims segment of a JWT-shaped string without checking the signature.
///
/// Returns `None` unless the token has exactly three dot-separated segments and
/// the middle one is base64url-encoded JSON object.
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = BASE64_URL.decode(payload).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// The numeric `exp` claim (seconds since the epoch), when it can be determined.
pub fn expiry(token: &str) -> Option<f64> {
    decode_claims(token)?.get("exp")?.as_f64()
}

/// Fails with `ExpiredToken` if the token's expiry is at or before `now` (unix seconds).
/// Tokens without a decodable expiry pass.
pub fn ensure_not_expired_at(token: &str, now: i64) -> BridgeResult<()> {
    match expiry(token) {
        Some(exp) if exp - now as f64 <= 0.0 => Err(BridgeError::ExpiredToken),
        _ => Ok(()),
    }
}

pub fn ensure_not_expired(token: &str) -> BridgeResult<()> {
    ensure_not_expired_at(token, Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token_with(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"unit-test"),
        )
        .unwrap()
    }

    #[test]
    fn decodes_exp_claim() {
        let token = token_with(json!({ "sub": "u1", "exp": 1_700_000_000 }));
        assert_eq!(expiry(&token), Some(1_700_000_000.0));
    }

    #[test]
    fn expired_at_boundary() {
        let token = token_with(json!({ "exp": 100 }));
        assert!(matches!(
            ensure_not_expired_at(&token, 100),
            Err(BridgeError::ExpiredToken)
        ));
        assert!(ensure_not_expired_at(&token, 99).is_ok());
    }

    #[test]
    fn future_expiry_passes() {
        let exp = Utc::now().timestamp() + 3600;
        let token = token_with(json!({ "exp": exp }));
        assert!(ensure_not_expired(&token).is_ok());
    }

    #[test]
    fn malformed_tokens_have_no_expiry() {
        assert_eq!(expiry("opaque-token"), None);
        assert_eq!(expiry("a.b"), None);
        assert_eq!(expiry("a.b.c.d"), None);
        assert_eq!(expiry("a.!!!.c"), None);
        // valid base64url but not JSON
        assert_eq!(expiry("a.bm90LWpzb24.c"), None);
        assert!(ensure_not_expired("opaque-token").is_ok());
    }

    #[test]
    fn non_numeric_exp_is_ignored() {
        let token = token_with(json!({ "exp": "yesterday" }));
        assert_eq!(expiry(&token), None);
        assert!(ensure_not_expired_at(&token, i64::MAX).is_ok());
    }
}
