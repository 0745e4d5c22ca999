//! HMAC-SHA256 request signing with a replay window.
//!
//! The signed message is `"{timestamp}.{payload}"`: decimal unix seconds, a
//! literal `.`, then the payload bytes. Webhooks sign the raw body; internal
//! calls sign [`canonical_request`] so the method and target are bound too.
//! Signatures are lowercase hex and may carry a `v1=` prefix.

use std::fmt;

use cadence_core::AppError;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_VERSION_PREFIX: &str = "v1=";

/// Reason a signature was rejected. Only ever logged: callers see a single
/// generic `Unauthorized`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("timestamp is not a unix time in seconds")]
    MalformedTimestamp,

    #[error("timestamp outside replay window (skew {skew_secs}s)")]
    Expired { skew_secs: u64 },

    #[error("signature is not valid hex")]
    MalformedSignature,

    #[error("signature mismatch")]
    Mismatch,

    #[error("no signing secret configured")]
    SecretNotConfigured,
}

fn mac_for(secret: &str, payload: &[u8], timestamp: i64) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::SecretNotConfigured)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// `"{METHOD} {path_and_query}.{body}"`, the payload of an internal request.
pub fn canonical_request(method: &str, path_and_query: &str, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(method.len() + path_and_query.len() + body.len() + 2);
    payload.extend_from_slice(method.to_ascii_uppercase().as_bytes());
    payload.push(b' ');
    payload.extend_from_slice(path_and_query.as_bytes());
    payload.push(b'.');
    payload.extend_from_slice(body);
    payload
}

/// Sign `payload` at `timestamp`, returning the hex digest.
pub fn sign(secret: &str, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
    let mac = mac_for(secret, payload, timestamp)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies signed requests for one trust boundary.
#[derive(Clone)]
pub struct SignatureVerifier {
    boundary: &'static str,
    secret: Option<String>,
    max_skew_secs: u64,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("boundary", &self.boundary)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("max_skew_secs", &self.max_skew_secs)
            .finish()
    }
}

impl SignatureVerifier {
    /// `boundary` names the trust boundary in logs (e.g. "internal", "webhook").
    /// An empty secret counts as not configured.
    pub fn new(boundary: &'static str, secret: Option<String>, max_skew_secs: u64) -> Self {
        Self {
            boundary,
            secret: secret.filter(|s| !s.is_empty()),
            max_skew_secs,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify against the current time. Any failure becomes a generic
    /// `AppError::Unauthorized`; the reason is logged at debug level.
    pub fn verify(
        &self,
        payload: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), AppError> {
        self.verify_at(payload, timestamp, signature, Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        payload: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now: i64,
    ) -> Result<(), AppError> {
        self.check(payload, timestamp, signature, now)
            .map_err(|reason| {
                tracing::debug!(
                    boundary = self.boundary,
                    reason = %reason,
                    "Rejected request signature"
                );
                AppError::Unauthorized("Invalid request signature".to_string())
            })
    }

    /// Detailed verification result, for logging and tests.
    pub fn check(
        &self,
        payload: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now: i64,
    ) -> Result<(), SignatureError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or(SignatureError::SecretNotConfigured)?;

        let timestamp = timestamp
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SignatureError::MissingHeader("timestamp"))?;
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingHeader("signature"))?;

        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::MalformedTimestamp)?;

        let skew_secs = now.abs_diff(timestamp);
        if skew_secs > self.max_skew_secs {
            return Err(SignatureError::Expired { skew_secs });
        }

        let provided_hex = signature
            .strip_prefix(SIGNATURE_VERSION_PREFIX)
            .unwrap_or(signature);
        let provided =
            hex::decode(provided_hex).map_err(|_| SignatureError::MalformedSignature)?;

        let expected = mac_for(secret, payload, timestamp)?.finalize().into_bytes();
        if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_760_000_000;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("webhook", Some(SECRET.to_string()), 300)
    }

    #[test]
    fn sign_is_deterministic_hex() {
        let a = sign(SECRET, b"{}", NOW).unwrap();
        let b = sign(SECRET, b"{}", NOW).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, sign(SECRET, b"{}", NOW + 1).unwrap());
    }

    #[test]
    fn accepts_valid_signature_with_or_without_prefix() {
        let body = br#"{"jobId":"job-42"}"#;
        let sig = sign(SECRET, body, NOW).unwrap();
        let ts = NOW.to_string();
        let v = verifier();

        assert_eq!(v.check(body, Some(&ts), Some(&sig), NOW), Ok(()));
        assert_eq!(v.check(body, Some(&ts), Some(&format!("v1={sig}")), NOW), Ok(()));
        assert!(v.verify_at(body, Some(&ts), Some(&sig), NOW + 299).is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let sig = sign(SECRET, b"original", NOW).unwrap();
        let ts = NOW.to_string();
        assert_eq!(
            verifier().check(b"tampered", Some(&ts), Some(&sig), NOW),
            Err(SignatureError::Mismatch)
        );

        let other = sign("other-secret", b"original", NOW).unwrap();
        assert_eq!(
            verifier().check(b"original", Some(&ts), Some(&other), NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_outside_replay_window_in_both_directions() {
        let body = b"payload";
        let v = verifier();
        for ts in [NOW - 301, NOW + 301] {
            let sig = sign(SECRET, body, ts).unwrap();
            assert_eq!(
                v.check(body, Some(&ts.to_string()), Some(&sig), NOW),
                Err(SignatureError::Expired { skew_secs: 301 })
            );
        }
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        let v = verifier();
        let sig = sign(SECRET, b"x", NOW).unwrap();
        assert_eq!(
            v.check(b"x", None, Some(&sig), NOW),
            Err(SignatureError::MissingHeader("timestamp"))
        );
        assert_eq!(
            v.check(b"x", Some(&NOW.to_string()), None, NOW),
            Err(SignatureError::MissingHeader("signature"))
        );
        assert_eq!(
            v.check(b"x", Some("yesterday"), Some(&sig), NOW),
            Err(SignatureError::MalformedTimestamp)
        );
        assert_eq!(
            v.check(b"x", Some(&NOW.to_string()), Some("zz-not-hex"), NOW),
            Err(SignatureError::MalformedSignature)
        );
    }

    #[test]
    fn missing_secret_never_skips_the_check() {
        let body = b"payload";
        let sig = sign(SECRET, body, NOW).unwrap();
        for v in [
            SignatureVerifier::new("internal", None, 300),
            SignatureVerifier::new("internal", Some(String::new()), 300),
        ] {
            assert!(!v.is_configured());
            assert_eq!(
                v.check(body, Some(&NOW.to_string()), Some(&sig), NOW),
                Err(SignatureError::SecretNotConfigured)
            );
        }
    }

    #[test]
    fn every_failure_maps_to_the_same_unauthorized_error() {
        let v = verifier();
        let ts = NOW.to_string();
        let stale = (NOW - 1000).to_string();
        let sig = sign(SECRET, b"x", NOW).unwrap();
        let failures = [
            v.verify_at(b"x", None, None, NOW),
            v.verify_at(b"x", Some("abc"), Some(&sig), NOW),
            v.verify_at(b"x", Some(&stale), Some(&sig), NOW),
            v.verify_at(b"y", Some(&ts), Some(&sig), NOW),
        ];
        for result in failures {
            match result {
                Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Invalid request signature"),
                other => panic!("expected Unauthorized, got {other:?}"),
            }
        }
    }

    #[test]
    fn canonical_request_binds_method_and_target() {
        let status = canonical_request("get", "/internal/transcoding/m1/status?requesterId=c1", b"");
        assert_eq!(status, b"GET /internal/transcoding/m1/status?requesterId=c1.".to_vec());

        let sig = sign(SECRET, &status, NOW).unwrap();
        let ts = NOW.to_string();
        let v = verifier();
        assert_eq!(v.check(&status, Some(&ts), Some(&sig), NOW), Ok(()));
        for other in [
            canonical_request("GET", "/internal/transcoding/m9/status?requesterId=c1", b""),
            canonical_request("GET", "/internal/transcoding/m1/status", b""),
            canonical_request("POST", "/internal/transcoding/m1/status?requesterId=c1", b""),
        ] {
            assert_eq!(
                v.check(&other, Some(&ts), Some(&sig), NOW),
                Err(SignatureError::Mismatch)
            );
        }

        let body = br#"{"mediaId":"m1"}"#;
        let trigger = canonical_request("POST", "/internal/transcoding/trigger", body);
        let retry = canonical_request("POST", "/internal/transcoding/retry", body);
        let sig = sign(SECRET, &trigger, NOW).unwrap();
        assert_eq!(
            v.check(&retry, Some(&ts), Some(&sig), NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", verifier());
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("<redacted>"));
    }
}
