//! Internal caller authentication.
//!
//! Internal routes carry `X-Cadence-Timestamp` and `X-Cadence-Signature`
//! computed over `"{timestamp}.{METHOD} {path_and_query}.{body}"`, so a
//! signature only verifies for the route, media id and query it was made
//! for. Each handler verifies before it decodes anything.

use axum::http::{HeaderMap, Method, Uri};
use cadence_core::constants::{INTERNAL_SIGNATURE_HEADER, INTERNAL_TIMESTAMP_HEADER};
use cadence_core::AppError;
use cadence_services::{canonical_request, SignatureVerifier};

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Path and query exactly as received; absolute-form targets are reduced to
/// their origin form.
fn request_target(uri: &Uri) -> &str {
    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}

/// Reject the request unless it is signed with the internal secret.
pub fn verify_internal(
    verifier: &SignatureVerifier,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), AppError> {
    let payload = canonical_request(method.as_str(), request_target(uri), body);
    verifier.verify(
        &payload,
        header_str(headers, INTERNAL_TIMESTAMP_HEADER),
        header_str(headers, INTERNAL_SIGNATURE_HEADER),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use cadence_services::sign;
    use chrono::Utc;

    fn signed_headers(secret: &str, method: &str, target: &str, body: &[u8]) -> HeaderMap {
        let ts = Utc::now().timestamp();
        let sig = sign(secret, &canonical_request(method, target, body), ts).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            INTERNAL_TIMESTAMP_HEADER,
            HeaderValue::from_str(&ts.to_string()).unwrap(),
        );
        headers.insert(INTERNAL_SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());
        headers
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("internal", Some("s3cret".to_string()), 300)
    }

    #[test]
    fn accepts_correctly_signed_request() {
        let body = br#"{"mediaId":"m1"}"#;
        let uri: Uri = "/internal/transcoding/trigger".parse().unwrap();
        let headers = signed_headers("s3cret", "POST", "/internal/transcoding/trigger", body);
        assert!(verify_internal(&verifier(), &Method::POST, &uri, &headers, body).is_ok());
    }

    #[test]
    fn absolute_form_uri_verifies_against_its_origin_form() {
        let uri: Uri = "http://localhost/internal/transcoding/m1/status?requesterId=c1"
            .parse()
            .unwrap();
        let headers = signed_headers(
            "s3cret",
            "GET",
            "/internal/transcoding/m1/status?requesterId=c1",
            b"",
        );
        assert!(verify_internal(&verifier(), &Method::GET, &uri, &headers, b"").is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_missing_headers() {
        let uri: Uri = "/internal/transcoding/trigger".parse().unwrap();
        let headers = signed_headers(
            "s3cret",
            "POST",
            "/internal/transcoding/trigger",
            br#"{"mediaId":"m1"}"#,
        );
        let err = verify_internal(&verifier(), &Method::POST, &uri, &headers, br#"{"mediaId":"m2"}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = verify_internal(&verifier(), &Method::POST, &uri, &HeaderMap::new(), b"")
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn signature_does_not_carry_over_to_another_target() {
        let headers = signed_headers(
            "s3cret",
            "GET",
            "/internal/transcoding/m1/status?requesterId=c1",
            b"",
        );
        for target in [
            "/internal/transcoding/m9/status?requesterId=c1",
            "/internal/transcoding/m1/status",
            "/internal/transcoding/m1/status?requesterId=c2",
        ] {
            let uri: Uri = target.parse().unwrap();
            let err = verify_internal(&verifier(), &Method::GET, &uri, &headers, b"").unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)), "{target}");
        }
    }

    #[test]
    fn unconfigured_secret_rejects_everything() {
        let verifier = SignatureVerifier::new("internal", None, 300);
        let body = b"{}";
        let uri: Uri = "/internal/transcoding/trigger".parse().unwrap();
        let headers = signed_headers("anything", "POST", "/internal/transcoding/trigger", body);
        let err = verify_internal(&verifier, &Method::POST, &uri, &headers, body).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
