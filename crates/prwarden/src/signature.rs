//! Webhook delivery signature verification.
//!
//! GitHub signs the raw request body with the shared webhook secret and
//! sends the result in `X-Hub-Signature-256` (HMAC-SHA256), plus the legacy
//! `X-Hub-Signature` (HMAC-SHA1) for older integrations. Either header is
//! accepted; comparison is constant-time via the `hmac` crate.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("no signature header present")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
}

fn digest(header: &str, prefix: &str) -> Result<Vec<u8>, SignatureError> {
    let hexdigest = header
        .strip_prefix(prefix)
        .ok_or(SignatureError::Malformed)?;
    hex::decode(hexdigest).map_err(|_| SignatureError::Malformed)
}

/// Verifies a webhook delivery against the shared secret.
///
/// `sha256_header` and `sha1_header` are the raw values of
/// `X-Hub-Signature-256` and `X-Hub-Signature` if present. The SHA-256
/// header wins when both are sent.
pub fn verify(
    secret: &str,
    sha256_header: Option<&str>,
    sha1_header: Option<&str>,
    body: &[u8],
) -> Result<(), SignatureError> {
    if let Some(header) = sha256_header {
        let expected = digest(header, "sha256=")?;
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::Malformed)?;
        mac.update(body);
        return mac
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch);
    }

    if let Some(header) = sha1_header {
        let expected = digest(header, "sha1=")?;
        let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::Malformed)?;
        mac.update(body);
        return mac
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch);
    }

    Err(SignatureError::Missing)
}
