//! Webhook delivery authentication.
//!
//! GitHub signs each delivery body with HMAC-SHA256 under the shared webhook
//! secret and sends the result in `X-Hub-Signature-256` as `sha256=<hex>`.
//! Deliveries are verified before their body is parsed.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Why a delivery failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The header is not `sha256=` followed by hex.
    #[error("malformed signature header")]
    Malformed,

    /// The signature does not match the body.
    #[error("signature mismatch")]
    Mismatch,
}

/// The shared secret configured on the GitHub webhook.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(..)")
    }
}

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        WebhookSecret(secret.into())
    }

    fn mac(&self) -> Result<HmacSha256, SignatureError> {
        // HMAC accepts keys of any length; the error arm is unreachable.
        HmacSha256::new_from_slice(&self.0).map_err(|_| SignatureError::Mismatch)
    }

    /// Checks `header` (the `X-Hub-Signature-256` value) against `payload`.
    /// The comparison is constant-time.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        let expected = parse_signature_header(header).ok_or(SignatureError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// The `X-Hub-Signature-256` header value GitHub would send for `payload`.
    #[cfg(test)]
    pub(crate) fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac().unwrap();
        mac.update(payload);
        format!(
            "{SIGNATURE_PREFIX}{}",
            hex::encode(mac.finalize().into_bytes())
        )
    }
}

/// Decodes `sha256=<hex>` into raw signature bytes.
fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix(SIGNATURE_PREFIX)?;
    hex::decode(hex_sig).ok()
}
