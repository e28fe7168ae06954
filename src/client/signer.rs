//! Request signing for the keyword tool API
//!
//! Every request carries an `X-Signature` header: the base64-encoded
//! HMAC-SHA256 of `"{timestamp}.{method}.{uri}"` keyed with the account's
//! secret key.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signs keyword tool requests with a shared secret
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    /// Create a signer
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the secret is empty.
    pub fn new(secret: impl AsRef<str>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(Error::config("secret key is empty"));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| Error::config(format!("invalid secret key: {e}")))?;
        Ok(Self { mac })
    }

    /// Sign a request
    pub fn sign(&self, timestamp_millis: i64, method: &str, uri: &str) -> String {
        let message = format!("{timestamp_millis}.{method}.{uri}");
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(Signer::new(""), Err(Error::Config(_))));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = Signer::new("secret").unwrap();
        let a = signer.sign(1_700_000_000_000, "GET", "/keywordstool");
        let b = signer.sign(1_700_000_000_000, "GET", "/keywordstool");
        assert_eq!(a, b);
        // 32-byte digest, base64 with padding
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn test_signature_varies_with_inputs() {
        let signer = Signer::new("secret").unwrap();
        let base = signer.sign(1, "GET", "/keywordstool");
        assert_ne!(base, signer.sign(2, "GET", "/keywordstool"));
        assert_ne!(base, signer.sign(1, "POST", "/keywordstool"));
        assert_ne!(base, signer.sign(1, "GET", "/other"));
        assert_ne!(base, Signer::new("other").unwrap().sign(1, "GET", "/keywordstool"));
    }

    #[test]
    fn test_signature_matches_manual_hmac() {
        let signer = Signer::new("key").unwrap();
        let mut mac = HmacSha256::new_from_slice(b"key").unwrap();
        mac.update(b"42.GET./keywordstool");
        let expected = STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(signer.sign(42, "GET", "/keywordstool"), expected);
    }
}
