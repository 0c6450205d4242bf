//! PKCE (RFC 7636) verifier and S256 challenge.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

const VERIFIER_LENGTH: usize = 64;

/// Generate a random string of the specified length (alphanumeric).
pub fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}

/// A fresh code verifier.
#[must_use]
pub fn generate_verifier() -> String {
    generate_random_string(VERIFIER_LENGTH)
}

/// S256 challenge for a verifier: `BASE64URL(SHA256(verifier))` without padding.
#[must_use]
pub fn challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7636_vector() {
        assert_eq!(
            challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verifier_shape() {
        let v = generate_verifier();
        assert_eq!(v.len(), VERIFIER_LENGTH);
        assert!(v.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(v, generate_verifier());
    }
}
