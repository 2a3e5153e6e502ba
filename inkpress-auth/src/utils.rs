use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))?;
    Ok(decoded)
}

pub(crate) fn base64url_encode(input: Vec<u8>) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Generate a URL-safe random string from `len` bytes of OS entropy.
pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    Ok(base64url_encode(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_random_string_length() {
        // 32 bytes of entropy encode to 43 base64url characters (no padding)
        let s = gen_random_string(32).expect("random generation should succeed");
        assert_eq!(s.len(), 43);
    }

    #[test]
    fn test_gen_random_string_unique() {
        let a = gen_random_string(32).expect("random generation should succeed");
        let b = gen_random_string(32).expect("random generation should succeed");
        assert_ne!(a, b);
    }

    #[test]
    fn test_base64url_roundtrip() {
        let data = vec![0u8, 1, 2, 254, 255];
        let encoded = base64url_encode(data.clone());
        let decoded = base64url_decode(&encoded).expect("decode should succeed");
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64url_decode_rejects_invalid() {
        assert!(base64url_decode("not base64url!").is_err());
    }
}
