//! Secure data wrappers that are zeroized on drop.
//!
//! Client secrets, access tokens and Key Vault secret values pass through
//! these types so they never show up in logs or linger in memory.

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A secure string wrapper that zeroizes its contents on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Raw bytes that are zeroized on drop, e.g. decoded certificate material.
#[derive(Clone, PartialEq, Eq)]
pub struct SecureBytes(Zeroizing<Vec<u8>>);

impl SecureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED; {} bytes]", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_debug() {
        let secret = SecureString::new("super_secret_token".to_string());
        let debug_output = format!("{:?}", secret);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super_secret"));
    }

    #[test]
    fn test_secure_string_access() {
        let secret = SecureString::new("my_token".to_string());
        assert_eq!(secret.as_str(), "my_token");
        assert!(SecureString::from("   ").is_empty());
    }

    #[test]
    fn test_secure_string_deserializes_transparently() {
        #[derive(Deserialize)]
        struct Holder {
            secret: SecureString,
        }

        let holder: Holder = toml::from_str(r#"secret = "abc""#).unwrap();
        assert_eq!(holder.secret.as_str(), "abc");
    }

    #[test]
    fn test_secure_bytes_debug() {
        let bytes = SecureBytes::new(vec![1, 2, 3]);
        assert_eq!(format!("{:?}", bytes), "[REDACTED; 3 bytes]");
        assert_eq!(bytes.as_slice(), &[1, 2, 3]);
    }
}
