use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque check-in key extracted from a decoded QR payload.
///
/// Tokens are held in canonical form (trimmed, ASCII upper-cased); the same
/// form is used for gate comparison and for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanToken(String);

impl ScanToken {
    /// Normalize a raw decoded payload into a canonical token.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A payload that normalizes to nothing carries no token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScanToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(ScanToken::normalize("  abc123 \n").as_str(), "ABC123");
        assert_eq!(ScanToken::normalize("AbC123"), ScanToken::normalize("abc123"));
    }

    #[test]
    fn whitespace_only_payload_is_empty() {
        assert!(ScanToken::normalize("   ").is_empty());
        assert!(!ScanToken::normalize("x").is_empty());
    }
}
