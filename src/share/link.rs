//! Public link token issuance.
//!
//! Tokens come from the operating system CSPRNG and are rendered as
//! unpadded base64url, so a 32-byte token is 43 URL-safe characters.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand_core::{OsRng, RngCore};

use crate::config::{SharingConfig, MIN_TOKEN_BYTES};

/// Produces candidate share tokens.
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Produce a fresh candidate token.
    fn next_token(&self) -> String;
}

/// Token source backed by the OS random number generator.
#[derive(Debug, Clone, Copy)]
pub struct OsRngTokenSource {
    bytes: usize,
}

impl OsRngTokenSource {
    /// Create a source emitting `bytes` random bytes per token.
    ///
    /// Requests below 16 bytes are raised to 16.
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.max(MIN_TOKEN_BYTES),
        }
    }

    /// Random bytes per token.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Default for OsRngTokenSource {
    fn default() -> Self {
        Self::new(32)
    }
}

impl TokenSource for OsRngTokenSource {
    fn next_token(&self) -> String {
        let mut buf = vec![0u8; self.bytes];
        OsRng.fill_bytes(&mut buf);
        URL_SAFE_NO_PAD.encode(&buf)
    }
}

/// Mints public share tokens and bounds collision retries.
#[derive(Debug, Clone)]
pub struct LinkIssuer {
    source: Arc<dyn TokenSource>,
    max_attempts: u32,
}

impl LinkIssuer {
    /// Default number of insert attempts per public link.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Create an issuer over a token source.
    pub fn new(source: Arc<dyn TokenSource>, max_attempts: u32) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create an issuer from the sharing configuration.
    pub fn from_config(config: &SharingConfig) -> Self {
        Self::new(
            Arc::new(OsRngTokenSource::new(config.token_bytes)),
            config.max_token_attempts,
        )
    }

    /// Mint a candidate token.
    pub fn mint(&self) -> String {
        self.source.next_token()
    }

    /// Insert attempts allowed before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for LinkIssuer {
    fn default() -> Self {
        Self::new(
            Arc::new(OsRngTokenSource::default()),
            Self::DEFAULT_MAX_ATTEMPTS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_length_and_alphabet() {
        let token = OsRngTokenSource::new(32).next_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_token_bytes_floor() {
        let source = OsRngTokenSource::new(4);
        assert_eq!(source.bytes(), MIN_TOKEN_BYTES);
        // 16 bytes -> 22 base64url characters
        assert_eq!(source.next_token().len(), 22);
    }

    #[test]
    fn test_tokens_distinct() {
        let issuer = LinkIssuer::default();
        let tokens: HashSet<String> = (0..10_000).map(|_| issuer.mint()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_max_attempts_at_least_one() {
        let issuer = LinkIssuer::new(Arc::new(OsRngTokenSource::default()), 0);
        assert_eq!(issuer.max_attempts(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = SharingConfig {
            token_bytes: 24,
            max_token_attempts: 3,
            sweep_interval_secs: 0,
        };
        let issuer = LinkIssuer::from_config(&config);
        assert_eq!(issuer.max_attempts(), 3);
        assert_eq!(issuer.mint().len(), 32);
    }
}
