//! Host-side protocol configuration
//!
//! The only tunable part of the protocol is how the pairing password is
//! stretched into the 32-byte pairing token. The card and the host must agree
//! on both the salt and the iteration count, so applets from different
//! generations need different presets.

use crate::constants::{DEFAULT_PAIRING_ITERATIONS, KEYCARD_PAIRING_SALT, LIGHTWALLET_PAIRING_SALT};
use crate::crypto::{PairingToken, generate_pairing_token};

/// Pairing password KDF parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pairing_salt: String,
    pairing_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::keycard()
    }
}

impl Config {
    /// Parameters used by Keycard applets
    pub fn keycard() -> Self {
        Self {
            pairing_salt: KEYCARD_PAIRING_SALT.to_string(),
            pairing_iterations: DEFAULT_PAIRING_ITERATIONS,
        }
    }

    /// Parameters used by the earlier lightwallet applets
    pub fn lightwallet() -> Self {
        Self {
            pairing_salt: LIGHTWALLET_PAIRING_SALT.to_string(),
            pairing_iterations: DEFAULT_PAIRING_ITERATIONS,
        }
    }

    /// Override the pairing password salt
    pub fn with_pairing_salt(mut self, salt: impl Into<String>) -> Self {
        self.pairing_salt = salt.into();
        self
    }

    /// Override the PBKDF2 iteration count. Zero is clamped to one round.
    pub fn with_pairing_iterations(mut self, iterations: u32) -> Self {
        self.pairing_iterations = iterations.max(1);
        self
    }

    /// Salt mixed into the pairing password KDF
    pub fn pairing_salt(&self) -> &str {
        &self.pairing_salt
    }

    /// PBKDF2 iteration count
    pub const fn pairing_iterations(&self) -> u32 {
        self.pairing_iterations
    }

    /// Stretch a pairing password into the token shared with the card
    pub fn pairing_token(&self, password: &str) -> PairingToken {
        generate_pairing_token(password, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let config = Config::default();
        assert_eq!(config, Config::keycard());
        assert_eq!(config.pairing_salt(), "Keycard Pairing Password Salt");
        assert_eq!(config.pairing_iterations(), 50_000);

        let legacy = Config::lightwallet();
        assert_eq!(legacy.pairing_salt(), "Status Hardware Wallet Lite");
        assert_eq!(legacy.pairing_iterations(), 50_000);
    }

    #[test]
    fn test_builders() {
        let config = Config::keycard()
            .with_pairing_salt("custom")
            .with_pairing_iterations(0);
        assert_eq!(config.pairing_salt(), "custom");
        assert_eq!(config.pairing_iterations(), 1);
    }

    #[test]
    fn test_salt_changes_token() {
        let fast = Config::keycard().with_pairing_iterations(16);
        let legacy = Config::lightwallet().with_pairing_iterations(16);
        assert_ne!(fast.pairing_token("secret"), legacy.pairing_token("secret"));
        assert_eq!(fast.pairing_token("secret"), fast.pairing_token("secret"));
    }
}
