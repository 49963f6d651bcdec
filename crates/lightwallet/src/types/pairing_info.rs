use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Pairing information structure
///
/// Produced by a successful PAIR exchange and needed to open every later
/// secure channel. The key is as sensitive as the pairing password.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PairingInfo {
    /// Pairing key, `SHA-256(pairing token ‖ salt)`
    pub key: [u8; 32],
    /// Pairing slot on the card
    pub index: u8,
}

impl PairingInfo {
    /// Create pairing info from a key and slot index
    pub const fn new(key: [u8; 32], index: u8) -> Self {
        Self { key, index }
    }
}

impl fmt::Debug for PairingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingInfo")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
