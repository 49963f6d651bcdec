use std::fmt;

/// Capability flags advertised by newer applets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Secure channel support
    SecureChannel = 0x01,
    /// Key generation, loading and export
    KeyManagement = 0x02,
    /// PIN, PUK and pairing management
    CredentialsManagement = 0x04,
    /// NDEF record storage
    Ndef = 0x08,
}

/// Capabilities flags container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(u8);

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities = Vec::new();
        if self.has_capability(Capability::SecureChannel) {
            capabilities.push("Secure Channel");
        }
        if self.has_capability(Capability::KeyManagement) {
            capabilities.push("Key Management");
        }
        if self.has_capability(Capability::CredentialsManagement) {
            capabilities.push("Credentials Management");
        }
        if self.has_capability(Capability::Ndef) {
            capabilities.push("NDEF");
        }
        write!(f, "{}", capabilities.join(", "))
    }
}

impl Capabilities {
    /// Combine individual flags
    pub fn new(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |flags, &cap| flags | cap as u8))
    }

    /// Whether `capability` is set
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.0 & capability as u8 != 0
    }

    /// Raw flag byte
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Capabilities {
    fn from(value: u8) -> Self {
        Self(value)
    }
}
