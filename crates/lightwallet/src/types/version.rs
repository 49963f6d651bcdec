use derive_more::{Display, From, Into};

use crate::Error;

/// Application version (major.minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, From, Into)]
#[display("{}.{}", major, minor)]
pub struct Version {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl Version {
    /// Create a version
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl TryFrom<&[u8]> for Version {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match bytes {
            [major, minor] => Ok(Self::new(*major, *minor)),
            _ => Err(Error::InvalidResponseLength {
                expected: 2,
                actual: bytes.len(),
            }),
        }
    }
}
