use std::fmt;

use bytes::Bytes;
use lightwallet_apdu_core::tlv::{self, TlvError};

use super::{Capabilities, Version};
use crate::{Error, Result, constants::tags};

/// Application state reported by SELECT
///
/// `initialized` implies `installed`. The byte fields are only meaningful
/// once the application is initialized, except `public_key`, which a
/// pre-initialized card already exposes for INIT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationInfo {
    /// The applet answered SELECT
    pub installed: bool,
    /// INIT has been performed
    pub initialized: bool,
    /// ECC public key (65 bytes uncompressed, or empty)
    pub public_key: Bytes,
    /// Instance UID (16 bytes)
    pub instance_uid: Bytes,
    /// Raw application version (major, minor)
    pub version: Bytes,
    /// Number of remaining pairing slots
    pub available_slots: u8,
    /// Key UID (SHA-256 of the master public key, or empty before key generation)
    pub key_uid: Bytes,
    /// Capabilities, only reported by newer applets
    pub capabilities: Option<Capabilities>,
}

impl ApplicationInfo {
    /// No application answered to the AID
    pub fn not_installed() -> Self {
        Self::default()
    }

    /// Installed, waiting for INIT
    pub fn pre_initialized(public_key: Bytes) -> Self {
        Self {
            installed: true,
            public_key,
            ..Self::default()
        }
    }

    /// Parse the application info template returned by SELECT on an initialized card.
    ///
    /// The template carries the version and the free pairing slots under the
    /// same tag; the version is the first occurrence, the slot count the second.
    pub fn from_template(data: &[u8]) -> Result<Self> {
        match data.first() {
            None => return Err(Error::InvalidResponseData("empty application info")),
            Some(&tag) if tag != tags::TEMPLATE_APPLICATION_INFO => {
                return Err(Error::UnknownApplicationInfoTemplate(tag));
            }
            Some(_) => {}
        }

        let path = |tag: u8| [tags::TEMPLATE_APPLICATION_INFO, tag];

        let instance_uid = tlv::find_tag(data, &path(tags::INSTANCE_UID))?;
        let public_key = tlv::find_tag(data, &path(tags::ECC_PUBLIC_KEY))?;
        let version = tlv::find_tag_n(data, 0, &path(tags::OTHER))?;
        let slots = tlv::find_tag_n(data, 1, &path(tags::OTHER))?;
        let key_uid = tlv::find_tag_n(data, 0, &path(tags::KEY_UID))?;

        let capabilities = match tlv::find_tag(data, &path(tags::CAPABILITIES)) {
            Ok(value) => value.first().copied().map(Capabilities::from),
            Err(TlvError::TagNotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        let available_slots = *slots.first().ok_or(Error::InvalidResponseLength {
            expected: 1,
            actual: 0,
        })?;

        Ok(Self {
            installed: true,
            initialized: true,
            public_key,
            instance_uid,
            version,
            available_slots,
            key_uid,
            capabilities,
        })
    }

    /// Application version, when the card reported a well-formed one
    pub fn applet_version(&self) -> Option<Version> {
        Version::try_from(self.version.as_ref()).ok()
    }

    /// Whether a master key has been loaded or generated on the card
    pub fn has_master_key(&self) -> bool {
        !self.key_uid.is_empty()
    }
}

impl fmt::Display for ApplicationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.installed {
            return write!(f, "Application Info: not installed");
        }
        if !self.initialized {
            writeln!(f, "Application Info: pre-initialized")?;
            return write!(f, "  Secure channel public key: {}", hex::encode(&self.public_key));
        }

        writeln!(f, "Application Info:")?;
        writeln!(f, "  Instance UID: {}", hex::encode(&self.instance_uid))?;

        match self.applet_version() {
            Some(version) => writeln!(f, "  Version: {version}")?,
            None => writeln!(f, "  Version: {}", hex::encode(&self.version))?,
        }
        writeln!(f, "  Remaining pairing slots: {}", self.available_slots)?;

        if self.has_master_key() {
            writeln!(f, "  Key UID: 0x{}", hex::encode(&self.key_uid))?;
        } else {
            writeln!(f, "  Key UID: None")?;
        }

        if let Some(capabilities) = self.capabilities {
            writeln!(f, "  Capabilities: {capabilities}")?;
        }

        write!(f, "  Secure channel public key: {}", hex::encode(&self.public_key))
    }
}
