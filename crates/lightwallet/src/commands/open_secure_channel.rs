//! OPEN SECURE CHANNEL

use bytes::Bytes;
use k256::{PublicKey, elliptic_curve::sec1::ToEncodedPoint};

use super::{CLA_GP, expect_success};
use crate::constants::ins;

keycard_command! {
    /// OPEN SECURE CHANNEL command
    ///
    /// The card answers with `salt(32) ‖ iv(16)`.
    pub struct OpenSecureChannelCommand {
        cla: CLA_GP,
        ins: ins::OPEN_SECURE_CHANNEL,
    }
    ok: Bytes,
    parse: expect_success,
}

impl OpenSecureChannelCommand {
    /// Create an OPEN SECURE CHANNEL command for a pairing slot and host ephemeral key
    pub fn with_pairing_index_and_pubkey(pairing_index: u8, public_key: &PublicKey) -> Self {
        Self::new(pairing_index, 0x00)
            .with_data(public_key.to_encoded_point(false).as_bytes().to_vec())
            .with_le(0)
    }
}
