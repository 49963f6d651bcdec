//! MUTUALLY AUTHENTICATE

use bytes::Bytes;

use super::{CLA_GP, expect_success};
use crate::{constants::ins, crypto::Challenge};

keycard_command! {
    /// MUTUALLY AUTHENTICATE command, only meaningful inside a secure channel
    pub struct MutuallyAuthenticateCommand {
        cla: CLA_GP,
        ins: ins::MUTUALLY_AUTHENTICATE,
    }
    ok: Bytes,
    parse: expect_success,
}

impl MutuallyAuthenticateCommand {
    /// Create a MUTUALLY AUTHENTICATE command with challenge
    pub fn with_challenge(challenge: &Challenge) -> Self {
        Self::new(0x00, 0x00).with_data(challenge.to_vec()).with_le(0)
    }
}
