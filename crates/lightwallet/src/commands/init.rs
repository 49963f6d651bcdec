//! INIT: one-time installation of PIN, PUK and pairing token

use bytes::Bytes;
use lightwallet_apdu_core::Response;

use super::{CLA_GP, expect_success};
use crate::{Result, constants::ins};

keycard_command! {
    /// INIT command: installs the encrypted secrets on a pre-initialized card
    pub struct InitCommand {
        cla: CLA_GP,
        ins: ins::INIT,
    }
    ok: (),
    parse: parse_init_response,
}

impl InitCommand {
    /// Create an INIT command carrying the one-shot encrypted secrets
    pub fn with_payload(payload: Bytes) -> Self {
        Self::new(0x00, 0x00).with_data(payload)
    }
}

fn parse_init_response(response: Response) -> Result<()> {
    expect_success(response).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use lightwallet_apdu_core::{ApduCommand, StatusWord};

    #[test]
    fn test_init_command() {
        let cmd = InitCommand::with_payload(Bytes::from_static(&[0x41, 0x04, 0x01]));
        assert_eq!(
            cmd.to_bytes().unwrap().as_ref(),
            &[0x80, 0xFE, 0x00, 0x00, 0x03, 0x41, 0x04, 0x01]
        );
    }

    #[test]
    fn test_init_only_accepts_success() {
        assert!(InitCommand::parse_response_raw(&[0x90, 0x00]).is_ok());

        let err = InitCommand::parse_response_raw(&[0x6D, 0x00]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus(sw) if sw == StatusWord::new(0x6D, 0x00)));
    }
}
