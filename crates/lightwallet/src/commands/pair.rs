//! PAIR
//!
//! Two stages: the host sends a challenge and checks the card cryptogram,
//! then answers the card challenge and receives its pairing slot and salt.

use bytes::Bytes;
use lightwallet_apdu_core::Response;

use super::{CLA_GP, expect_success};
use crate::{
    Error, Result,
    constants::{CHALLENGE_LENGTH, ins, pair_p1},
    crypto::{Challenge, Cryptogram},
};

keycard_command! {
    /// PAIR command
    pub struct PairCommand {
        cla: CLA_GP,
        ins: ins::PAIR,
    }
    ok: Bytes,
    parse: expect_success,
}

impl PairCommand {
    /// Create a PAIR for first stage with the host challenge
    pub fn with_first_stage(challenge: &Challenge) -> Self {
        Self::new(pair_p1::FIRST_STEP, 0x00).with_data(challenge.to_vec())
    }

    /// Create a PAIR for final stage with the host cryptogram
    pub fn with_final_stage(cryptogram_hash: &Cryptogram) -> Self {
        Self::new(pair_p1::FINAL_STEP, 0x00).with_data(cryptogram_hash.to_vec())
    }
}

/// Card reply to the first PAIR stage: `cryptogram(32) ‖ challenge(32)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstStageResponse {
    /// SHA-256 of pairing token and host challenge
    pub cryptogram: Cryptogram,
    /// Challenge the host has to answer in the final stage
    pub challenge: Challenge,
}

impl TryFrom<&[u8]> for FirstStageResponse {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        if payload.len() != 2 * CHALLENGE_LENGTH {
            return Err(Error::InvalidResponseLength {
                expected: 2 * CHALLENGE_LENGTH,
                actual: payload.len(),
            });
        }

        let (cryptogram, challenge) = payload.split_at(CHALLENGE_LENGTH);
        Ok(Self {
            cryptogram: Cryptogram::clone_from_slice(cryptogram),
            challenge: Challenge::clone_from_slice(challenge),
        })
    }
}

/// Card reply to the final PAIR stage: `index(1) ‖ salt(32)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStageResponse {
    /// Pairing slot assigned by the card
    pub pairing_index: u8,
    /// Salt hashed with the pairing token into the pairing key
    pub salt: Challenge,
}

impl TryFrom<&[u8]> for FinalStageResponse {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        match payload.split_first() {
            Some((&pairing_index, salt)) if salt.len() == CHALLENGE_LENGTH => Ok(Self {
                pairing_index,
                salt: Challenge::clone_from_slice(salt),
            }),
            _ => Err(Error::InvalidResponseLength {
                expected: 1 + CHALLENGE_LENGTH,
                actual: payload.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightwallet_apdu_core::ApduCommand;

    #[test]
    fn test_pair_commands() {
        let challenge = Challenge::clone_from_slice(&[0xAA; 32]);
        let first = PairCommand::with_first_stage(&challenge).to_command();
        assert_eq!((first.cla, first.ins, first.p1, first.p2), (0x80, 0x12, 0x00, 0x00));
        assert_eq!(first.data.as_deref(), Some(&[0xAA; 32][..]));
        assert_eq!(first.le, None);

        let cryptogram = Cryptogram::clone_from_slice(&[0xBB; 32]);
        let last = PairCommand::with_final_stage(&cryptogram).to_command();
        assert_eq!(last.p1, 0x01);
        assert_eq!(last.data.as_deref(), Some(&[0xBB; 32][..]));
    }

    #[test]
    fn test_stage_responses() {
        let mut payload = vec![0x11; 32];
        payload.extend_from_slice(&[0x22; 32]);
        let first = FirstStageResponse::try_from(payload.as_slice()).unwrap();
        assert_eq!(first.cryptogram.as_slice(), &[0x11; 32]);
        assert_eq!(first.challenge.as_slice(), &[0x22; 32]);

        let mut payload = vec![0x03];
        payload.extend_from_slice(&[0x44; 32]);
        let last = FinalStageResponse::try_from(payload.as_slice()).unwrap();
        assert_eq!(last.pairing_index, 3);
        assert_eq!(last.salt.as_slice(), &[0x44; 32]);
    }

    #[test]
    fn test_stage_responses_reject_wrong_lengths() {
        assert!(matches!(
            FirstStageResponse::try_from(&[0u8; 33][..]),
            Err(Error::InvalidResponseLength {
                expected: 64,
                actual: 33
            })
        ));
        assert!(matches!(
            FinalStageResponse::try_from(&[0u8; 64][..]),
            Err(Error::InvalidResponseLength {
                expected: 33,
                actual: 64
            })
        ));
        assert!(matches!(
            FinalStageResponse::try_from(&[][..]),
            Err(Error::InvalidResponseLength {
                expected: 33,
                actual: 0
            })
        ));
    }
}
