//! Session state for the secure channel.
//!
//! A session holds the derived encryption and MAC keys plus the chained IV.
//! Every protected command sets the IV to its MAC; every verified response
//! sets it to the response MAC. Host and card therefore have to agree on the
//! whole history of the channel, which prevents replay of stale messages.

use cipher::{Iv, Key};
use k256::elliptic_curve::subtle::ConstantTimeEq;
use lightwallet_apdu_core::{Command, Response};
use tracing::{trace, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Error, Result,
    constants::{IV_LENGTH, MAX_SECURE_DATA_LENGTH},
    crypto::{ApduMeta, KeycardScp, calculate_mac, decrypt_data, encrypt_data},
};

/// Secure channel keys
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct Keys {
    /// Encryption key
    enc: [u8; 32],
    /// MAC key
    mac: [u8; 32],
}

impl Keys {
    pub(crate) fn new(enc: &Key<KeycardScp>, mac: &Key<KeycardScp>) -> Self {
        Self {
            enc: (*enc).into(),
            mac: (*mac).into(),
        }
    }

    fn enc(&self) -> &Key<KeycardScp> {
        Key::<KeycardScp>::from_slice(&self.enc)
    }

    fn mac(&self) -> &Key<KeycardScp> {
        Key::<KeycardScp>::from_slice(&self.mac)
    }
}

/// Keys plus the chained IV of one open channel
pub(crate) struct Session {
    keys: Keys,
    iv: Iv<KeycardScp>,
}

impl Session {
    pub(crate) fn new(enc: &Key<KeycardScp>, mac: &Key<KeycardScp>, iv: &Iv<KeycardScp>) -> Self {
        Self {
            keys: Keys::new(enc, mac),
            iv: *iv,
        }
    }

    #[cfg(test)]
    pub(crate) const fn iv(&self) -> &Iv<KeycardScp> {
        &self.iv
    }

    /// Encrypt and MAC a plain command.
    ///
    /// The wire data becomes `mac ‖ AES-CBC(enc, iv, pad(data))` and the MAC
    /// is the IV for the next message. On error the IV is left untouched.
    pub(crate) fn protect_command(&mut self, command: &Command) -> Result<Command> {
        let payload = command.data.as_deref().unwrap_or_default();
        if payload.len() > MAX_SECURE_DATA_LENGTH {
            return Err(Error::DataTooLong(payload.len()));
        }
        let encrypted = encrypt_data(payload, self.keys.enc(), &self.iv)?;

        let mut meta = ApduMeta::default();
        meta[0] = command.cla;
        meta[1] = command.ins;
        meta[2] = command.p1;
        meta[3] = command.p2;
        meta[4] = (encrypted.len() + IV_LENGTH) as u8;

        self.iv = calculate_mac(&meta, &encrypted, self.keys.mac())?;

        let mut data = Vec::with_capacity(IV_LENGTH + encrypted.len());
        data.extend_from_slice(&self.iv);
        data.extend_from_slice(&encrypted);

        trace!(ins = command.ins, "Protected secure channel command");

        Ok(Command {
            data: Some(data.into()),
            ..command.clone()
        })
    }

    /// Verify and decrypt a response to a protected command.
    ///
    /// The outer response must carry `90 00` and `mac(16) ‖ ciphertext`. The
    /// MAC is checked before anything is decrypted, the ciphertext is
    /// decrypted with the IV of the command, and the plaintext is parsed as
    /// the inner response.
    pub(crate) fn process_response(&mut self, response: &Response) -> Result<Response> {
        if !response.is_success() {
            warn!(status = %response.status(), "Secure channel response rejected by card");
            return Err(Error::UnexpectedStatus(response.status()));
        }

        let payload = response.payload();
        if payload.len() < 2 * IV_LENGTH
            || payload.len() % IV_LENGTH != 0
            || payload.len() > usize::from(u8::MAX)
        {
            return Err(Error::InvalidResponseData(
                "secure channel response is not block aligned",
            ));
        }

        let (rmac, rdata) = payload.split_at(IV_LENGTH);

        let mut meta = ApduMeta::default();
        meta[0] = payload.len() as u8;

        let mac = calculate_mac(&meta, rdata, self.keys.mac())?;
        if !bool::from(mac.as_slice().ct_eq(rmac)) {
            warn!("Secure channel response MAC mismatch");
            return Err(Error::InvalidResponseMac);
        }

        let plain = decrypt_data(rdata, self.keys.enc(), &self.iv)?;
        self.iv = mac;

        Ok(Response::from_bytes(&plain)?)
    }
}
