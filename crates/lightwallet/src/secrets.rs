use std::fmt;

use base64::prelude::*;
use rand::TryCryptoRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{Config, Error, Result, crypto::random_bytes};

const DEFAULT_MAX_PIN_ATTEMPTS: u8 = 3;
const DEFAULT_MAX_PUK_ATTEMPTS: u8 = 5;
const PIN_LENGTH: usize = 6;
const PUK_LENGTH: usize = 12;
const PAIRING_TOKEN_LENGTH: usize = 32;
const PAIRING_PASS_ENTROPY: usize = 12;

/// Layout of the INIT payload understood by the applet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppletVersion {
    /// `PIN ‖ PUK ‖ pairing token`
    Legacy,
    /// Adds retry limits and a duress PIN
    V3_1,
}

/// Contains the secret data installed on the card by INIT.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secrets {
    pin: String,
    puk: String,
    pairing_pass: String,
    pairing_token: [u8; PAIRING_TOKEN_LENGTH],
    #[zeroize(skip)]
    version: AppletVersion,
    max_pin_attempts: u8,
    max_puk_attempts: u8,
    duress_pin: Option<String>,
}

impl Secrets {
    /// Creates secrets for legacy applets. The pairing password is stretched
    /// with the KDF parameters from `config`.
    pub fn new(pin: &str, puk: &str, pairing_pass: &str, config: &Config) -> Result<Self> {
        validate_digits(pin, PIN_LENGTH, "PIN must be exactly 6 digits")?;
        validate_digits(puk, PUK_LENGTH, "PUK must be exactly 12 digits")?;

        Ok(Self {
            pin: pin.to_string(),
            puk: puk.to_string(),
            pairing_pass: pairing_pass.to_string(),
            pairing_token: config.pairing_token(pairing_pass).into(),
            version: AppletVersion::Legacy,
            max_pin_attempts: DEFAULT_MAX_PIN_ATTEMPTS,
            max_puk_attempts: DEFAULT_MAX_PUK_ATTEMPTS,
            duress_pin: None,
        })
    }

    /// Creates secrets for applets 3.1 and newer
    pub fn new_v3_1(
        pin: &str,
        puk: &str,
        pairing_pass: &str,
        max_pin_attempts: u8,
        max_puk_attempts: u8,
        duress_pin: Option<&str>,
        config: &Config,
    ) -> Result<Self> {
        if let Some(duress) = duress_pin {
            validate_digits(duress, PIN_LENGTH, "Duress PIN must be exactly 6 digits")?;
        }

        let mut secrets = Self::new(pin, puk, pairing_pass, config)?;
        secrets.version = AppletVersion::V3_1;
        secrets.max_pin_attempts = max_pin_attempts;
        secrets.max_puk_attempts = max_puk_attempts;
        secrets.duress_pin = duress_pin.map(str::to_string);
        Ok(secrets)
    }

    /// Generates random PIN, PUK and pairing password for legacy applets
    pub fn generate<R: TryCryptoRng + ?Sized>(rng: &mut R, config: &Config) -> Result<Self> {
        let pin = random_digits(rng, PIN_LENGTH)?;
        let puk = random_digits(rng, PUK_LENGTH)?;
        let pairing_pass = generate_pairing_pass(rng)?;

        Self::new(&pin, &puk, &pairing_pass, config)
    }

    /// Six digit PIN
    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// Twelve digit PUK
    pub fn puk(&self) -> &str {
        &self.puk
    }

    /// Pairing password the token was derived from
    pub fn pairing_pass(&self) -> &str {
        &self.pairing_pass
    }

    /// Returns the pairing token derived from the pairing password
    pub fn pairing_token(&self) -> &[u8; PAIRING_TOKEN_LENGTH] {
        &self.pairing_token
    }

    /// PIN retry limit, sent to applets 3.1 and newer
    pub fn max_pin_attempts(&self) -> u8 {
        self.max_pin_attempts
    }

    /// PUK retry limit, sent to applets 3.1 and newer
    pub fn max_puk_attempts(&self) -> u8 {
        self.max_puk_attempts
    }

    /// Explicit duress PIN, if any
    pub fn duress_pin(&self) -> Option<&str> {
        self.duress_pin.as_deref()
    }

    /// INIT payload layout
    pub fn version(&self) -> AppletVersion {
        self.version
    }

    /// Encodes the secrets in the layout expected by INIT for the applet version
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let capacity = match self.version {
            AppletVersion::Legacy => PIN_LENGTH + PUK_LENGTH + PAIRING_TOKEN_LENGTH,
            AppletVersion::V3_1 => PIN_LENGTH + PUK_LENGTH + PAIRING_TOKEN_LENGTH + 2 + PIN_LENGTH,
        };

        let mut buffer = Zeroizing::new(Vec::with_capacity(capacity));
        buffer.extend_from_slice(self.pin.as_bytes());
        buffer.extend_from_slice(self.puk.as_bytes());
        buffer.extend_from_slice(&self.pairing_token);

        if self.version == AppletVersion::V3_1 {
            buffer.push(self.max_pin_attempts);
            buffer.push(self.max_puk_attempts);

            // Without an explicit duress PIN the applet expects the first half of the PUK
            match &self.duress_pin {
                Some(duress) => buffer.extend_from_slice(duress.as_bytes()),
                None => buffer.extend_from_slice(&self.puk.as_bytes()[..PIN_LENGTH]),
            }
        }

        buffer
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("version", &self.version)
            .field("max_pin_attempts", &self.max_pin_attempts)
            .field("max_puk_attempts", &self.max_puk_attempts)
            .finish_non_exhaustive()
    }
}

fn validate_digits(value: &str, length: usize, message: &'static str) -> Result<()> {
    if value.len() == length && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidSecrets(message))
    }
}

fn random_digits<R: TryCryptoRng + ?Sized>(rng: &mut R, length: usize) -> Result<String> {
    let mut digits = String::with_capacity(length);
    let mut byte = [0u8; 1];
    while digits.len() < length {
        random_bytes(rng, &mut byte)?;
        // Rejection sampling keeps the digits uniform
        if byte[0] < 250 {
            digits.push(char::from(b'0' + byte[0] % 10));
        }
    }
    byte.zeroize();
    Ok(digits)
}

fn generate_pairing_pass<R: TryCryptoRng + ?Sized>(rng: &mut R) -> Result<String> {
    let mut entropy = Zeroizing::new([0u8; PAIRING_PASS_ENTROPY]);
    random_bytes(rng, &mut *entropy)?;
    Ok(BASE64_URL_SAFE_NO_PAD.encode(*entropy))
}
