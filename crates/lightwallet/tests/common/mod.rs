//! Software card used by the integration tests.
//!
//! The emulator implements the card half of SELECT, INIT, PAIR, OPEN SECURE
//! CHANNEL and MUTUALLY AUTHENTICATE with its own cryptography, so the host
//! implementation is checked against an independent counterpart.
#![allow(dead_code)]

use aes::cipher::{
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
    block_padding::{Iso7816, NoPadding},
};
use bytes::Bytes;
use iso7816_tlv::ber::{Tag, Tlv, Value};
use k256::{PublicKey, SecretKey, elliptic_curve::sec1::ToEncodedPoint};
use lightwallet::{Config, KEYCARD_AID, Lightwallet, Secrets};
use lightwallet_apdu_core::{CardTransport, Command, TransportError};
use rand::{SeedableRng, rngs::StdRng};
use sha2::{Digest, Sha256, Sha512};

type Encryptor = cbc::Encryptor<aes::Aes256>;
type Decryptor = cbc::Decryptor<aes::Aes256>;

pub const PAIRING_PASS: &str = "KeycardDefaultPairing";
pub const PIN: &str = "123456";
pub const PUK: &str = "123456789012";

/// Emulator-only instruction that echoes its plaintext data inside a secure channel
pub const INS_ECHO: u8 = 0xE0;

const SW_OK: u16 = 0x9000;
const SW_SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
const SW_CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
const SW_WRONG_DATA: u16 = 0x6A80;
const SW_FILE_NOT_FOUND: u16 = 0x6A82;
const SW_FILE_FULL: u16 = 0x6A84;
const SW_INCORRECT_P1P2: u16 = 0x6A86;
const SW_INS_NOT_SUPPORTED: u16 = 0x6D00;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Cheap KDF parameters shared by host and emulator in tests
pub fn config() -> Config {
    Config::default().with_pairing_iterations(64)
}

pub fn secrets() -> Secrets {
    Secrets::new(PIN, PUK, PAIRING_PASS, &config()).unwrap()
}

/// Host driving the emulator with a seeded random source
pub type Host = Lightwallet<CardEmulator, StdRng>;

/// Host with a seeded random source over `transport`
pub fn wallet<T: CardTransport>(transport: T, seed: u64) -> Lightwallet<T, StdRng> {
    Lightwallet::with_rng(transport, StdRng::seed_from_u64(seed)).with_config(config())
}

pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn with_status(mut data: Vec<u8>, sw: u16) -> Vec<u8> {
    data.extend_from_slice(&sw.to_be_bytes());
    data
}

fn status(sw: u16) -> Vec<u8> {
    with_status(Vec::new(), sw)
}

fn cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    buf.resize(data.len() + 16 - data.len() % 16, 0);
    Encryptor::new(key.into(), iv.into())
        .encrypt_padded_mut::<Iso7816>(&mut buf, data.len())
        .unwrap()
        .to_vec()
}

fn cbc_decrypt(key: &[u8; 32], iv: &[u8; 16], data: &[u8]) -> Option<Vec<u8>> {
    let mut buf = data.to_vec();
    Decryptor::new(key.into(), iv.into())
        .decrypt_padded_mut::<Iso7816>(&mut buf)
        .ok()
        .map(<[u8]>::to_vec)
}

// Last ciphertext block of AES-CBC over block-aligned `meta ‖ data`, zero IV.
fn cbc_mac(key: &[u8; 32], meta: &[u8; 16], data: &[u8]) -> [u8; 16] {
    let mut buf = meta.to_vec();
    buf.extend_from_slice(data);
    let len = buf.len();
    let ciphertext = Encryptor::new(key.into(), &[0u8; 16].into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .unwrap();
    ciphertext[len - 16..].try_into().unwrap()
}

fn tlv(tag: u8, value: &[u8]) -> Tlv {
    Tlv::new(Tag::try_from(tag).unwrap(), Value::Primitive(value.to_vec())).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppletState {
    NotInstalled,
    PreInitialized,
    Initialized {
        pin: Vec<u8>,
        puk: Vec<u8>,
        pairing_token: [u8; 32],
    },
}

#[derive(Debug)]
struct CardSession {
    enc: [u8; 32],
    mac: [u8; 32],
    iv: [u8; 16],
    authenticated: bool,
}

/// Card side of the wallet applet
#[derive(Debug)]
pub struct CardEmulator {
    key: SecretKey,
    state: AppletState,
    instance_uid: [u8; 16],
    slots: Vec<Option<[u8; 32]>>,
    card_challenge: Option<[u8; 32]>,
    session: Option<CardSession>,
    /// Every command received, in order
    pub commands: Vec<Command>,
    /// Answer MUTUALLY AUTHENTICATE with `69 82`
    pub fail_mutual_auth: bool,
    /// Corrupt the MAC of the secure channel response with this index,
    /// counting from MUTUALLY AUTHENTICATE as 0
    pub tamper_response: Option<usize>,
    secure_responses: usize,
}

impl CardEmulator {
    /// Fresh card waiting for INIT
    pub fn new() -> Self {
        Self {
            key: SecretKey::random(&mut rand_v8::thread_rng()),
            state: AppletState::PreInitialized,
            instance_uid: rand::random(),
            slots: vec![None; 5],
            card_challenge: None,
            session: None,
            commands: Vec::new(),
            fail_mutual_auth: false,
            tamper_response: None,
            secure_responses: 0,
        }
    }

    pub fn not_installed() -> Self {
        Self {
            state: AppletState::NotInstalled,
            ..Self::new()
        }
    }

    /// Card already initialized with `secrets`
    pub fn initialized(secrets: &Secrets) -> Self {
        Self {
            state: AppletState::Initialized {
                pin: secrets.pin().as_bytes().to_vec(),
                puk: secrets.puk().as_bytes().to_vec(),
                pairing_token: *secrets.pairing_token(),
            },
            ..Self::new()
        }
    }

    pub fn state(&self) -> &AppletState {
        &self.state
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn pairing_key(&self, index: u8) -> Option<[u8; 32]> {
        self.slots.get(index as usize).copied().flatten()
    }

    pub fn free_slots(&self) -> u8 {
        self.slots.iter().filter(|slot| slot.is_none()).count() as u8
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Commands received with the given instruction
    pub fn sent(&self, ins: u8) -> Vec<&Command> {
        self.commands.iter().filter(|c| c.ins == ins).collect()
    }

    fn handle(&mut self, command: &Command) -> Vec<u8> {
        match (command.cla, command.ins) {
            (0x00, 0xA4) => self.select(command),
            (0x80, 0xFE) => self.init(command),
            (0x80, 0x12) => self.pair(command),
            (0x80, 0x10) => self.open_secure_channel(command),
            (0x80, _) if self.session.is_some() => self.secure(command),
            (0x80, 0x11) => status(SW_CONDITIONS_NOT_SATISFIED),
            _ => status(SW_INS_NOT_SUPPORTED),
        }
    }

    fn select(&mut self, command: &Command) -> Vec<u8> {
        self.session = None;
        self.card_challenge = None;

        if command.data.as_deref() != Some(KEYCARD_AID) || self.state == AppletState::NotInstalled {
            return status(SW_FILE_NOT_FOUND);
        }

        let public_key = self.key.public_key().to_encoded_point(false);
        match self.state {
            AppletState::PreInitialized => {
                let mut data = vec![0x80, public_key.len() as u8];
                data.extend_from_slice(public_key.as_bytes());
                with_status(data, SW_OK)
            }
            _ => {
                let template = Tlv::new(
                    Tag::try_from(0xA4u8).unwrap(),
                    Value::Constructed(vec![
                        tlv(0x8F, &self.instance_uid),
                        tlv(0x80, public_key.as_bytes()),
                        tlv(0x02, &[0x03, 0x01]),
                        tlv(0x02, &[self.free_slots()]),
                        tlv(0x8E, &[]),
                        tlv(0x8D, &[0x01]),
                    ]),
                )
                .unwrap();
                with_status(template.to_vec(), SW_OK)
            }
        }
    }

    fn init(&mut self, command: &Command) -> Vec<u8> {
        if self.state != AppletState::PreInitialized {
            return status(SW_INS_NOT_SUPPORTED);
        }
        let data = command.data.as_deref().unwrap_or_default();
        if data.len() < 1 + 65 + 16 || data[0] != 65 {
            return status(SW_WRONG_DATA);
        }

        let Ok(host_key) = PublicKey::from_sec1_bytes(&data[1..66]) else {
            return status(SW_WRONG_DATA);
        };
        let shared = k256::elliptic_curve::ecdh::diffie_hellman(self.key.to_nonzero_scalar(), host_key.as_affine());
        let key: [u8; 32] = (*shared.raw_secret_bytes()).into();
        let iv: [u8; 16] = data[66..82].try_into().unwrap();

        match cbc_decrypt(&key, &iv, &data[82..]) {
            Some(plain) if plain.len() == 50 || plain.len() == 58 => {
                self.state = AppletState::Initialized {
                    pin: plain[..6].to_vec(),
                    puk: plain[6..18].to_vec(),
                    pairing_token: plain[18..50].try_into().unwrap(),
                };
                status(SW_OK)
            }
            _ => status(SW_WRONG_DATA),
        }
    }

    fn pairing_token(&self) -> Option<[u8; 32]> {
        match &self.state {
            AppletState::Initialized { pairing_token, .. } => Some(*pairing_token),
            _ => None,
        }
    }

    fn pair(&mut self, command: &Command) -> Vec<u8> {
        let Some(token) = self.pairing_token() else {
            return status(SW_INS_NOT_SUPPORTED);
        };
        if self.session.is_some() {
            return status(SW_CONDITIONS_NOT_SATISFIED);
        }
        let data = command.data.as_deref().unwrap_or_default();
        if data.len() != 32 {
            return status(SW_WRONG_DATA);
        }

        match command.p1 {
            0x00 => {
                let card_challenge: [u8; 32] = rand::random();
                self.card_challenge = Some(card_challenge);

                let mut response = sha256(&[token.as_slice(), data]).to_vec();
                response.extend_from_slice(&card_challenge);
                with_status(response, SW_OK)
            }
            0x01 => {
                let Some(card_challenge) = self.card_challenge.take() else {
                    return status(SW_INCORRECT_P1P2);
                };
                if sha256(&[token.as_slice(), card_challenge.as_slice()]) != data {
                    return status(SW_SECURITY_STATUS_NOT_SATISFIED);
                }
                let Some(index) = self.slots.iter().position(Option::is_none) else {
                    return status(SW_FILE_FULL);
                };

                let salt: [u8; 32] = rand::random();
                self.slots[index] = Some(sha256(&[token.as_slice(), salt.as_slice()]));

                let mut response = vec![index as u8];
                response.extend_from_slice(&salt);
                with_status(response, SW_OK)
            }
            _ => status(SW_INCORRECT_P1P2),
        }
    }

    fn open_secure_channel(&mut self, command: &Command) -> Vec<u8> {
        self.session = None;
        let Some(pairing_key) = self.pairing_key(command.p1) else {
            return status(SW_INCORRECT_P1P2);
        };
        let Ok(host_key) = PublicKey::from_sec1_bytes(command.data.as_deref().unwrap_or_default())
        else {
            return status(SW_WRONG_DATA);
        };

        let shared = k256::elliptic_curve::ecdh::diffie_hellman(self.key.to_nonzero_scalar(), host_key.as_affine());
        let salt: [u8; 32] = rand::random();
        let iv: [u8; 16] = rand::random();

        let mut hasher = Sha512::new();
        hasher.update(shared.raw_secret_bytes());
        hasher.update(pairing_key);
        hasher.update(salt);
        let keys = hasher.finalize();

        self.session = Some(CardSession {
            enc: keys[..32].try_into().unwrap(),
            mac: keys[32..].try_into().unwrap(),
            iv,
            authenticated: false,
        });

        let mut response = salt.to_vec();
        response.extend_from_slice(&iv);
        with_status(response, SW_OK)
    }

    fn secure(&mut self, command: &Command) -> Vec<u8> {
        let Some(session) = self.session.as_mut() else {
            return status(SW_CONDITIONS_NOT_SATISFIED);
        };
        let data = command.data.as_deref().unwrap_or_default();
        if data.len() < 32 || data.len() % 16 != 0 {
            self.session = None;
            return status(SW_SECURITY_STATUS_NOT_SATISFIED);
        }

        let (mac, encrypted) = data.split_at(16);
        let mut meta = [0u8; 16];
        meta[..4].copy_from_slice(&[command.cla, command.ins, command.p1, command.p2]);
        meta[4] = data.len() as u8;

        let plain = if cbc_mac(&session.mac, &meta, encrypted) == mac {
            cbc_decrypt(&session.enc, &session.iv, encrypted)
        } else {
            None
        };
        let Some(plain) = plain else {
            self.session = None;
            return status(SW_SECURITY_STATUS_NOT_SATISFIED);
        };
        session.iv = mac.try_into().unwrap();

        let inner = match command.ins {
            0x11 if self.fail_mutual_auth => status(SW_SECURITY_STATUS_NOT_SATISFIED),
            0x11 => {
                session.authenticated = true;
                with_status(rand::random::<[u8; 32]>().to_vec(), SW_OK)
            }
            _ if !session.authenticated => status(SW_CONDITIONS_NOT_SATISFIED),
            INS_ECHO => with_status(plain, SW_OK),
            _ => status(SW_INS_NOT_SUPPORTED),
        };

        let encrypted = cbc_encrypt(&session.enc, &session.iv, &inner);
        let mut rmeta = [0u8; 16];
        rmeta[0] = (16 + encrypted.len()) as u8;
        let rmac = cbc_mac(&session.mac, &rmeta, &encrypted);
        session.iv = rmac;

        let mut response = rmac.to_vec();
        response.extend_from_slice(&encrypted);
        if self.tamper_response == Some(self.secure_responses) {
            response[0] ^= 0x01;
        }
        self.secure_responses += 1;
        with_status(response, SW_OK)
    }
}

impl CardTransport for CardEmulator {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        let command =
            Command::from_bytes(command).map_err(|e| TransportError::other(e.to_string()))?;
        let response = self.handle(&command);
        self.commands.push(command);
        Ok(response.into())
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.session = None;
        self.card_challenge = None;
        Ok(())
    }
}

/// Transport replaying canned responses and recording what was sent
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Vec<Bytes>,
    pub commands: Vec<Bytes>,
}

impl ScriptedTransport {
    pub fn new<I, B>(responses: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            commands: Vec::new(),
        }
    }
}

impl CardTransport for ScriptedTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(Bytes::copy_from_slice(command));
        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.responses.remove(0))
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
