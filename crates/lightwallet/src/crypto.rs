use aes::cipher::{
    BlockDecryptMut, BlockEncryptMut, Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser,
    block_padding::Iso7816,
    typenum::{U16, U32},
};
use bytes::Bytes;
use generic_array::GenericArray;
use k256::{
    PublicKey, SecretKey,
    ecdh::SharedSecret,
    elliptic_curve::{sec1::ToEncodedPoint, subtle::ConstantTimeEq},
};
use pbkdf2::pbkdf2_hmac;
use rand::{TryCryptoRng, TryRngCore};
use sha2::{Digest, Sha256, Sha512};
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use crate::constants::{CHALLENGE_LENGTH, IV_LENGTH};
use crate::{Config, Error, Result};

/// PBKDF2 output of the pairing password
pub type PairingToken = GenericArray<u8, U32>;
/// SHA-256 proof of knowledge of the pairing token
pub type Cryptogram = GenericArray<u8, U32>;
/// Random 32-byte challenge
pub type Challenge = GenericArray<u8, U32>;
pub(crate) type ApduMeta = GenericArray<u8, U16>;

type Encryptor = cbc::Encryptor<aes::Aes256>;
type Decryptor = cbc::Decryptor<aes::Aes256>;

/// Key and IV sizes of the Keycard secure channel (AES-256-CBC)
#[derive(Debug, Clone, Copy)]
pub struct KeycardScp;

impl KeySizeUser for KeycardScp {
    type KeySize = U32;
}

impl IvSizeUser for KeycardScp {
    type IvSize = U16;
}

/// Fill `buf` from the injected random source.
pub(crate) fn random_bytes<R: TryCryptoRng + ?Sized>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf)
        .map_err(|e| Error::Random(e.to_string()))
}

/// Draw a fresh 32-byte challenge.
pub(crate) fn random_challenge<R: TryCryptoRng + ?Sized>(rng: &mut R) -> Result<Challenge> {
    let mut challenge = Challenge::default();
    random_bytes(rng, &mut challenge)?;
    Ok(challenge)
}

/// Draw an ephemeral secp256k1 key from 32 random bytes.
pub(crate) fn generate_ephemeral_key<R: TryCryptoRng + ?Sized>(rng: &mut R) -> Result<SecretKey> {
    let mut scalar = Zeroizing::new([0u8; 32]);
    random_bytes(rng, &mut *scalar)?;
    SecretKey::from_slice(scalar.as_slice()).map_err(|_| Error::Crypto("invalid ephemeral scalar"))
}

/// Parse a SEC1-encoded card public key.
pub(crate) fn parse_public_key(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::InvalidPublicKey)
}

/// ECDH over secp256k1 between a host key and the card key
pub fn generate_ecdh_shared_secret(private: &SecretKey, public: &PublicKey) -> SharedSecret {
    k256::elliptic_curve::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
}

/// SHA-256 over the shared secret followed by the challenge.
pub(crate) fn calculate_cryptogram(
    shared_secret: &PairingToken,
    challenge: &Challenge,
) -> Cryptogram {
    let mut hasher = Sha256::new();
    hasher.update(shared_secret);
    hasher.update(challenge);
    hasher.finalize()
}

/// Check the card's proof of knowledge of the pairing password.
///
/// Returns the pairing token (the stretched password) when `card_cryptogram`
/// equals `SHA-256(token ‖ challenge)`. The comparison runs in constant time.
pub fn verify_cryptogram(
    challenge: &Challenge,
    password: &str,
    card_cryptogram: &[u8],
    config: &Config,
) -> Result<PairingToken> {
    let token = generate_pairing_token(password, config);
    let expected = calculate_cryptogram(&token, challenge);

    if bool::from(card_cryptogram.ct_eq(expected.as_slice())) {
        Ok(token)
    } else {
        Err(Error::InvalidCardCryptogram)
    }
}

/// Perform one-shot encryption of initialisation data (PIN/PUK/pairing token).
///
/// Output layout: `len(pub) ‖ pub ‖ iv ‖ ciphertext`, where `pub` is the
/// uncompressed host public key and the ciphertext is AES-256-CBC under the
/// raw ECDH secret with ISO 7816 padding.
pub(crate) fn one_shot_encrypt(
    public_key: &PublicKey,
    ecdh_shared_secret: &SharedSecret,
    iv: &Iv<KeycardScp>,
    data: &[u8],
) -> Result<Bytes> {
    let mut buf = Zeroizing::new(data.to_vec());
    let msg_len = prepare_padding(&mut buf);
    let ciphertext = Encryptor::new(ecdh_shared_secret.raw_secret_bytes(), iv)
        .encrypt_padded_mut::<Iso7816>(&mut buf, msg_len)?;

    let pub_key_data = public_key.to_encoded_point(false);
    let mut out = Vec::with_capacity(1 + pub_key_data.len() + IV_LENGTH + ciphertext.len());
    out.push(pub_key_data.len() as u8);
    out.extend_from_slice(pub_key_data.as_bytes());
    out.extend_from_slice(iv);
    out.extend_from_slice(ciphertext);

    Ok(out.into())
}

/// Derive session keys from the ECDH secret, the pairing key and the card's
/// OPEN SECURE CHANNEL payload (`salt(32) ‖ iv(16)`).
///
/// `(K(E) | K(M)) = SHA-512(shared_secret | pairing_key | salt)`; the initial
/// IV is the last 16 bytes of the payload.
pub fn derive_session_keys(
    secret: &SharedSecret,
    pairing_key: &[u8; 32],
    server_payload: &[u8],
) -> Result<(Key<KeycardScp>, Key<KeycardScp>, Iv<KeycardScp>)> {
    if server_payload.len() != CHALLENGE_LENGTH + IV_LENGTH {
        return Err(Error::InvalidResponseLength {
            expected: CHALLENGE_LENGTH + IV_LENGTH,
            actual: server_payload.len(),
        });
    }
    let (salt, iv) = server_payload.split_at(CHALLENGE_LENGTH);

    let mut hasher = Sha512::new();
    hasher.update(secret.raw_secret_bytes());
    hasher.update(pairing_key);
    hasher.update(salt);
    let data = hasher.finalize();

    let enc_key = Key::<KeycardScp>::clone_from_slice(&data[0..32]);
    let mac_key = Key::<KeycardScp>::clone_from_slice(&data[32..64]);
    let iv = Iv::<KeycardScp>::clone_from_slice(iv);

    Ok((enc_key, mac_key, iv))
}

/// Encrypt data using the provided key and IV, padding it in ISO 7816 format.
pub(crate) fn encrypt_data(
    data: &[u8],
    enc_key: &Key<KeycardScp>,
    iv: &Iv<KeycardScp>,
) -> Result<Bytes> {
    let mut buf = data.to_vec();
    let msg_len = prepare_padding(&mut buf);
    let encrypted = Encryptor::new(enc_key, iv).encrypt_padded_mut::<Iso7816>(&mut buf, msg_len)?;
    Ok(Bytes::copy_from_slice(encrypted))
}

/// Decrypt data using the provided key and IV assuming ISO 7816 padding.
pub(crate) fn decrypt_data(
    data: &[u8],
    enc_key: &Key<KeycardScp>,
    iv: &Iv<KeycardScp>,
) -> Result<Bytes> {
    let mut buf = data.to_vec();
    let decrypted = Decryptor::new(enc_key, iv).decrypt_padded_mut::<Iso7816>(&mut buf)?;
    Ok(Bytes::copy_from_slice(decrypted))
}

/// CBC-MAC over `meta ‖ data` with a zero IV.
///
/// `data` is block aligned, so the MAC is the ciphertext block right before
/// the padding block.
pub(crate) fn calculate_mac(
    meta: &ApduMeta,
    data: &[u8],
    mac_key: &Key<KeycardScp>,
) -> Result<Iv<KeycardScp>> {
    let iv = Iv::<KeycardScp>::default();

    let mut buf = Vec::with_capacity(meta.len() + data.len() + IV_LENGTH);
    buf.extend_from_slice(meta.as_slice());
    buf.extend_from_slice(data);

    let msg_len = prepare_padding(&mut buf);
    let ciphertext = Encryptor::new(mac_key, &iv).encrypt_padded_mut::<Iso7816>(&mut buf, msg_len)?;

    Ok(Iv::<KeycardScp>::clone_from_slice(
        &ciphertext[ciphertext.len() - 32..ciphertext.len() - 16],
    ))
}

/// Stretch a pairing password with PBKDF2-HMAC-SHA256 (NFKD-normalised
/// password and salt, 32-byte output).
pub(crate) fn generate_pairing_token(password: &str, config: &Config) -> PairingToken {
    let password = Zeroizing::new(password.nfkd().collect::<String>());
    let salt = config.pairing_salt().nfkd().collect::<String>();

    let mut token = PairingToken::default();
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        config.pairing_iterations(),
        &mut token,
    );

    token
}

/// SHA-256 over the concatenation of `parts`.
pub(crate) fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

// Grow the buffer so the ISO 7816 padding (at least one byte) fits.
fn prepare_padding(data: &mut Vec<u8>) -> usize {
    let len = data.len();
    data.resize(len + 16 - len % 16, 0);

    len
}
