//! Lightwallet application interface
//!
//! [`Lightwallet`] drives a card from "just inserted" to an authenticated
//! secure channel: SELECT to learn the application state, INIT to install
//! secrets on a fresh card, PAIR to obtain a pairing slot, and OPEN SECURE
//! CHANNEL plus MUTUALLY AUTHENTICATE to start an encrypted session.

use bytes::Bytes;
use cipher::Iv;
use lightwallet_apdu_core::prelude::*;
use rand::{TryCryptoRng, rngs::OsRng};
use tracing::{debug, warn};

use crate::{
    ApplicationInfo, Config, Error, PairingInfo, Result, Secrets,
    commands::*,
    crypto::{
        KeycardScp, calculate_cryptogram, derive_session_keys, generate_ecdh_shared_secret,
        generate_ephemeral_key, one_shot_encrypt, parse_public_key, random_bytes,
        random_challenge, sha256, verify_cryptogram,
    },
    secure_channel::{Handshake, SecureChannel},
    session::Session,
};

/// Host side of the wallet applet protocol
#[derive(Debug)]
pub struct Lightwallet<T: CardTransport, R = OsRng> {
    transport: T,
    rng: R,
    config: Config,
}

impl<T: CardTransport> Lightwallet<T> {
    /// Use the operating system random source and default configuration
    pub fn new(transport: T) -> Self {
        Self::with_rng(transport, OsRng)
    }
}

impl<T: CardTransport, R: TryCryptoRng> Lightwallet<T, R> {
    /// Use a caller supplied random source
    pub fn with_rng(transport: T, rng: R) -> Self {
        Self {
            transport,
            rng,
            config: Config::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Generate random secrets stretched with this instance's configuration
    pub fn generate_secrets(&mut self) -> Result<Secrets> {
        Secrets::generate(&mut self.rng, &self.config)
    }

    /// SELECT the application and report its state.
    ///
    /// `6A 82` is not an error: it yields an info with `installed == false`.
    pub fn select(&mut self, aid: &[u8]) -> Result<ApplicationInfo> {
        debug!(aid = %hex::encode(aid), "Selecting application");

        match self.send_select(aid)? {
            SelectOk::NotFound => {
                debug!("Application not installed");
                Ok(ApplicationInfo::not_installed())
            }
            SelectOk::Selected(payload) => {
                let selection = Selection::try_from(payload.as_ref())?;
                debug!(initialized = selection.is_initialized(), "Application selected");
                Ok(selection.into())
            }
        }
    }

    /// SELECT an application that must still be waiting for INIT.
    ///
    /// Returns the card public key needed by [`Self::init`].
    pub fn select_not_initialized(&mut self, aid: &[u8]) -> Result<Bytes> {
        match self.select_installed(aid)? {
            Selection::PreInitialized { public_key } => Ok(public_key),
            Selection::Initialized(_) => Err(Error::AlreadyInitialized),
        }
    }

    /// SELECT an application that must already be initialized
    pub fn select_initialized(&mut self, aid: &[u8]) -> Result<ApplicationInfo> {
        match self.select_installed(aid)? {
            Selection::Initialized(info) => Ok(info),
            Selection::PreInitialized { .. } => Err(Error::NotInitialized),
        }
    }

    /// Install `secrets` on a pre-initialized card.
    ///
    /// The secrets are encrypted under a one-shot ECDH secret between a fresh
    /// host key and `card_public_key`; that key material is discarded as soon
    /// as the INIT payload is built.
    pub fn init(&mut self, card_public_key: &[u8], secrets: &Secrets) -> Result<()> {
        let card_key = parse_public_key(card_public_key)?;

        let payload = {
            let host_key = generate_ephemeral_key(&mut self.rng)?;
            let shared_secret = generate_ecdh_shared_secret(&host_key, &card_key);
            let mut iv = Iv::<KeycardScp>::default();
            random_bytes(&mut self.rng, &mut iv)?;

            one_shot_encrypt(&host_key.public_key(), &shared_secret, &iv, &secrets.to_bytes())?
        };

        debug!("Sending INIT");
        let response = self.transport.transmit(&InitCommand::with_payload(payload).to_command())?;
        InitCommand::parse_response(response)?;
        debug!("Card initialized");

        Ok(())
    }

    /// Pair with the card using the pairing password.
    ///
    /// The card has to prove knowledge of the password before the host
    /// reveals its own cryptogram: on a mismatch the second PAIR step is never
    /// sent. Any failure abandons the exchange; pairing restarts from scratch.
    pub fn pair(&mut self, pairing_pass: &str) -> Result<PairingInfo> {
        let challenge = random_challenge(&mut self.rng)?;

        debug!("Sending PAIR first stage");
        let payload = self.send_pair(&PairCommand::with_first_stage(&challenge))?;
        let first = FirstStageResponse::try_from(payload.as_ref())?;

        let secret_hash = verify_cryptogram(&challenge, pairing_pass, &first.cryptogram, &self.config)
            .inspect_err(|_| warn!("Card cryptogram does not match the pairing password"))?;

        let cryptogram = calculate_cryptogram(&secret_hash, &first.challenge);

        debug!("Sending PAIR final stage");
        let payload = self.send_pair(&PairCommand::with_final_stage(&cryptogram))?;
        let last = FinalStageResponse::try_from(payload.as_ref())?;

        let key = sha256(&[secret_hash.as_slice(), last.salt.as_slice()]);
        debug!(index = last.pairing_index, "Pairing established");

        Ok(PairingInfo::new(key, last.pairing_index))
    }

    /// Open and authenticate a secure channel using an existing pairing.
    ///
    /// The channel borrows the transport; drop it (or call
    /// [`SecureChannel::into_transport`]) to talk to the card in the clear again.
    pub fn open_secure_channel(
        &mut self,
        app_info: &ApplicationInfo,
        pairing_index: u8,
        pairing_key: &[u8; 32],
    ) -> Result<SecureChannel<&mut T>> {
        let card_key = parse_public_key(&app_info.public_key)?;
        let host_key = generate_ephemeral_key(&mut self.rng)?;
        let shared_secret = generate_ecdh_shared_secret(&host_key, &card_key);

        debug!(index = pairing_index, "Sending OPEN SECURE CHANNEL");
        let command = OpenSecureChannelCommand::with_pairing_index_and_pubkey(
            pairing_index,
            &host_key.public_key(),
        );
        let response = self.transport.transmit(&command.to_command())?;
        let payload = OpenSecureChannelCommand::parse_response(response)?;

        let (enc_key, mac_key, iv) = derive_session_keys(&shared_secret, pairing_key, &payload)?;
        let challenge = random_challenge(&mut self.rng)?;

        debug!("Sending MUTUALLY AUTHENTICATE");
        SecureChannel::<_, Handshake>::new(&mut self.transport, Session::new(&enc_key, &mac_key, &iv))
            .mutually_authenticate(&challenge)
    }

    /// [`Self::open_secure_channel`] with a stored pairing
    pub fn open_paired_channel(
        &mut self,
        app_info: &ApplicationInfo,
        pairing: &PairingInfo,
    ) -> Result<SecureChannel<&mut T>> {
        self.open_secure_channel(app_info, pairing.index, &pairing.key)
    }

    fn send_select(&mut self, aid: &[u8]) -> Result<SelectOk> {
        let response = self.transport.transmit(&SelectCommand::with_aid(aid).to_command())?;
        SelectCommand::parse_response(response)
    }

    fn select_installed(&mut self, aid: &[u8]) -> Result<Selection> {
        debug!(aid = %hex::encode(aid), "Selecting application");

        match self.send_select(aid)? {
            SelectOk::Selected(payload) => Selection::try_from(payload.as_ref()),
            SelectOk::NotFound => Err(Error::UnexpectedStatus(status::FILE_NOT_FOUND)),
        }
    }

    fn send_pair(&mut self, command: &PairCommand) -> Result<Bytes> {
        let response = self.transport.transmit(&command.to_command())?;
        PairCommand::parse_response(response)
    }
}
