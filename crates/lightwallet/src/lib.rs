//! Host-side pairing and secure channel establishment for Keycard-class
//! hardware wallets.
//!
//! The crate implements the host half of the wallet applet protocol on top of
//! any [`CardTransport`]:
//!
//! - detecting whether the applet is installed and initialized (SELECT)
//! - installing PIN, PUK and pairing token on a fresh card (INIT)
//! - the password-bound PAIR exchange producing a [`PairingInfo`]
//! - opening a mutually authenticated [`SecureChannel`] and exchanging
//!   encrypted, MAC-chained APDUs through it
//!
//! ```no_run
//! use lightwallet::{KEYCARD_AID, Lightwallet, Result};
//! use lightwallet_apdu_core::{CardTransport, Command};
//!
//! fn connect<T: CardTransport>(transport: T, pairing_pass: &str) -> Result<()> {
//!     let mut wallet = Lightwallet::new(transport);
//!     let info = wallet.select_initialized(KEYCARD_AID)?;
//!     let pairing = wallet.pair(pairing_pass)?;
//!
//!     let mut channel = wallet.open_paired_channel(&info, &pairing)?;
//!     let status = channel.transmit(&Command::new(0x80, 0xF2, 0x00, 0x00).with_le(0))?;
//!     println!("{}", status.status());
//!     Ok(())
//! }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod application;
mod commands;
mod config;
mod constants;
mod crypto;
mod error;
mod secrets;
mod secure_channel;
mod session;
mod types;

pub use application::Lightwallet;
pub use commands::*;
pub use config::Config;
pub use crypto::{
    Challenge, Cryptogram, KeycardScp, PairingToken, derive_session_keys,
    generate_ecdh_shared_secret, verify_cryptogram,
};
pub use error::{Error, Result};
pub use secrets::{AppletVersion, Secrets};
pub use secure_channel::{Established, Handshake, SecureChannel};
pub use types::{ApplicationInfo, Capabilities, Capability, PairingInfo, Version};

pub use constants::*;

pub use lightwallet_apdu_core::CardTransport;

/// Create an applet instance AID with the specified index. Indices start at 1.
pub fn keycard_instance_aid(index: u8) -> Option<Vec<u8>> {
    if index == 0 {
        return None;
    }
    let mut aid = Vec::from(KEYCARD_AID);
    aid.push(index);
    Some(aid)
}
