//! Core traits and types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types and traits for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! APDU (Application Protocol Data Unit) is the communication format used by smart cards.
//! This crate provides abstractions for:
//!
//! - Creating and parsing APDU commands and responses
//! - Communicating with smart cards through a pluggable transport
//! - Looking up fields in BER-TLV encoded response data
//! - Error handling and status word interpretation
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod response;
pub mod tlv;
pub mod transport;

pub use command::{ApduCommand, Command, ExpectedLength, MAX_DATA_LENGTH};
pub use error::{Error, Result};
pub use response::Response;
pub use response::status::StatusWord;
pub use tlv::TlvError;
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{Bytes, BytesMut, Error};

    // Command related
    pub use crate::Command;
    pub use crate::command::{ApduCommand, ExpectedLength};

    // Response related
    pub use crate::Response;
    pub use crate::response::error::{ResponseError, StatusError};
    pub use crate::response::status::{StatusWord, common as status};

    // Transport layer
    pub use crate::transport::{CardTransport, TransportError};
}
