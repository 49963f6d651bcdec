//! Core error type for all APDU operations

use crate::response::error::ResponseError;
use crate::tlv::TlvError;
use crate::transport::TransportError;

/// Result type for APDU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transport failure, propagated unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed response
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// TLV lookup failure
    #[error(transparent)]
    Tlv(#[from] TlvError),

    /// Invalid command length
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Command data does not fit a short APDU
    #[error("Command data too long: {0} bytes")]
    DataTooLong(usize),
}
