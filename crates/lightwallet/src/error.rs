use lightwallet_apdu_core::{StatusWord, TlvError, TransportError, response::error::ResponseError};

/// Result type for lightwallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for lightwallet operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SELECT found an application that has already been initialised
    #[error("Already initialised")]
    AlreadyInitialized,

    /// SELECT found an application that still waits for INIT
    #[error("Not initialised")]
    NotInitialized,

    /// SELECT returned a template other than the application info template
    #[error("Unknown application info template {0:#04x}")]
    UnknownApplicationInfoTemplate(u8),

    /// The card answered with a status word the operation does not accept
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(StatusWord),

    /// A response payload has the wrong size
    #[error("Invalid response length: expected {expected} bytes, got {actual}")]
    InvalidResponseLength {
        /// Length the protocol requires
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// A response payload is malformed
    #[error("Invalid response data: {0}")]
    InvalidResponseData(&'static str),

    /// Command data too long to be framed as a short APDU
    #[error("Command data too long: {0} bytes")]
    DataTooLong(usize),

    /// Transport failure, propagated unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response bytes could not be split into payload and status word
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Application info template lookup failed
    #[error(transparent)]
    Tlv(#[from] TlvError),

    /// The card could not prove knowledge of the pairing password
    #[error("Invalid card cryptogram")]
    InvalidCardCryptogram,

    /// A secure channel response failed MAC verification
    #[error("Invalid response MAC")]
    InvalidResponseMac,

    /// A secure channel response did not unpad after decryption
    #[error("Decryption failed: {0}")]
    Decrypt(#[from] cipher::block_padding::UnpadError),

    /// The card did not complete MUTUALLY AUTHENTICATE; wraps the cause
    #[error("Mutual authentication failed: {0}")]
    MutualAuthenticationFailed(#[source] Box<Error>),

    /// The secure channel session was dropped after an earlier failure
    #[error("Secure channel closed")]
    ChannelClosed,

    /// The random source failed; nothing was sent
    #[error("Random source failure: {0}")]
    Random(String),

    /// The card public key is not a valid SEC1 secp256k1 point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Local cryptographic operation failed
    #[error("Crypto error: {0}")]
    Crypto(&'static str),

    /// PIN, PUK or pairing password failed validation
    #[error("Invalid secrets: {0}")]
    InvalidSecrets(&'static str),
}

impl From<lightwallet_apdu_core::Error> for Error {
    fn from(error: lightwallet_apdu_core::Error) -> Self {
        match error {
            lightwallet_apdu_core::Error::Transport(e) => Self::Transport(e),
            lightwallet_apdu_core::Error::Response(e) => Self::Response(e),
            lightwallet_apdu_core::Error::Tlv(e) => Self::Tlv(e),
            lightwallet_apdu_core::Error::InvalidCommandLength(_) => {
                Self::InvalidResponseData("malformed APDU")
            }
            lightwallet_apdu_core::Error::DataTooLong(len) => Self::DataTooLong(len),
        }
    }
}

impl From<cipher::inout::PadError> for Error {
    fn from(_: cipher::inout::PadError) -> Self {
        Self::Crypto("padding failed")
    }
}

impl Error {
    /// Status word carried by the error, if the card rejected the command
    pub const fn status(&self) -> Option<StatusWord> {
        match self {
            Self::UnexpectedStatus(status) => Some(*status),
            _ => None,
        }
    }

    /// Whether the error proves a key or password mismatch rather than a broken link
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            Self::InvalidCardCryptogram | Self::InvalidResponseMac | Self::Decrypt(_) => true,
            Self::MutualAuthenticationFailed(_) => true,
            _ => false,
        }
    }
}
